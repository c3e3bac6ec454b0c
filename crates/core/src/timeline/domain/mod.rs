pub mod debounce;
pub mod timeline;
