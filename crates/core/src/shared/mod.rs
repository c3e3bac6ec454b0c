pub mod config;
pub mod constants;
pub mod frame_sample;
pub mod video_metadata;
