pub mod domain;
pub mod segment_assigner;
pub mod timeline_builder;
pub mod timeline_estimator;
