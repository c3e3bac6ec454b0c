pub mod match_slides_use_case;
pub mod pipeline_logger;
pub mod sample_feed;
