pub mod descriptor_matcher;
pub mod detector_kind;
pub mod feature_extractor;
pub mod feature_set;
pub mod frame_scorer;
pub mod geometric_verifier;
pub mod match_score;
pub mod matching_error;
pub mod preprocess;
pub mod template_matcher;
