pub mod domain;
pub mod infrastructure;
pub mod slide_feature_bank;
pub mod slide_match_scorer;
