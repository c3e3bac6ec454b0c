pub mod flann_neighbors;
pub mod matcher_factory;
mod mat_convert;
pub mod opencv_feature_extractor;
pub mod opencv_template_matcher;
pub mod ransac_homography;
