pub mod face_feature;
pub mod feature_detector;
