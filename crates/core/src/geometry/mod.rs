pub mod affine_transform;
pub mod coordinate_transformer;
pub mod display_projector;
