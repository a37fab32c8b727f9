pub mod overlay_loader;
pub mod source_over_compositor;
