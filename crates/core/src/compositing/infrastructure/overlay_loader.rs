use std::path::Path;

use crate::compositing::domain::overlay_asset::{OverlayAsset, OverlayError};

/// Decodes an overlay image (any format the `image` crate reads) into RGBA.
///
/// When `size` is given the image is resized to fit that square, keeping its
/// aspect ratio.
pub fn load_overlay(path: &Path, size: Option<u32>) -> Result<OverlayAsset, OverlayError> {
    let img = image::open(path)?;
    let img = match size {
        Some(s) => img.resize(s, s, image::imageops::FilterType::Triangle),
        None => img,
    };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    OverlayAsset::from_rgba(rgba.into_raw(), width, height)
}
