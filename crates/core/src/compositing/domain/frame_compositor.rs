use crate::shared::frame::Frame;
use crate::shared::geometry::Point;

use super::overlay_asset::OverlayAsset;

/// Domain interface for drawing the overlay onto a frame.
///
/// Composition is pure: `base` is left untouched and a new frame is returned.
pub trait FrameCompositor: Send + Sync {
    /// Draws `overlay` with its centre on `anchor`.
    fn composite(&self, base: &Frame, overlay: &OverlayAsset, anchor: Point) -> Frame;

    /// Composites only when the feature was detected; otherwise hands `base`
    /// back as-is.
    fn composite_feature(&self, base: Frame, overlay: &OverlayAsset, anchor: Option<Point>) -> Frame {
        match anchor {
            Some(point) => self.composite(&base, overlay, point),
            None => base,
        }
    }
}
