use crate::shared::frame::Frame;
use crate::shared::orientation::Orientation;

use super::face_feature::FaceFeature;

/// Domain interface for eye detection on a single frame.
///
/// Results describe that frame only; implementations keep no cross-frame
/// state. `&mut self` because inference sessions need exclusive access, and
/// `Send` (not `Sync`) so an instance can be moved onto the worker thread and
/// stay confined there. An empty vector means "no face", not an error.
pub trait FeatureDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        orientation: Orientation,
    ) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>>;
}
