use crate::shared::frame::Frame;

/// Receiver of pipeline output: the renderer or UI layer.
///
/// All callbacks run on the delivery thread, never on the frame worker, so a
/// slow sink can only cause frames to be superseded, not capture to stall.
pub trait DeliverySink: Send + Sync {
    /// The newest composited frame, in display space.
    fn on_frame_ready(&self, frame: Frame) -> Result<(), Box<dyn std::error::Error>>;

    fn on_face_found(&self);

    fn on_face_lost(&self);
}
