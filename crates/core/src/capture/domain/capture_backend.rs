use super::capture_preset::CapturePreset;
use super::frame_output::FrameOutput;

/// A capture mechanism configured step by step before it starts producing.
///
/// The coordinator calls the configuration steps in declaration order and
/// stops at the first error. Once running, the backend delivers frames from
/// its own thread through the attached [`FrameOutput`] and must not block on
/// it.
pub trait CaptureBackend: Send {
    /// Select the output quality. Fails if the source cannot honour it.
    fn set_preset(&mut self, preset: CapturePreset) -> Result<(), Box<dyn std::error::Error>>;

    /// Acquire the underlying device or stream.
    fn bind_input(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Prepare the bound input for frame production.
    fn attach_input(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Register the destination for produced frames.
    fn attach_output(&mut self, output: FrameOutput) -> Result<(), Box<dyn std::error::Error>>;

    /// Begin delivering frames asynchronously.
    fn start_running(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Halt frame production and release the device and the output.
    /// Blocks until the producer has stopped. Safe to call repeatedly.
    fn stop_running(&mut self);
}
