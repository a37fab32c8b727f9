use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::capture_backend::CaptureBackend;
use crate::capture::domain::capture_preset::CapturePreset;
use crate::capture::domain::frame_output::{FrameOutput, Submission};
use crate::shared::constants::DEFAULT_SOURCE_FPS;
use crate::shared::frame::Frame;
use crate::shared::orientation::Orientation;

use super::pacing::sleep_until;

const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(3600);

/// Replays one upright photo as a camera feed.
///
/// The image is rotated into the sensor layout described by `orientation`,
/// so downstream stages see the same buffers a rotated camera would give
/// them. Frames repeat at `fps` until `frame_limit` is reached (or forever).
pub struct StillImageCapture {
    path: PathBuf,
    fps: f64,
    frame_limit: Option<usize>,
    orientation: Orientation,
    preset: CapturePreset,
    image: Option<image::RgbImage>,
    template: Option<Frame>,
    output: Option<FrameOutput>,
    stop: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl StillImageCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fps: DEFAULT_SOURCE_FPS,
            frame_limit: None,
            orientation: Orientation::default(),
            preset: CapturePreset::default(),
            image: None,
            template: None,
            output: None,
            stop: Arc::new(AtomicBool::new(false)),
            producer: None,
        }
    }

    /// Non-positive rates mean "as fast as the pipeline accepts".
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

impl CaptureBackend for StillImageCapture {
    fn set_preset(&mut self, preset: CapturePreset) -> Result<(), Box<dyn std::error::Error>> {
        if preset.is_degenerate() {
            return Err(format!("cannot scale image to {preset}").into());
        }
        self.preset = preset;
        Ok(())
    }

    fn bind_input(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let img = image::open(&self.path)?.to_rgb8();
        log::info!(
            "Loaded still image {} ({}x{})",
            self.path.display(),
            img.width(),
            img.height()
        );
        self.image = Some(img);
        Ok(())
    }

    fn attach_input(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let img = self.image.take().ok_or("input not bound")?;
        let (w, h) = self.preset.resolve(img.width(), img.height());
        let img = if (w, h) == img.dimensions() {
            img
        } else {
            image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
        };
        let upright = Frame::new(img.into_raw(), w, h, 3, 0).with_orientation(Orientation::Up);
        self.template = Some(self.orientation.to_sensor_frame(&upright));
        Ok(())
    }

    fn attach_output(&mut self, output: FrameOutput) -> Result<(), Box<dyn std::error::Error>> {
        if self.template.is_none() {
            return Err("input not attached".into());
        }
        self.output = Some(output);
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.producer.is_some() {
            return Err("already running".into());
        }
        let interval = frame_interval(self.fps)?;
        let template = self.template.take().ok_or("input not attached")?;
        let output = self.output.take().ok_or("output not attached")?;

        self.stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&self.stop);
        let limit = self.frame_limit;
        self.producer = Some(
            std::thread::Builder::new()
                .name("still-capture".into())
                .spawn(move || replay(template, output, stop, interval, limit))?,
        );
        Ok(())
    }

    fn stop_running(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
        self.image = None;
        self.template = None;
        self.output = None;
    }
}

impl Drop for StillImageCapture {
    fn drop(&mut self) {
        self.stop_running();
    }
}

/// Time between frames at `fps`, or `None` when unpaced. Rates slower than
/// one frame per [`MAX_FRAME_INTERVAL`] are rejected.
fn frame_interval(fps: f64) -> Result<Option<Duration>, String> {
    if fps.is_nan() {
        return Err("frame rate is not a number".into());
    }
    if fps <= 0.0 {
        return Ok(None);
    }
    match Duration::try_from_secs_f64(1.0 / fps) {
        Ok(interval) if interval <= MAX_FRAME_INTERVAL => Ok(Some(interval)),
        _ => Err(format!("frame rate {fps} is too low")),
    }
}

fn replay(
    template: Frame,
    output: FrameOutput,
    stop: Arc<AtomicBool>,
    interval: Option<Duration>,
    limit: Option<usize>,
) {
    let started = Instant::now();
    let mut index = 0usize;

    while !stop.load(Ordering::Relaxed) {
        if limit.is_some_and(|n| index >= n) {
            output.finish();
            return;
        }

        let timestamp = match interval {
            Some(i) => i.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX)),
            None => started.elapsed(),
        };
        if interval.is_some() && !sleep_until(started + timestamp, &stop) {
            break;
        }

        let frame = Frame::new(
            template.data().to_vec(),
            template.width(),
            template.height(),
            template.channels(),
            index,
        )
        .with_orientation(template.orientation())
        .with_timestamp(timestamp);
        index += 1;

        match output.submit(frame) {
            Submission::Closed => break,
            Submission::Dropped | Submission::Accepted => {}
        }
        if interval.is_none() {
            std::thread::yield_now();
        }
    }
}
