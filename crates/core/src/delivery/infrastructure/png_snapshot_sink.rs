use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::delivery::domain::delivery_sink::DeliverySink;
use crate::shared::frame::Frame;

/// Headless renderer: writes every `every`-th delivered frame to a PNG file
/// and logs presence changes.
pub struct PngSnapshotSink {
    output_dir: PathBuf,
    every: usize,
    received: AtomicUsize,
    written: AtomicUsize,
    face_visible: AtomicBool,
}

impl PngSnapshotSink {
    /// Creates `output_dir` if needed. `every` is clamped to at least 1.
    pub fn new(output_dir: impl Into<PathBuf>, every: usize) -> std::io::Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            every: every.max(1),
            received: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
            face_visible: AtomicBool::new(false),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    fn frame_path(&self, frame: &Frame) -> PathBuf {
        self.output_dir.join(format!("frame_{:06}.png", frame.index()))
    }
}

impl DeliverySink for PngSnapshotSink {
    fn on_frame_ready(&self, frame: Frame) -> Result<(), Box<dyn std::error::Error>> {
        let n = self.received.fetch_add(1, Ordering::Relaxed);
        if n % self.every != 0 {
            return Ok(());
        }

        let path = self.frame_path(&frame);
        let color = match frame.channels() {
            3 => image::ExtendedColorType::Rgb8,
            4 => image::ExtendedColorType::Rgba8,
            c => return Err(format!("cannot encode {c}-channel frame as PNG").into()),
        };
        image::save_buffer(&path, frame.data(), frame.width(), frame.height(), color)?;
        self.written.fetch_add(1, Ordering::Relaxed);
        log::debug!("Wrote {}", path.display());
        Ok(())
    }

    fn on_face_found(&self) {
        if !self.face_visible.swap(true, Ordering::Relaxed) {
            log::info!("Found a face!");
        }
    }

    fn on_face_lost(&self) {
        if self.face_visible.swap(false, Ordering::Relaxed) {
            log::info!("Looking...");
        }
    }
}
