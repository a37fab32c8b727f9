use std::path::{Path, PathBuf};
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

/// Feeds frames decoded by ffmpeg-next (libavformat + libavcodec) into the
/// pipeline as if they came from a live camera.
///
/// Anything libav can open works as the "device": files, capture devices
/// exposed as URLs, network streams. Frames are converted to RGB24, scaled
/// to the preset size, tagged with the container's rotation, and released
/// at the stream's frame rate unless pacing is disabled.
pub struct FfmpegCapture {
    path: PathBuf,
    preset: CapturePreset,
    paced: bool,
    source: Option<OpenedSource>,
    decoding: Option<Decoding>,
    output: Option<FrameOutput>,
    stop: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

/// Demuxer state between `bind_input` and `attach_input`.
struct OpenedSource {
    ictx: ffmpeg_next::format::context::Input,
    stream_index: usize,
    time_base: ffmpeg_next::Rational,
    fps: f64,
    orientation: Orientation,
}

/// Everything the producer thread needs to turn packets into frames.
struct Decoding {
    source: OpenedSource,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    first_pts: Option<i64>,
    flushing: bool,
    done: bool,
}

// Safety: the ffmpeg contexts are created on the caller's thread and then
// moved, never shared, onto the single producer thread that uses them.
unsafe impl Send for OpenedSource {}
unsafe impl Send for Decoding {}

impl FfmpegCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            preset: CapturePreset::default(),
            paced: true,
            source: None,
            decoding: None,
            output: None,
            stop: Arc::new(AtomicBool::new(false)),
            producer: None,
        }
    }

    /// Release frames as fast as they decode instead of at the stream rate.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureBackend for FfmpegCapture {
    fn set_preset(&mut self, preset: CapturePreset) -> Result<(), Box<dyn std::error::Error>> {
        if preset.is_degenerate() {
            return Err(format!("cannot scale frames to {preset}").into());
        }
        self.preset = preset;
        Ok(())
    }

    fn bind_input(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(&self.path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 && rate.numerator() > 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            DEFAULT_SOURCE_FPS
        };
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let orientation = Orientation::from_rotation_degrees(extract_rotation(&stream));

        log::info!(
            "Opened {} (stream {stream_index}, {fps:.2} fps, orientation {orientation:?})",
            self.path.display()
        );

        self.source = Some(OpenedSource {
            ictx,
            stream_index,
            time_base,
            fps,
            orientation,
        });
        Ok(())
    }

    fn attach_input(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let source = self.source.take().ok_or("input not bound")?;
        let stream = source
            .ictx
            .stream(source.stream_index)
            .ok_or("video stream disappeared")?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let (width, height) = self.preset.resolve(decoder.width(), decoder.height());
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.decoding = Some(Decoding {
            source,
            decoder,
            scaler,
            width,
            height,
            first_pts: None,
            flushing: false,
            done: false,
        });
        Ok(())
    }

    fn attach_output(&mut self, output: FrameOutput) -> Result<(), Box<dyn std::error::Error>> {
        if self.decoding.is_none() {
            return Err("input not attached".into());
        }
        self.output = Some(output);
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.producer.is_some() {
            return Err("already running".into());
        }
        let decoding = self.decoding.take().ok_or("input not attached")?;
        let output = self.output.take().ok_or("output not attached")?;

        self.stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&self.stop);
        let paced = self.paced;
        self.producer = Some(
            std::thread::Builder::new()
                .name("ffmpeg-capture".into())
                .spawn(move || produce(decoding, output, stop, paced))?,
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
        self.source = None;
        self.decoding = None;
        self.output = None;
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        self.stop_running();
    }
}

fn produce(mut decoding: Decoding, output: FrameOutput, stop: Arc<AtomicBool>, paced: bool) {
    let started = Instant::now();
    let mut index = 0usize;

    while !stop.load(Ordering::Relaxed) {
        let Some(next) = decoding.next_frame() else {
            log::info!("Capture source exhausted after {index} frames");
            output.finish();
            return;
        };
        let (pixels, pts) = match next {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Skipping undecodable frame: {e}");
                continue;
            }
        };

        let timestamp = decoding.timestamp(pts, index);
        if paced && !sleep_until(started + timestamp, &stop) {
            break;
        }

        let frame = Frame::new(pixels, decoding.width, decoding.height, 3, index)
            .with_orientation(decoding.source.orientation)
            .with_timestamp(timestamp);
        index += 1;

        if output.submit(frame) == Submission::Closed {
            break;
        }
    }
    log::debug!("Capture thread stopped after {index} frames");
}

impl Decoding {
    /// Decodes the next frame as tightly packed RGB24 plus its pts.
    /// `None` once the stream and the decoder are both drained.
    fn next_frame(&mut self) -> Option<Result<(Vec<u8>, Option<i64>), ffmpeg_next::Error>> {
        if self.done {
            return None;
        }
        if let Some(result) = self.try_receive() {
            return Some(result);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.source.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.source.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }

    fn try_receive(&mut self) -> Option<Result<(Vec<u8>, Option<i64>), ffmpeg_next::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(e));
        }
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Some(Ok((pixels, decoded.pts())))
    }

    /// Presentation time relative to the first decoded frame. Falls back to
    /// the nominal frame rate when the container carries no pts.
    fn timestamp(&mut self, pts: Option<i64>, index: usize) -> Duration {
        let tb = self.source.time_base;
        match pts {
            Some(pts) if tb.denominator() != 0 => {
                let first = *self.first_pts.get_or_insert(pts);
                let secs = (pts - first) as f64 * tb.numerator() as f64 / tb.denominator() as f64;
                Duration::try_from_secs_f64(secs).unwrap_or_default()
            }
            _ => Duration::try_from_secs_f64(index as f64 / self.source.fps).unwrap_or_default(),
        }
    }
}

/// Extracts the rotation angle from a video stream.
///
/// Tries stream side data (DisplayMatrix) first, then falls back to the
/// `"rotate"` metadata tag.
fn extract_rotation(stream: &ffmpeg_next::format::stream::Stream) -> i32 {
    for side_data in stream.side_data() {
        if side_data.kind() == ffmpeg_next::codec::packet::side_data::Type::DisplayMatrix {
            if let Some(angle) = parse_display_matrix(side_data.data()) {
                return angle;
            }
        }
    }

    stream
        .metadata()
        .get("rotate")
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Parses a 3x3 display matrix (9 x i32, 16.16 fixed-point, little-endian)
/// and returns the clockwise rotation in degrees.
///
/// The matrix describes the transform needed for correct display, so the
/// angle of its first row vector is negated.
fn parse_display_matrix(data: &[u8]) -> Option<i32> {
    if data.len() < 36 {
        return None;
    }

    let m00 = i32::from_le_bytes(data[0..4].try_into().ok()?) as f64 / 65536.0;
    let m10 = i32::from_le_bytes(data[4..8].try_into().ok()?) as f64 / 65536.0;

    Some(-m10.atan2(m00).to_degrees().round() as i32)
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// stripping any row padding (stride > width * 3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
