use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;

use faceit_core::capture::domain::capture_backend::CaptureBackend;
use faceit_core::capture::domain::capture_preset::CapturePreset;
use faceit_core::capture::infrastructure::ffmpeg_capture::FfmpegCapture;
use faceit_core::capture::infrastructure::still_image_capture::StillImageCapture;
use faceit_core::compositing::domain::overlay_asset::OverlayAsset;
use faceit_core::compositing::infrastructure::overlay_loader::load_overlay;
use faceit_core::compositing::infrastructure::source_over_compositor::SourceOverCompositor;
use faceit_core::delivery::domain::presence::PresenceEvents;
use faceit_core::delivery::infrastructure::png_snapshot_sink::PngSnapshotSink;
use faceit_core::detection::domain::feature_detector::FeatureDetector;
use faceit_core::detection::infrastructure::model_resolver;
use faceit_core::detection::infrastructure::onnx_eye_detector::{
    OnnxEyeDetector, DEFAULT_CONFIDENCE,
};
use faceit_core::pipeline::frame_processor::FrameProcessor;
use faceit_core::pipeline::pipeline_config::PipelineConfig;
use faceit_core::pipeline::pipeline_coordinator::PipelineCoordinator;
use faceit_core::pipeline::pipeline_logger::LoggingPipelineLogger;
use faceit_core::shared::constants::{
    DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH, DEFAULT_HEART_SIZE, FRAME_CHANNEL_CAPACITY,
    IMAGE_EXTENSIONS, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use faceit_core::shared::orientation::Orientation;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Draws hearts over the eyes of faces in a camera-like feed.
#[derive(Parser)]
#[command(name = "faceit")]
struct Cli {
    /// Input video or image file, played back as the camera feed.
    input: PathBuf,

    /// Treat the input as a still photo even without an image extension.
    #[arg(long)]
    still: bool,

    /// Frame rate for still-image playback.
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Number of frames to replay from a still image (endless if omitted).
    #[arg(long)]
    frames: Option<usize>,

    /// RGBA image to use instead of the built-in heart.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Overlay edge length in display pixels.
    #[arg(long, default_value_t = DEFAULT_HEART_SIZE)]
    heart_size: u32,

    /// Width of the display surface.
    #[arg(long, default_value_t = DEFAULT_DISPLAY_WIDTH)]
    display_width: u32,

    /// Height of the display surface.
    #[arg(long, default_value_t = DEFAULT_DISPLAY_HEIGHT)]
    display_height: u32,

    /// Mirror the output horizontally, as a front camera preview does.
    #[arg(long)]
    mirrored: bool,

    /// Sensor orientation of a still image: up, right, down, left or an EXIF tag.
    #[arg(long, default_value = "right")]
    orientation: Orientation,

    /// Capture resolution: native, hd (1280x720), vga (640x480) or WxH.
    #[arg(long, default_value = "native")]
    preset: CapturePreset,

    /// Eye detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Presence reporting: every-frame or on-transition.
    #[arg(long, default_value = "every-frame")]
    events: PresenceEvents,

    /// Directory for rendered PNG frames.
    #[arg(long, default_value = "faceit-output")]
    output_dir: PathBuf,

    /// Write every Nth delivered frame.
    #[arg(long, default_value = "1")]
    every: usize,

    /// Stop after this many seconds even if the source has frames left.
    #[arg(long)]
    duration: Option<f64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let overlay = build_overlay(&cli)?;
    let detector = build_detector(&cli)?;
    let processor = FrameProcessor::new(
        detector,
        Box::new(SourceOverCompositor::new()),
        Arc::new(overlay),
    );
    let sink = Arc::new(PngSnapshotSink::new(&cli.output_dir, cli.every)?);
    let config = PipelineConfig {
        display_width: cli.display_width,
        display_height: cli.display_height,
        mirrored: cli.mirrored,
        presence_events: cli.events,
        preset: cli.preset,
        channel_capacity: FRAME_CHANNEL_CAPACITY,
    };

    let mut coordinator =
        PipelineCoordinator::new(open_capture(&cli), processor, sink.clone(), config)
            .with_logger(Box::new(LoggingPipelineLogger::default()));
    coordinator.start()?;

    let deadline = cli
        .duration
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    while !coordinator.source_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            log::info!("Duration reached, stopping");
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    coordinator.stop();

    let stats = coordinator.stats();
    eprintln!(
        "Processed {} frames ({} dropped, {} superseded), delivered {}, wrote {} to {}",
        stats.processed,
        stats.dropped,
        stats.superseded,
        stats.delivered,
        sink.written(),
        sink.output_dir().display()
    );
    Ok(())
}

fn open_capture(cli: &Cli) -> Box<dyn CaptureBackend> {
    if cli.still || is_image(&cli.input) {
        let mut capture = StillImageCapture::new(&cli.input)
            .with_fps(cli.fps)
            .with_orientation(cli.orientation);
        if let Some(limit) = cli.frames {
            capture = capture.with_frame_limit(limit);
        }
        Box::new(capture)
    } else {
        Box::new(FfmpegCapture::new(&cli.input))
    }
}

fn build_overlay(cli: &Cli) -> Result<OverlayAsset, Box<dyn std::error::Error>> {
    match &cli.overlay {
        Some(path) => Ok(load_overlay(path, Some(cli.heart_size))?),
        None => Ok(OverlayAsset::heart(cli.heart_size)?),
    }
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FeatureDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        None,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    Ok(Box::new(OnnxEyeDetector::new(&model_path, cli.confidence)?))
}

fn validate(cli: &Cli) -> Result<(), String> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()));
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        ));
    }
    if cli.heart_size == 0 {
        return Err("Heart size must be positive".into());
    }
    if cli.display_width == 0 || cli.display_height == 0 {
        return Err(format!(
            "Display size must be positive, got {}x{}",
            cli.display_width, cli.display_height
        ));
    }
    if cli.every == 0 {
        return Err("--every must be at least 1".into());
    }
    if let Some(secs) = cli.duration {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(format!("Duration must be positive, got {secs}"));
        }
    }
    if !cli.fps.is_finite() {
        return Err(format!("Invalid frame rate {}", cli.fps));
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading eye detection model... {pct}%");
    } else {
        eprint!("\rDownloading eye detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["faceit"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["face.png"]);
        assert_eq!(cli.heart_size, DEFAULT_HEART_SIZE);
        assert_eq!(
            (cli.display_width, cli.display_height),
            (DEFAULT_DISPLAY_WIDTH, DEFAULT_DISPLAY_HEIGHT)
        );
        assert_eq!(cli.orientation, Orientation::Right);
        assert_eq!(cli.preset, CapturePreset::Native);
        assert_eq!(cli.events, PresenceEvents::EveryFrame);
        assert!(!cli.mirrored);
    }

    #[test]
    fn test_parses_typed_flags() {
        let cli = parse(&[
            "clip.mp4",
            "--preset",
            "640x480",
            "--orientation",
            "6",
            "--events",
            "on-transition",
            "--mirrored",
        ]);
        assert_eq!(cli.preset, CapturePreset::Vga640x480);
        assert_eq!(cli.orientation, Orientation::Right);
        assert_eq!(cli.events, PresenceEvents::OnTransition);
        assert!(cli.mirrored);
    }

    #[test]
    fn test_rejects_bad_preset() {
        assert!(Cli::try_parse_from(["faceit", "clip.mp4", "--preset", "huge"]).is_err());
    }

    #[test]
    fn test_validate_missing_input() {
        let cli = parse(&["/nonexistent/clip.mp4"]);
        assert!(validate(&cli).unwrap_err().contains("not found"));
    }

    #[test]
    fn test_validate_ranges() {
        let input = std::env::current_exe().unwrap();
        let input = input.to_str().unwrap();
        assert!(validate(&parse(&[input])).is_ok());
        assert!(validate(&parse(&[input, "--confidence", "1.5"])).is_err());
        assert!(validate(&parse(&[input, "--heart-size", "0"])).is_err());
        assert!(validate(&parse(&[input, "--every", "0"])).is_err());
        assert!(validate(&parse(&[input, "--duration", "0"])).is_err());
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("face.PNG")));
        assert!(is_image(Path::new("dir/face.jpeg")));
        assert!(!is_image(Path::new("clip.mp4")));
        assert!(!is_image(Path::new("noext")));
    }
}
