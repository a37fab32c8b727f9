pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Frames that may wait for the worker. Anything beyond this is dropped
/// rather than queued, so the pipeline never falls behind the camera.
pub const FRAME_CHANNEL_CAPACITY: usize = 1;

/// Edge length of the built-in heart overlay in pixels.
pub const DEFAULT_HEART_SIZE: u32 = 64;

/// Frame rate used by sources that have no intrinsic rate (still images).
pub const DEFAULT_SOURCE_FPS: f64 = 30.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Default display surface: portrait, matching a landscape 1280x720 sensor
/// rotated upright.
pub const DEFAULT_DISPLAY_WIDTH: u32 = 720;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 1280;
