pub mod ffmpeg_capture;
mod pacing;
pub mod still_image_capture;
