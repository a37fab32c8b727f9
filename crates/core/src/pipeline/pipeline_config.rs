use crate::capture::domain::capture_preset::CapturePreset;
use crate::delivery::domain::presence::PresenceEvents;
use crate::shared::constants::{
    DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH, FRAME_CHANNEL_CAPACITY,
};
use crate::shared::geometry::Rect;

/// Settings for one capture session.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Size of the surface frames are rendered to.
    pub display_width: u32,
    pub display_height: u32,
    /// Front-camera style preview, reflected across the vertical midline.
    pub mirrored: bool,
    pub presence_events: PresenceEvents,
    pub preset: CapturePreset,
    /// Frames allowed to wait for the worker before new ones are dropped.
    pub channel_capacity: usize,
}

impl PipelineConfig {
    /// Display surface in its own coordinates (origin at 0,0).
    pub fn display_rect(&self) -> Rect {
        Rect::from_dimensions(self.display_width, self.display_height)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
            mirrored: false,
            presence_events: PresenceEvents::default(),
            preset: CapturePreset::default(),
            channel_capacity: FRAME_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.presence_events, PresenceEvents::EveryFrame);
        assert!(!config.mirrored);
    }

    #[test]
    fn test_display_rect_at_origin() {
        let config = PipelineConfig {
            display_width: 300,
            display_height: 500,
            ..PipelineConfig::default()
        };
        assert_eq!(config.display_rect(), Rect::new(0.0, 0.0, 300.0, 500.0));
    }
}
