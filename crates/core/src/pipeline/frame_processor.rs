use std::sync::Arc;
use std::time::Instant;

use crate::compositing::domain::frame_compositor::FrameCompositor;
use crate::compositing::domain::overlay_asset::OverlayAsset;
use crate::detection::domain::feature_detector::FeatureDetector;
use crate::geometry::coordinate_transformer::GeometryContext;
use crate::geometry::display_projector::project_to_display;
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

/// Outcome of one pass over a captured frame.
#[derive(Debug)]
pub struct ProcessedFrame {
    /// The frame to render, in display space when projection succeeded.
    pub frame: Frame,
    /// A face was detected. Drives face-found / face-lost.
    pub face_present: bool,
    /// Overlays actually drawn (0, 1 or 2).
    pub overlays: usize,
}

/// Detect, transform, composite: the work done for every captured frame.
///
/// Owns the detector and compositor and is confined to one thread at a
/// time; the overlay asset is shared read-only.
pub struct FrameProcessor {
    detector: Box<dyn FeatureDetector>,
    compositor: Box<dyn FrameCompositor>,
    overlay: Arc<OverlayAsset>,
    display: Rect,
    mirrored: bool,
}

impl FrameProcessor {
    pub fn new(
        detector: Box<dyn FeatureDetector>,
        compositor: Box<dyn FrameCompositor>,
        overlay: Arc<OverlayAsset>,
    ) -> Self {
        let config = PipelineConfig::default();
        Self {
            detector,
            compositor,
            overlay,
            display: config.display_rect(),
            mirrored: config.mirrored,
        }
    }

    /// Adopts the display surface of a new session.
    pub fn configure(&mut self, config: &PipelineConfig) {
        self.display = config.display_rect();
        self.mirrored = config.mirrored;
    }

    pub fn on_frame(&mut self, frame: Frame, logger: &mut dyn PipelineLogger) -> ProcessedFrame {
        let start = Instant::now();
        let features = match self.detector.detect(&frame, frame.orientation()) {
            Ok(features) => {
                logger.timing("detect", elapsed_ms(start));
                logger.metric("faces", features.len() as f64);
                features
            }
            Err(e) => {
                // Treated as "no face" so delivery continues.
                log::warn!("Detection failed on frame {}: {e}", frame.index());
                Vec::new()
            }
        };

        let start = Instant::now();
        let ctx = GeometryContext::new(
            Rect::from_dimensions(frame.width(), frame.height()),
            self.display,
            self.mirrored,
        );
        let display_frame = match project_to_display(&frame, &ctx) {
            Ok(projected) => projected,
            Err(e) => {
                log::warn!("Cannot project frame {} to display: {e}", frame.index());
                return ProcessedFrame {
                    frame,
                    face_present: false,
                    overlays: 0,
                };
            }
        };
        logger.timing("project", elapsed_ms(start));

        // Only the first face is decorated.
        let Some(face) = features.first() else {
            return ProcessedFrame {
                frame: display_frame,
                face_present: false,
                overlays: 0,
            };
        };

        let start = Instant::now();
        let mut out = display_frame;
        let mut overlays = 0;
        for eye in [face.left_eye(), face.right_eye()] {
            let anchor = match eye.map(|p| ctx.map(p)).transpose() {
                Ok(anchor) => anchor,
                Err(e) => {
                    log::debug!("Skipping overlay placement: {e}");
                    continue;
                }
            };
            if anchor.is_some() {
                overlays += 1;
            }
            out = self.compositor.composite_feature(out, &self.overlay, anchor);
        }
        logger.timing("composite", elapsed_ms(start));

        ProcessedFrame {
            frame: out,
            face_present: true,
            overlays,
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositing::infrastructure::source_over_compositor::SourceOverCompositor;
    use crate::detection::domain::face_feature::FaceFeature;
    use crate::pipeline::pipeline_logger::{LoggingPipelineLogger, NullPipelineLogger, RunningStat};
    use crate::shared::geometry::Point;
    use crate::shared::orientation::Orientation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RED: [u8; 4] = [255, 0, 0, 255];

    struct FixedDetector(Vec<FaceFeature>);

    impl FeatureDetector for FixedDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _orientation: Orientation,
        ) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl FeatureDetector for FailingDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _orientation: Orientation,
        ) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }
    }

    /// Counts placements and delegates to the real compositor.
    struct CountingCompositor {
        calls: Arc<AtomicUsize>,
        inner: SourceOverCompositor,
    }

    impl FrameCompositor for CountingCompositor {
        fn composite(&self, base: &Frame, overlay: &OverlayAsset, anchor: Point) -> Frame {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.composite(base, overlay, anchor)
        }
    }

    fn solid_overlay(size: u32) -> Arc<OverlayAsset> {
        let rgba = RED.repeat((size * size) as usize);
        Arc::new(OverlayAsset::from_rgba(rgba, size, size).unwrap())
    }

    /// 40x30 landscape sensor frame, mid grey.
    fn sensor_frame() -> Frame {
        Frame::new(vec![128; 40 * 30 * 3], 40, 30, 3, 0)
    }

    /// Display 30x40, so both scale factors are 1.
    fn config(mirrored: bool) -> PipelineConfig {
        PipelineConfig {
            display_width: 30,
            display_height: 40,
            mirrored,
            ..PipelineConfig::default()
        }
    }

    fn processor(
        detector: Box<dyn FeatureDetector>,
        mirrored: bool,
    ) -> (FrameProcessor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let compositor = CountingCompositor {
            calls: Arc::clone(&calls),
            inner: SourceOverCompositor::new(),
        };
        let mut p = FrameProcessor::new(detector, Box::new(compositor), solid_overlay(4));
        p.configure(&config(mirrored));
        (p, calls)
    }

    #[test]
    fn test_no_face_delivers_projected_frame() {
        let (mut p, calls) = processor(Box::new(FixedDetector(vec![])), false);
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);
        assert!(!out.face_present);
        assert_eq!(out.overlays, 0);
        assert_eq!((out.frame.width(), out.frame.height()), (30, 40));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_only_left_eye_composites_once() {
        let face = FaceFeature::new(Some(Point::new(10.0, 5.0)), None);
        let (mut p, calls) = processor(Box::new(FixedDetector(vec![face])), false);
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);

        assert!(out.face_present);
        assert_eq!(out.overlays, 1);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        // Sensor (10, 5) maps to display (5, 10).
        assert_eq!(out.frame.pixel(5, 10), &RED[..3]);
        assert_eq!(out.frame.pixel(25, 35), &[128, 128, 128]);
    }

    #[test]
    fn test_both_eyes_composite_twice() {
        let face = FaceFeature::new(Some(Point::new(10.0, 5.0)), Some(Point::new(10.0, 20.0)));
        let (mut p, calls) = processor(Box::new(FixedDetector(vec![face])), false);
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);
        assert_eq!(out.overlays, 2);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert_eq!(out.frame.pixel(20, 10), &RED[..3]);
    }

    #[test]
    fn test_mirrored_placement_reflects_across_midline() {
        let face = FaceFeature::new(Some(Point::new(10.0, 5.0)), None);
        let (mut p, _) = processor(Box::new(FixedDetector(vec![face])), true);
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);
        // x' = 30 - 5 = 25.
        assert_eq!(out.frame.pixel(25, 10), &RED[..3]);
        assert_eq!(out.frame.pixel(5, 10), &[128, 128, 128]);
    }

    #[test]
    fn test_only_first_face_decorated() {
        let first = FaceFeature::new(Some(Point::new(10.0, 5.0)), None);
        let second = FaceFeature::new(Some(Point::new(30.0, 25.0)), Some(Point::new(35.0, 25.0)));
        let (mut p, calls) = processor(Box::new(FixedDetector(vec![first, second])), false);
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);
        assert_eq!(out.overlays, 1);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_face_without_eyes_is_present_but_undecorated() {
        let (mut p, calls) = processor(Box::new(FixedDetector(vec![FaceFeature::default()])), false);
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);
        assert!(out.face_present);
        assert_eq!(out.overlays, 0);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_detector_error_delivers_frame_without_face() {
        let (mut p, calls) = processor(Box::new(FailingDetector), false);
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);
        assert!(!out.face_present);
        assert_eq!((out.frame.width(), out.frame.height()), (30, 40));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_degenerate_display_delivers_raw_frame() {
        let face = FaceFeature::new(Some(Point::new(10.0, 5.0)), None);
        let (mut p, calls) = processor(Box::new(FixedDetector(vec![face])), false);
        p.configure(&PipelineConfig {
            display_width: 0,
            ..config(false)
        });
        let out = p.on_frame(sensor_frame(), &mut NullPipelineLogger);
        assert!(!out.face_present);
        assert_eq!(out.frame.data(), sensor_frame().data());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_records_stage_timings() {
        let face = FaceFeature::new(Some(Point::new(10.0, 5.0)), None);
        let (mut p, _) = processor(Box::new(FixedDetector(vec![face])), false);
        let mut logger = LoggingPipelineLogger::new(10);
        p.on_frame(sensor_frame(), &mut logger);
        for stage in ["detect", "project", "composite"] {
            assert_eq!(logger.timings_for(stage).map(|s| s.count()), Some(1));
        }
        let faces = logger.metrics_for("faces").map(|s: RunningStat| s.mean());
        assert_eq!(faces, Some(1.0));
    }
}
