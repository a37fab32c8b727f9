use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::delivery::domain::latest_frame_slot::LatestFrameSlot;
use crate::delivery::domain::presence::PresenceTracker;
use crate::delivery::infrastructure::delivery_dispatcher::{notify, FrameReady};
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;

/// How long the worker waits for a frame before re-checking the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Channels and shared state the worker is wired to for one session.
pub struct WorkerLinks {
    pub frames: Receiver<Frame>,
    pub slot: Arc<LatestFrameSlot>,
    pub wake: Sender<FrameReady>,
    pub running: Arc<AtomicBool>,
    pub presence: PresenceTracker,
}

/// What the worker thread hands back when it exits.
pub type WorkerParts = (FrameProcessor, Box<dyn PipelineLogger>);

/// The single background thread that processes frames in arrival order.
///
/// Each frame is fully detected, transformed and composited before the next
/// one is received. Results go to the latest-frame slot; the worker never
/// waits on the renderer. The processor and logger come back from
/// [`FrameWorker::join`] so the next session can reuse them.
pub struct FrameWorker {
    handle: JoinHandle<WorkerParts>,
    processed: Arc<AtomicUsize>,
}

impl FrameWorker {
    pub fn spawn(
        processor: FrameProcessor,
        logger: Box<dyn PipelineLogger>,
        links: WorkerLinks,
    ) -> std::io::Result<Self> {
        let processed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&processed);
        let handle = std::thread::Builder::new()
            .name("frame-worker".into())
            .spawn(move || run(processor, logger, links, &counter))?;
        Ok(Self { handle, processed })
    }

    /// Frames fully processed so far, delivered or not.
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread to exit and returns the final processed count.
    /// The parts are `None` if the thread panicked, in which case the
    /// processor is lost.
    pub fn join(self) -> (usize, Option<WorkerParts>) {
        let parts = match self.handle.join() {
            Ok(parts) => Some(parts),
            Err(_) => {
                log::error!("Frame worker thread panicked");
                None
            }
        };
        (self.processed.load(Ordering::Relaxed), parts)
    }
}

fn run(
    mut processor: FrameProcessor,
    mut logger: Box<dyn PipelineLogger>,
    mut links: WorkerLinks,
    processed: &AtomicUsize,
) -> WorkerParts {
    loop {
        let frame = match links.frames.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => {
                if links.running.load(Ordering::Acquire) {
                    continue;
                }
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if !links.running.load(Ordering::Acquire) {
            break;
        }

        let result = processor.on_frame(frame, logger.as_mut());
        let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
        logger.frame_processed(count);

        // stop() may have begun while this frame was in flight.
        if !links.running.load(Ordering::Acquire) {
            break;
        }

        let presence = links.presence.observe(result.face_present);
        links.slot.publish(result.frame, presence);
        if !notify(&links.wake) {
            break;
        }
    }
    (processor, logger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositing::domain::overlay_asset::OverlayAsset;
    use crate::compositing::infrastructure::source_over_compositor::SourceOverCompositor;
    use crate::delivery::domain::presence::{PresenceEvent, PresenceEvents};
    use crate::delivery::infrastructure::delivery_dispatcher::wake_channel;
    use crate::detection::domain::face_feature::FaceFeature;
    use crate::detection::domain::feature_detector::FeatureDetector;
    use crate::pipeline::pipeline_config::PipelineConfig;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::geometry::Point;
    use crate::shared::orientation::Orientation;

    /// Reports a face on even frame indices only.
    struct AlternatingDetector;

    impl FeatureDetector for AlternatingDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            _orientation: Orientation,
        ) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>> {
            if frame.index() % 2 == 0 {
                Ok(vec![FaceFeature::new(Some(Point::new(4.0, 4.0)), None)])
            } else {
                Ok(vec![])
            }
        }
    }

    fn processor() -> FrameProcessor {
        let overlay = OverlayAsset::heart(4).unwrap();
        let mut p = FrameProcessor::new(
            Box::new(AlternatingDetector),
            Box::new(SourceOverCompositor::new()),
            Arc::new(overlay),
        );
        p.configure(&PipelineConfig {
            display_width: 8,
            display_height: 8,
            ..PipelineConfig::default()
        });
        p
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![50; 8 * 8 * 3], 8, 8, 3, index)
    }

    struct Harness {
        frames_tx: Sender<Frame>,
        wake_rx: Receiver<FrameReady>,
        slot: Arc<LatestFrameSlot>,
        running: Arc<AtomicBool>,
        worker: FrameWorker,
    }

    fn start(mode: PresenceEvents) -> Harness {
        let (frames_tx, frames) = crossbeam_channel::unbounded();
        let (wake, wake_rx) = wake_channel();
        let slot = Arc::new(LatestFrameSlot::new());
        let running = Arc::new(AtomicBool::new(true));
        let links = WorkerLinks {
            frames,
            slot: Arc::clone(&slot),
            wake,
            running: Arc::clone(&running),
            presence: PresenceTracker::new(mode),
        };
        let worker = FrameWorker::spawn(processor(), Box::new(NullPipelineLogger), links).unwrap();
        Harness {
            frames_tx,
            wake_rx,
            slot,
            running,
            worker,
        }
    }

    #[test]
    fn test_processes_until_source_disconnects() {
        let h = start(PresenceEvents::EveryFrame);
        for i in 0..3 {
            h.frames_tx.send(frame(i)).unwrap();
        }
        drop(h.frames_tx);
        let (processed, parts) = h.worker.join();
        assert!(parts.is_some());
        assert_eq!(processed, 3);

        // Nobody drained the slot, so three publishes leave one wake-up.
        assert_eq!(h.wake_rx.try_iter().count(), 1);
        let pending = h.slot.take().unwrap();
        assert_eq!(pending.frame.index(), 2);
        assert_eq!(pending.presence, Some(PresenceEvent::FaceFound));
        assert_eq!(h.slot.superseded(), 2);
    }

    #[test]
    fn test_transition_mode_suppresses_repeats() {
        let h = start(PresenceEvents::OnTransition);
        // Indices 0 and 2 both have faces, but only the first is reported
        // because the odd frame in between is never sent.
        h.frames_tx.send(frame(0)).unwrap();
        h.frames_tx.send(frame(2)).unwrap();
        drop(h.frames_tx);
        h.worker.join().1.unwrap();

        // The repeat carries no event, so frame 2 inherits frame 0's.
        let pending = h.slot.take().unwrap();
        assert_eq!(pending.frame.index(), 2);
        assert_eq!(pending.presence, Some(PresenceEvent::FaceFound));
    }

    #[test]
    fn test_taken_frame_does_not_repeat_transition() {
        let h = start(PresenceEvents::OnTransition);
        h.frames_tx.send(frame(0)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let first = loop {
            if let Some(pending) = h.slot.take() {
                break pending;
            }
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(first.presence, Some(PresenceEvent::FaceFound));

        h.frames_tx.send(frame(2)).unwrap();
        drop(h.frames_tx);
        h.worker.join().1.unwrap();
        assert_eq!(h.slot.take().unwrap().presence, None);
    }

    #[test]
    fn test_exits_when_running_cleared() {
        let h = start(PresenceEvents::EveryFrame);
        h.running.store(false, Ordering::Release);
        // Sender still alive: the worker must notice the flag on its own.
        assert!(h.worker.join().1.is_some());
        drop(h.frames_tx);
    }

    #[test]
    fn test_frames_after_stop_are_not_published() {
        let h = start(PresenceEvents::EveryFrame);
        h.running.store(false, Ordering::Release);
        h.frames_tx.send(frame(0)).unwrap();
        assert_eq!(h.worker.join().0, 0);
        assert!(h.slot.take().is_none());
        assert!(h.wake_rx.try_recv().is_err());
    }

    #[test]
    fn test_processed_count() {
        let h = start(PresenceEvents::EveryFrame);
        for i in 0..4 {
            h.frames_tx.send(frame(i)).unwrap();
        }
        drop(h.frames_tx);
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !h.worker.is_finished() {
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(h.worker.processed(), 4);
    }
}
