use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::capture::domain::capture_backend::CaptureBackend;
use crate::capture::domain::capture_state::CaptureState;
use crate::capture::domain::frame_output::{FrameOutput, SourceStats};
use crate::capture::domain::session_error::SessionError;
use crate::delivery::domain::delivery_sink::DeliverySink;
use crate::delivery::domain::latest_frame_slot::LatestFrameSlot;
use crate::delivery::domain::presence::PresenceTracker;
use crate::delivery::infrastructure::delivery_dispatcher::{wake_channel, DeliveryDispatcher};
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::infrastructure::frame_worker::{FrameWorker, WorkerLinks};
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::frame::Frame;

/// Frame counters for the current session, or the last one once stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames that went through detection and compositing.
    pub processed: usize,
    /// Frames discarded at capture because the worker was busy.
    pub dropped: usize,
    /// Processed frames replaced in the slot before the sink took them.
    pub superseded: usize,
    /// Frames handed to the sink.
    pub delivered: usize,
}

/// Threads and shared state that exist only while a session runs.
struct Session {
    running: Arc<AtomicBool>,
    slot: Arc<LatestFrameSlot>,
    source: Arc<SourceStats>,
    worker: FrameWorker,
    dispatcher: DeliveryDispatcher,
}

/// Owns the capture session and wires capture, processing and delivery.
///
/// Lifecycle changes happen only through `start` and `stop`, which take
/// `&mut self`; the worker and delivery threads never touch the state.
pub struct PipelineCoordinator {
    backend: Box<dyn CaptureBackend>,
    sink: Arc<dyn DeliverySink>,
    processor: Option<FrameProcessor>,
    logger: Option<Box<dyn PipelineLogger>>,
    config: PipelineConfig,
    state: CaptureState,
    session: Option<Session>,
    last_stats: PipelineStats,
}

impl PipelineCoordinator {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        processor: FrameProcessor,
        sink: Arc<dyn DeliverySink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            backend,
            sink,
            processor: Some(processor),
            logger: Some(Box::new(NullPipelineLogger)),
            config,
            state: CaptureState::Idle,
            session: None,
            last_stats: PipelineStats::default(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Configures the capture session and begins asynchronous delivery.
    ///
    /// Steps run in order: preset, input device, input attachment, frame
    /// output. The first failure leaves the state `Failed` and starts
    /// nothing. Calling this while running fails with
    /// [`SessionError::AlreadyRunning`] and leaves the session untouched.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if !self.state.can_start() {
            return Err(SessionError::AlreadyRunning);
        }

        self.state = CaptureState::Configuring;
        log::info!("Starting capture session (preset {})", self.config.preset);

        match self.configure() {
            Ok(session) => {
                self.session = Some(session);
                self.state = CaptureState::Running;
                log::info!("Capture session running");
                Ok(())
            }
            Err(e) => {
                log::error!("Capture session failed to start: {e}");
                self.backend.stop_running();
                self.state = CaptureState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Halts capture and releases the session. Returns once no sink callback
    /// can run anymore. No-op while idle; clears a failed state.
    pub fn stop(&mut self) {
        match self.state {
            CaptureState::Idle => return,
            CaptureState::Failed(_) => {
                self.state = CaptureState::Idle;
                return;
            }
            _ => {}
        }

        self.state = CaptureState::Stopping;
        if let Some(session) = self.session.take() {
            self.last_stats = self.teardown(session);
            let s = self.last_stats;
            log::info!(
                "Capture session stopped: {} processed, {} dropped, {} superseded, {} delivered",
                s.processed,
                s.dropped,
                s.superseded,
                s.delivered
            );
        }
        self.state = CaptureState::Idle;
    }

    pub fn stats(&self) -> PipelineStats {
        match &self.session {
            Some(session) => PipelineStats {
                processed: session.worker.processed(),
                dropped: session.source.dropped(),
                superseded: session.slot.superseded(),
                delivered: session.dispatcher.delivered(),
            },
            None => self.last_stats,
        }
    }

    /// The source ran out of frames and everything it produced has been
    /// through the pipeline. Only file-like sources ever finish.
    pub fn source_finished(&self) -> bool {
        self.session.as_ref().is_some_and(|s| {
            s.source.is_finished() && s.worker.is_finished() && s.dispatcher.is_finished()
        })
    }

    fn configure(&mut self) -> Result<Session, SessionError> {
        self.backend
            .set_preset(self.config.preset)
            .map_err(|e| SessionError::PresetUnavailable(e.to_string()))?;
        self.backend
            .bind_input()
            .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;
        self.backend
            .attach_input()
            .map_err(|e| SessionError::InputAttachFailed(e.to_string()))?;

        if self.processor.is_none() {
            return Err(SessionError::OutputAttachFailed(
                "frame processor was lost by a previous session".into(),
            ));
        }
        let (output, frames) = FrameOutput::bounded(self.config.channel_capacity);
        let source = output.stats();
        self.backend
            .attach_output(output)
            .map_err(|e| SessionError::OutputAttachFailed(e.to_string()))?;

        let session = self.launch(frames, source)?;
        if let Err(e) = self.backend.start_running() {
            self.teardown(session);
            return Err(SessionError::DeviceUnavailable(e.to_string()));
        }
        Ok(session)
    }

    /// Spawns the delivery and worker threads for a new session.
    fn launch(
        &mut self,
        frames: Receiver<Frame>,
        source: Arc<SourceStats>,
    ) -> Result<Session, SessionError> {
        let running = Arc::new(AtomicBool::new(true));
        let slot = Arc::new(LatestFrameSlot::new());
        let (wake_tx, wake_rx) = wake_channel();

        let dispatcher = DeliveryDispatcher::spawn(
            Arc::clone(&self.sink),
            Arc::clone(&slot),
            wake_rx,
            Arc::clone(&running),
        )
        .map_err(|e| SessionError::OutputAttachFailed(format!("delivery thread: {e}")))?;

        let mut processor = self.processor.take().ok_or_else(|| {
            SessionError::OutputAttachFailed("frame processor unavailable".into())
        })?;
        processor.configure(&self.config);
        let mut logger = self
            .logger
            .take()
            .unwrap_or_else(|| Box::new(NullPipelineLogger));
        logger.session_started();
        let links = WorkerLinks {
            frames,
            slot: Arc::clone(&slot),
            wake: wake_tx,
            running: Arc::clone(&running),
            presence: PresenceTracker::new(self.config.presence_events),
        };

        let worker = match FrameWorker::spawn(processor, logger, links) {
            Ok(worker) => worker,
            Err(e) => {
                running.store(false, Ordering::Release);
                dispatcher.join();
                return Err(SessionError::OutputAttachFailed(format!("frame worker: {e}")));
            }
        };

        Ok(Session {
            running,
            slot,
            source,
            worker,
            dispatcher,
        })
    }

    /// Stops capture, joins both threads and reclaims the processor.
    fn teardown(&mut self, session: Session) -> PipelineStats {
        session.running.store(false, Ordering::Release);
        self.backend.stop_running();

        let (processed, parts) = session.worker.join();
        if let Some((processor, logger)) = parts {
            logger.summary();
            self.processor = Some(processor);
            self.logger = Some(logger);
        }
        let delivered = session.dispatcher.join();
        session.slot.clear();

        PipelineStats {
            processed,
            dropped: session.source.dropped(),
            superseded: session.slot.superseded(),
            delivered,
        }
    }
}

impl Drop for PipelineCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
