use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::shared::frame::Frame;

/// Counters shared between a frame output and whoever observes the session.
#[derive(Debug, Default)]
pub struct SourceStats {
    accepted: AtomicUsize,
    dropped: AtomicUsize,
    finished: AtomicBool,
}

impl SourceStats {
    /// Frames handed to the worker.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Frames discarded because the worker was still busy.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The backend reported that it has no more frames.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Result of offering one frame to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// The worker was busy; the frame was discarded.
    Dropped,
    /// The session released its output; the producer should stop.
    Closed,
}

/// Producer-side handle through which a capture backend delivers frames.
///
/// Never blocks: a frame that arrives while the queue is full is dropped
/// and counted, so capture is never slowed by processing.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    tx: Sender<Frame>,
    stats: Arc<SourceStats>,
}

impl FrameOutput {
    /// Creates an output with a queue of `capacity` frames, returning the
    /// consumer end alongside it.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Frame>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (
            Self {
                tx,
                stats: Arc::new(SourceStats::default()),
            },
            rx,
        )
    }

    pub fn stats(&self) -> Arc<SourceStats> {
        Arc::clone(&self.stats)
    }

    pub fn submit(&self, frame: Frame) -> Submission {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                Submission::Accepted
            }
            Err(TrySendError::Full(frame)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!("Dropped late frame {}", frame.index());
                Submission::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Submission::Closed,
        }
    }

    /// Marks the source as exhausted. Frames already queued are still
    /// processed.
    pub fn finish(&self) {
        self.stats.finished.store(true, Ordering::Release);
    }
}
