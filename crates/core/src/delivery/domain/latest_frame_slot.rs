use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::delivery::domain::presence::PresenceEvent;
use crate::shared::frame::Frame;

/// A processed frame waiting for the renderer, with the presence event
/// raised for it.
#[derive(Debug)]
pub struct PendingFrame {
    pub frame: Frame,
    pub presence: Option<PresenceEvent>,
}

/// Holds at most one frame waiting to be rendered.
///
/// Publishing replaces any frame the renderer has not taken yet, so memory
/// stays bounded no matter how far rendering falls behind. Presence travels
/// with the frame: a superseded frame's event survives only when the newer
/// frame raised none, so the sink always sees the latest presence change.
#[derive(Debug, Default)]
pub struct LatestFrameSlot {
    pending: Mutex<Option<PendingFrame>>,
    superseded: AtomicUsize,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `frame` as the latest. Returns true if it replaced a frame
    /// that was never taken.
    pub fn publish(&self, frame: Frame, presence: Option<PresenceEvent>) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = pending.take();
        let presence = presence.or(previous.as_ref().and_then(|p| p.presence));
        *pending = Some(PendingFrame { frame, presence });
        drop(pending);

        if previous.is_some() {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        previous.is_some()
    }

    pub fn take(&self) -> Option<PendingFrame> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Discards the pending frame, if any, without counting it.
    pub fn clear(&self) {
        self.take();
    }

    /// Frames that were overwritten before anyone rendered them.
    pub fn superseded(&self) -> usize {
        self.superseded.load(Ordering::Relaxed)
    }
}
