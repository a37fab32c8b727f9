use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::delivery::domain::delivery_sink::DeliverySink;
use crate::delivery::domain::latest_frame_slot::LatestFrameSlot;
use crate::delivery::domain::presence::PresenceEvent;

/// Wake-up token telling the delivery thread the slot may hold a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReady;

/// Channel for [`FrameReady`] tokens. One pending token covers any number
/// of publishes, so the channel never holds more than one.
pub fn wake_channel() -> (Sender<FrameReady>, Receiver<FrameReady>) {
    crossbeam_channel::bounded(1)
}

/// Wakes the delivery thread unless a wake-up is already pending. Returns
/// false once the delivery thread is gone.
pub fn notify(wake: &Sender<FrameReady>) -> bool {
    !matches!(wake.try_send(FrameReady), Err(TrySendError::Disconnected(_)))
}

/// Owns the thread on which every [`DeliverySink`] callback runs.
///
/// Runs until the wake channel disconnects. Callbacks are suppressed once
/// `running` is cleared, so a result that finishes after `stop()` began is
/// discarded instead of delivered.
pub struct DeliveryDispatcher {
    handle: JoinHandle<()>,
    delivered: Arc<AtomicUsize>,
}

impl DeliveryDispatcher {
    pub fn spawn(
        sink: Arc<dyn DeliverySink>,
        slot: Arc<LatestFrameSlot>,
        wake: Receiver<FrameReady>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let handle = std::thread::Builder::new()
            .name("delivery".into())
            .spawn(move || dispatch(&*sink, &slot, wake, &running, &counter))?;
        Ok(Self { handle, delivered })
    }

    /// Frames handed to the sink so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    /// The wake channel disconnected and the last frame was handled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread to drain. Returns the number of frames delivered.
    pub fn join(self) -> usize {
        if self.handle.join().is_err() {
            log::error!("Delivery thread panicked");
        }
        self.delivered.load(Ordering::Relaxed)
    }
}

fn dispatch(
    sink: &dyn DeliverySink,
    slot: &LatestFrameSlot,
    wake: Receiver<FrameReady>,
    running: &AtomicBool,
    delivered: &AtomicUsize,
) {
    for FrameReady in wake {
        if !running.load(Ordering::Acquire) {
            continue;
        }
        // A token can outlive the frame it announced when a later token's
        // pass already took it.
        let Some(pending) = slot.take() else {
            continue;
        };
        match pending.presence {
            Some(PresenceEvent::FaceFound) => sink.on_face_found(),
            Some(PresenceEvent::FaceLost) => sink.on_face_lost(),
            None => {}
        }
        let index = pending.frame.index();
        match sink.on_frame_ready(pending.frame) {
            Ok(()) => {
                delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => log::warn!("Sink rejected frame {index}: {e}"),
        }
    }
}
