use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest single sleep while pacing, so a stop request is noticed promptly.
const PACING_SLICE: Duration = Duration::from_millis(20);

/// Sleeps until `due` in short slices. Returns false if `stop` was raised.
pub(crate) fn sleep_until(due: Instant, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= due {
            return true;
        }
        std::thread::sleep((due - now).min(PACING_SLICE));
    }
}
