use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for per-frame pipeline work.
///
/// Owned by the frame worker while a session runs and handed back to the
/// coordinator when it stops, so one logger can span several sessions.
pub trait PipelineLogger: Send {
    /// A capture session is about to deliver frames.
    fn session_started(&mut self) {}

    /// `count` frames have been processed in the current session.
    fn frame_processed(&mut self, count: usize);

    /// Wall time spent in one named stage for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-frame measurement such as the number of faces found.
    fn metric(&mut self, name: &str, value: f64);

    /// Called once the session's worker has exited.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_processed(&mut self, _count: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Count, mean and peak of a series, kept without storing the samples.
/// Live sessions have no frame limit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    count: usize,
    sum: f64,
    max: f64,
}

impl RunningStat {
    pub fn record(&mut self, value: f64) {
        self.max = if self.count == 0 { value } else { self.max.max(value) };
        self.count += 1;
        self.sum += value;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Aggregates stage timings and metrics, reports throughput through `log`
/// every `throttle_frames` frames and prints a breakdown when the session
/// ends.
pub struct LoggingPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, RunningStat>,
    metrics: BTreeMap<String, RunningStat>,
    started: Instant,
    frames: usize,
}

impl LoggingPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames: 0,
        }
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }

    /// The end-of-session report, or `None` before any frame was timed.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let wall_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Session summary ({} frames in {:.1}s, {:.1} fps):",
            self.frames,
            wall_ms / 1000.0,
            fps(self.frames, wall_ms)
        )];

        for (stage, stat) in &self.timings {
            let share = if wall_ms > 0.0 {
                stat.sum() / wall_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  ({share:4.1}% of wall time)",
                stat.mean(),
                stat.max()
            ));
        }
        for (name, stat) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.1}  max {}",
                stat.mean(),
                stat.max()
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LoggingPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for LoggingPipelineLogger {
    fn session_started(&mut self) {
        self.timings.clear();
        self.metrics.clear();
        self.frames = 0;
        self.started = Instant::now();
    }

    fn frame_processed(&mut self, count: usize) {
        self.frames = count;
        if count % self.throttle_frames == 0 {
            let wall_ms = self.started.elapsed().as_secs_f64() * 1000.0;
            log::info!("Processed {count} frames ({:.1} fps)", fps(count, wall_ms));
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn fps(frames: usize, wall_ms: f64) -> f64 {
    if wall_ms > 0.0 {
        frames as f64 / (wall_ms / 1000.0)
    } else {
        0.0
    }
}
