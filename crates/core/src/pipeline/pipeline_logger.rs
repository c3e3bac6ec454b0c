use std::collections::HashMap;
use std::time::Instant;

/// Observer for run-level events: sampling progress, per-stage timings and
/// metrics.
///
/// Keeps the use case independent of where this goes (terminal, a job
/// record, nowhere).
pub trait PipelineLogger: Send {
    /// Samples handled so far out of the expected total.
    fn progress(&mut self, current: usize, total: usize);

    /// How long one invocation of a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time value (match confidence, timeline length, ...).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: nothing.
    fn summary(&self) {}
}

/// Discards everything. For embedding callers and tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Writes progress through `log` and collects timings and metrics for a
/// closing summary.
///
/// Progress lines are emitted every `throttle_samples` samples.
pub struct StdoutPipelineLogger {
    throttle_samples: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    samples_seen: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_samples: usize) -> Self {
        Self {
            throttle_samples: throttle_samples.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            samples_seen: 0,
            messages: Vec::new(),
        }
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Slide sync summary ({} samples, {elapsed_s:.1}s total):",
            self.samples_seen
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms",
                mean(durations)
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            lines.push(format!("  {name}: avg {:.2} over {}", mean(values), values.len()));
        }

        if self.samples_seen > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.2} samples/s",
                self.samples_seen as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(20)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.samples_seen = current;
        if total > 0 && (current % self.throttle_samples == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Sampling: {current}/{total} ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
