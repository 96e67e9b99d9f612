//! Metrics sinks for training diagnostics.
//!
//! The trainer emits named scalars once per optimizer step; sinks are
//! fire-and-forget and their return value is never consumed.

/// Receives named scalar metrics at a given global step index.
pub trait MetricsSink {
    fn log(&mut self, step: u64, metrics: &[(&str, f64)]);
}

/// Discards all metrics.
#[derive(Debug, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn log(&mut self, _step: u64, _metrics: &[(&str, f64)]) {}
}

/// Writes one line per log call to stderr.
#[derive(Debug, Default)]
pub struct StderrSink;

impl MetricsSink for StderrSink {
    fn log(&mut self, step: u64, metrics: &[(&str, f64)]) {
        let body: Vec<String> = metrics
            .iter()
            .map(|(name, value)| format!("{}={:.5}", name, value))
            .collect();
        eprintln!("[step {}] {}", step, body.join(" "));
    }
}

/// Collects every logged metric in memory. Intended for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<(u64, Vec<(String, f64)>)>,
}

impl MetricsSink for RecordingSink {
    fn log(&mut self, step: u64, metrics: &[(&str, f64)]) {
        self.records.push((
            step,
            metrics
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        ));
    }
}
