//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Process-wide metrics registry
pub struct Metrics {
    registry: Registry,

    // Transfers
    pub transfers_attempted: IntCounter,
    pub transfers_confirmed: IntCounter,
    pub transfers_failed: IntCounterVec,
    pub confirmation_poll_errors: IntCounter,

    // History
    pub history_fetches: IntCounter,
    pub history_records: IntCounter,
    pub history_skipped: IntCounter,

    // Histograms
    pub submit_latency: Histogram,
    pub rpc_latency: HistogramVec,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transfers_attempted = IntCounter::with_opts(Opts::new(
            "transfers_attempted_total",
            "Transfers handed to the submitter",
        ))?;

        let transfers_confirmed = IntCounter::with_opts(Opts::new(
            "transfers_confirmed_total",
            "Transfers that reached the configured commitment",
        ))?;

        let transfers_failed = IntCounterVec::new(
            Opts::new("transfers_failed_total", "Failed transfers by error category"),
            &["category"],
        )?;

        let confirmation_poll_errors = IntCounter::with_opts(Opts::new(
            "confirmation_poll_errors_total",
            "Signature status polls that failed at the transport level",
        ))?;

        let history_fetches = IntCounter::with_opts(Opts::new(
            "history_fetches_total",
            "Address history fetches started",
        ))?;

        let history_records = IntCounter::with_opts(Opts::new(
            "history_records_total",
            "Transaction records resolved for history fetches",
        ))?;

        let history_skipped = IntCounter::with_opts(Opts::new(
            "history_skipped_total",
            "Signatures skipped because they resolved to no record",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new("submit_latency_seconds", "Sign to confirmation latency")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let rpc_latency = HistogramVec::new(
            HistogramOpts::new("rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["method"],
        )?;

        registry.register(Box::new(transfers_attempted.clone()))?;
        registry.register(Box::new(transfers_confirmed.clone()))?;
        registry.register(Box::new(transfers_failed.clone()))?;
        registry.register(Box::new(confirmation_poll_errors.clone()))?;
        registry.register(Box::new(history_fetches.clone()))?;
        registry.register(Box::new(history_records.clone()))?;
        registry.register(Box::new(history_skipped.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            transfers_attempted,
            transfers_confirmed,
            transfers_failed,
            confirmation_poll_errors,
            history_fetches,
            history_records,
            history_skipped,
            submit_latency,
            rpc_latency,
        })
    }

    /// Count a failed transfer under its error category
    pub fn record_transfer_failure(&self, category: &str) {
        self.transfers_failed.with_label_values(&[category]).inc();
    }

    /// Render every registered metric in the prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    /// Record into the per-method RPC latency histogram
    pub fn observe_rpc(&self, method: &str) {
        metrics()
            .rpc_latency
            .with_label_values(&[method])
            .observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_counter_is_labelled() {
        let m = metrics();
        let before = m.transfers_failed.with_label_values(&["signing"]).get();
        m.record_transfer_failure("signing");
        assert_eq!(
            m.transfers_failed.with_label_values(&["signing"]).get(),
            before + 1
        );
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        let m = metrics();
        m.transfers_attempted.inc();
        Timer::new().observe_rpc("getLatestBlockhash");

        let text = m.render().unwrap();
        assert!(text.contains("transfers_attempted_total"));
        assert!(text.contains("rpc_latency_seconds"));
    }
}
