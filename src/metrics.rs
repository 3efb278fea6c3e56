//! Metrics sink contract (§2, component H) and two implementations: a
//! `prometheus`-backed sink for production use and a no-op sink for tests
//! and hosts that don't care to scrape anything.

use prometheus::{HistogramVec, IntCounterVec, Opts, Registry};

/// Counter/histogram emission point for the controller and snapshot
/// scheduler. A given metric name is only ever written by one controller
/// instance's task, so implementations need not synchronize beyond what
/// the underlying library already provides.
pub trait MetricsSink: Send + Sync {
    fn record_processed(&self, controller: &str);
    fn record_skipped(&self, controller: &str);
    fn record_phase_retry(&self, controller: &str, phase: &'static str);
    fn record_snapshot_written(&self, controller: &str);
    fn record_snapshot_failed(&self, controller: &str);
    fn record_error(&self, controller: &str, label: &'static str);
    fn observe_phase_duration(&self, controller: &str, phase: &'static str, seconds: f64);
}

/// Discards everything. Used as the default sink and in tests that don't
/// assert on metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_processed(&self, _controller: &str) {}
    fn record_skipped(&self, _controller: &str) {}
    fn record_phase_retry(&self, _controller: &str, _phase: &'static str) {}
    fn record_snapshot_written(&self, _controller: &str) {}
    fn record_snapshot_failed(&self, _controller: &str) {}
    fn record_error(&self, _controller: &str, _label: &'static str) {}
    fn observe_phase_duration(&self, _controller: &str, _phase: &'static str, _seconds: f64) {}
}

/// A `prometheus`-backed sink. Registers its collectors on the supplied
/// `Registry` so a host application can expose them alongside its own
/// metrics on a single `/metrics` endpoint.
pub struct PrometheusMetrics {
    records_processed_total: IntCounterVec,
    records_skipped_total: IntCounterVec,
    phase_retries_total: IntCounterVec,
    snapshots_written_total: IntCounterVec,
    snapshots_failed_total: IntCounterVec,
    errors_total: IntCounterVec,
    phase_duration_seconds: HistogramVec,
}

impl PrometheusMetrics {
    /// Register the controller's collectors on `registry`.
    pub fn register(registry: &Registry) -> anyhow::Result<Self> {
        let records_processed_total = IntCounterVec::new(
            Opts::new(
                "stream_controller_records_processed_total",
                "Records that completed the four-phase handling sequence",
            ),
            &["controller"],
        )?;
        let records_skipped_total = IntCounterVec::new(
            Opts::new(
                "stream_controller_records_skipped_total",
                "Records rejected by the event filter or given no handler",
            ),
            &["controller"],
        )?;
        let phase_retries_total = IntCounterVec::new(
            Opts::new(
                "stream_controller_phase_retries_total",
                "Transient retries of phase 2 or phase 3",
            ),
            &["controller", "phase"],
        )?;
        let snapshots_written_total = IntCounterVec::new(
            Opts::new(
                "stream_controller_snapshots_written_total",
                "Snapshots committed",
            ),
            &["controller"],
        )?;
        let snapshots_failed_total = IntCounterVec::new(
            Opts::new(
                "stream_controller_snapshots_failed_total",
                "Snapshot writes aborted due to error",
            ),
            &["controller"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new("stream_controller_errors_total", "Errors by kind"),
            &["controller", "kind"],
        )?;
        let phase_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "stream_controller_phase_duration_seconds",
                "Wall-clock duration of a single phase invocation",
            ),
            &["controller", "phase"],
        )?;

        registry.register(Box::new(records_processed_total.clone()))?;
        registry.register(Box::new(records_skipped_total.clone()))?;
        registry.register(Box::new(phase_retries_total.clone()))?;
        registry.register(Box::new(snapshots_written_total.clone()))?;
        registry.register(Box::new(snapshots_failed_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(phase_duration_seconds.clone()))?;

        Ok(Self {
            records_processed_total,
            records_skipped_total,
            phase_retries_total,
            snapshots_written_total,
            snapshots_failed_total,
            errors_total,
            phase_duration_seconds,
        })
    }
}

impl MetricsSink for PrometheusMetrics {
    fn record_processed(&self, controller: &str) {
        self.records_processed_total
            .with_label_values(&[controller])
            .inc();
    }

    fn record_skipped(&self, controller: &str) {
        self.records_skipped_total
            .with_label_values(&[controller])
            .inc();
    }

    fn record_phase_retry(&self, controller: &str, phase: &'static str) {
        self.phase_retries_total
            .with_label_values(&[controller, phase])
            .inc();
    }

    fn record_snapshot_written(&self, controller: &str) {
        self.snapshots_written_total
            .with_label_values(&[controller])
            .inc();
    }

    fn record_snapshot_failed(&self, controller: &str) {
        self.snapshots_failed_total
            .with_label_values(&[controller])
            .inc();
    }

    fn record_error(&self, controller: &str, label: &'static str) {
        self.errors_total
            .with_label_values(&[controller, label])
            .inc();
    }

    fn observe_phase_duration(&self, controller: &str, phase: &'static str, seconds: f64) {
        self.phase_duration_seconds
            .with_label_values(&[controller, phase])
            .observe(seconds);
    }
}
