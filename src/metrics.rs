//! Prometheus metrics describing the exporter itself.
//!
//! These live in one long-lived registry served on `/metrics`. Probe results
//! never go here; each probe renders its own ephemeral registry.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

/// Label values for `probes_total`.
pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";

#[derive(Clone)]
pub struct ExporterMetrics {
    pub probes_total: IntCounterVec,          // labels: outcome
    pub invalid_requests_total: IntCounterVec, // labels: reason
    pub probe_duration_seconds: Histogram,
    pub failing_targets: IntGauge,
    pub suppressed_targets: IntGauge,
}

impl ExporterMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let probes_total = IntCounterVec::new(
            Opts::new(
                "wls_probe_exporter_probes_total",
                "Probes handled, by outcome",
            ),
            &["outcome"],
        )?;
        let invalid_requests_total = IntCounterVec::new(
            Opts::new(
                "wls_probe_exporter_invalid_requests_total",
                "Probe requests rejected before querying the target, by reason",
            ),
            &["reason"],
        )?;
        let probe_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "wls_probe_exporter_probe_duration_seconds",
                "Time spent querying a target and rendering its metrics",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        let failing_targets = IntGauge::new(
            "wls_probe_exporter_failing_targets",
            "Targets whose most recent probes failed",
        )?;
        let suppressed_targets = IntGauge::new(
            "wls_probe_exporter_suppressed_targets",
            "Failing targets whose error logging is paused",
        )?;

        registry.register(Box::new(probes_total.clone()))?;
        registry.register(Box::new(invalid_requests_total.clone()))?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;
        registry.register(Box::new(failing_targets.clone()))?;
        registry.register(Box::new(suppressed_targets.clone()))?;

        // Pre-create both outcome series so they show up at zero
        probes_total.with_label_values(&[OUTCOME_SUCCESS]);
        probes_total.with_label_values(&[OUTCOME_FAILURE]);

        Ok(Self {
            probes_total,
            invalid_requests_total,
            probe_duration_seconds,
            failing_targets,
            suppressed_targets,
        })
    }

    pub fn record_probe(&self, success: bool, duration_seconds: f64) {
        let outcome = if success {
            OUTCOME_SUCCESS
        } else {
            OUTCOME_FAILURE
        };
        self.probes_total.with_label_values(&[outcome]).inc();
        self.probe_duration_seconds.observe(duration_seconds);
    }

    pub fn record_invalid_request(&self, reason: &str) {
        self.invalid_requests_total.with_label_values(&[reason]).inc();
    }

    pub fn probes(&self, outcome: &str) -> u64 {
        self.probes_total.with_label_values(&[outcome]).get()
    }
}
