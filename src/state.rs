//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::engine::QueryEngine;
use crate::gateway::ProbeGateway;
use crate::metrics::ExporterMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    /// Probe orchestration, owning the query engine and suppression tracker.
    pub gateway: ProbeGateway,
    /// Long-lived registry for the exporter's own metrics.
    pub registry: Registry,
    pub metrics: ExporterMetrics,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn QueryEngine>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new(&registry)?;
        let gateway = ProbeGateway::new(engine, config.probe_timeout());

        Ok(Self {
            gateway,
            registry,
            metrics,
            config: Arc::new(config),
            start_time: Instant::now(),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
