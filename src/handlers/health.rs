//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! probe counters and the state of the error suppression tracker.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::metrics::{OUTCOME_FAILURE, OUTCOME_SUCCESS};
use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let uptime_hours = state.start_time.elapsed().as_secs_f64() / SECONDS_PER_HOUR;
    let uptime_str = if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    };

    let suppression = state.gateway.suppression();
    let mut table = String::new();
    writeln!(table, "{:30} | {:>10}", "Probe statistic", "Value").ok();
    writeln!(table, "{}", "-".repeat(43)).ok();
    writeln!(
        table,
        "{:30} | {:>10}",
        "successful probes",
        state.metrics.probes(OUTCOME_SUCCESS)
    )
    .ok();
    writeln!(
        table,
        "{:30} | {:>10}",
        "failed probes",
        state.metrics.probes(OUTCOME_FAILURE)
    )
    .ok();
    writeln!(
        table,
        "{:30} | {:>10}",
        "failing targets",
        suppression.failing_targets()
    )
    .ok();
    writeln!(
        table,
        "{:30} | {:>10}",
        "suppressed targets",
        suppression.suppressed_targets()
    )
    .ok();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("OK\n\nUptime: {uptime_str}\n\n{table}"),
    )
}
