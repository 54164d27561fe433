//! Metrics endpoint handler for the exporter's own metrics.
//!
//! Probe results are served by `/probe`; this endpoint only reports on the
//! exporter (probe counts, durations, failing and suppressed targets).

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
};
use prometheus::{Encoder, TextEncoder};
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 16 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, MetricsError> {
    debug!("Processing /metrics request");

    let suppression = state.gateway.suppression();
    state
        .metrics
        .failing_targets
        .set(suppression.failing_targets() as i64);
    state
        .metrics
        .suppressed_targets
        .set(suppression.suppressed_targets() as i64);

    let families = state.registry.gather();
    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if encoder.encode(&families, &mut buffer).is_err() {
        error!("Failed to encode Prometheus metrics");
        return Err(MetricsError::EncodingFailed);
    }

    let body = String::from_utf8(buffer).map_err(|_| MetricsError::EncodingFailed)?;
    Ok(([(CONTENT_TYPE, encoder.format_type().to_string())], body))
}
