//! Probe endpoint handler.
//!
//! `/probe?host=<host>&port=<port>` with basic-auth credentials. Invalid
//! requests get a 400 with a plaintext message. Every valid request gets a 200
//! whose body is the probe's own exposition document, whether or not the
//! target answered.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
};
use std::collections::HashMap;
use tracing::{debug, error, instrument};

use crate::gateway::{ProbeError, ProbeRequest};
use crate::registry::Exposition;
use crate::state::SharedState;

/// Handler for the /probe endpoint.
#[instrument(skip_all)]
pub async fn probe_handler(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Exposition, ProbeError> {
    debug!("Processing /probe request");

    let request = ProbeRequest::from_parts(&params, &headers).inspect_err(|e| {
        debug!("Rejected probe request: {}", e);
        state.metrics.record_invalid_request(e.reason());
    })?;

    let report = state.gateway.probe(request).await.map_err(|e| {
        error!("Failed to render probe metrics: {}", e);
        ProbeError::from(e)
    })?;

    state
        .metrics
        .record_probe(report.success, report.duration.as_secs_f64());

    debug!(
        "Probe completed: success={}, {} bytes, {:.3}ms",
        report.success,
        report.exposition.body().len(),
        report.duration.as_secs_f64() * 1000.0
    );

    Ok(report.exposition)
}
