//! Probe orchestration.
//!
//! [`ProbeGateway`] owns the query engine and the suppression tracker. It runs
//! one validated [`ProbeRequest`] through the engine, records the outcome, logs
//! failures subject to suppression, and renders the request's ephemeral
//! registry.

use axum::{
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{MetricSample, QueryEngine, QueryError};
use crate::registry::{Exposition, ProbeRegistry, RegistryError};
use crate::suppression::ErrorSuppression;
use crate::target::{parse_port, Credentials, TargetKey};

/// Request-level failures of the probe endpoint.
///
/// Validation errors are answered with 400 before the engine is called.
/// Probe failures are not errors at this level; see [`ProbeGateway::probe`].
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Missing required parameter: Please provide host and port parameters.")]
    MissingParameter,

    #[error("Unable to convert port to integer, please provide a valid value for port")]
    InvalidPort,

    #[error("Missing authentication information. Please provide basic authentication credentials.")]
    MissingAuthentication,

    #[error("Failed to build probe metrics: {0}")]
    Registry(#[from] RegistryError),
}

impl ProbeError {
    /// Short label value for the invalid request counter.
    pub fn reason(&self) -> &'static str {
        match self {
            ProbeError::MissingParameter => "missing_parameter",
            ProbeError::InvalidPort => "invalid_port",
            ProbeError::MissingAuthentication => "missing_authentication",
            ProbeError::Registry(_) => "registry",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProbeError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", self),
        )
            .into_response()
    }
}

/// A probe that passed parameter and authentication validation.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub target: TargetKey,
    pub credentials: Credentials,
}

impl ProbeRequest {
    /// Validates query parameters and headers, in order: `host` and `port`
    /// present, `port` numeric, basic-auth credentials present.
    pub fn from_parts(
        params: &HashMap<String, String>,
        headers: &HeaderMap,
    ) -> Result<Self, ProbeError> {
        let host = params.get("host").map(String::as_str).unwrap_or_default();
        let port = params.get("port").map(String::as_str).unwrap_or_default();
        if host.is_empty() || port.is_empty() {
            return Err(ProbeError::MissingParameter);
        }

        let port = parse_port(port).ok_or(ProbeError::InvalidPort)?;
        let credentials = Credentials::from_headers(headers).ok_or(ProbeError::MissingAuthentication)?;

        Ok(Self {
            target: TargetKey::new(host, port),
            credentials,
        })
    }
}

/// Result of one probe: the rendered document plus bookkeeping for telemetry.
#[derive(Debug)]
pub struct ProbeReport {
    pub exposition: Exposition,
    pub success: bool,
    pub duration: Duration,
}

pub struct ProbeGateway {
    engine: Arc<dyn QueryEngine>,
    suppression: ErrorSuppression,
    timeout: Option<Duration>,
}

impl ProbeGateway {
    /// `timeout` bounds the wait for the engine; `None` waits indefinitely.
    pub fn new(engine: Arc<dyn QueryEngine>, timeout: Option<Duration>) -> Self {
        Self {
            engine,
            suppression: ErrorSuppression::new(),
            timeout,
        }
    }

    pub fn suppression(&self) -> &ErrorSuppression {
        &self.suppression
    }

    /// Runs one probe. Engine failures never surface as errors here; they are
    /// rendered as `weblogic_probe_success 0`. Only registry failures do.
    pub async fn probe(&self, request: ProbeRequest) -> Result<ProbeReport, RegistryError> {
        let start = Instant::now();
        let target = request.target.clone();

        let result = self.run_query(request).await;
        let success = result.is_ok();

        match &result {
            Ok(samples) => {
                if let Some(failures) = self.suppression.record_success(&target) {
                    info!(
                        "Probe of {} succeeded again after {} consecutive failures",
                        target, failures
                    );
                }
                debug!("Probe of {} returned {} samples", target, samples.len());
            }
            Err(e) => self.log_failure(&target, e),
        }

        let exposition = ProbeRegistry::for_result(&result)?.render()?;

        Ok(ProbeReport {
            exposition,
            success,
            duration: start.elapsed(),
        })
    }

    /// Calls the engine on a blocking worker. The call is not cancelled when
    /// the deadline expires or the client goes away; it runs to completion.
    async fn run_query(&self, request: ProbeRequest) -> Result<Vec<MetricSample>, QueryError> {
        let engine = Arc::clone(&self.engine);
        let handle = tokio::task::spawn_blocking(move || {
            engine.query(&request.target, &request.credentials)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => return Err(QueryError::Timeout(limit)),
            },
            None => handle.await,
        };

        joined.unwrap_or_else(|e| Err(QueryError::Panicked(e.to_string())))
    }

    fn log_failure(&self, target: &TargetKey, error: &QueryError) {
        let verdict = self.suppression.record_failure(target);

        if verdict.should_log {
            warn!("Failed to probe weblogic instance {}: {}", target, error);
        }
        if verdict.just_suppressed {
            warn!(
                "Pausing logging of errors until a successful scrape occurs on {}...",
                target
            );
        }
    }
}
