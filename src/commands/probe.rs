//! Probe command implementation.
//!
//! Runs one probe through the same gateway the server uses and prints the
//! resulting exposition document.

use std::collections::HashMap;

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use wls_probe_exporter::gateway::{ProbeGateway, ProbeRequest};

/// Probes a single target and prints its metrics to stdout.
pub async fn command_probe(
    gateway: &ProbeGateway,
    host: &str,
    port: &str,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = HashMap::from([
        ("host".to_string(), host.to_string()),
        ("port".to_string(), port.to_string()),
    ]);

    let mut headers = HeaderMap::new();
    let token = STANDARD.encode(format!("{username}:{password}"));
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Basic {token}"))?);

    let request = ProbeRequest::from_parts(&params, &headers)?;
    let target = request.target.clone();
    let report = gateway.probe(request).await?;

    print!("{}", report.exposition.body());
    eprintln!(
        "{} probe of {} in {:.3}s",
        if report.success { "✅ Successful" } else { "❌ Failed" },
        target,
        report.duration.as_secs_f64()
    );

    Ok(())
}
