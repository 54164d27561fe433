//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::registry::PROBE_SUCCESS_METRIC;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");
    let build = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let uptime_str = format!(
        "{}h {}m {}s",
        uptime_secs / 3600,
        (uptime_secs % 3600) / 60,
        uptime_secs % 60
    );

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>WebLogic Probe Exporter</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; }}
        code {{ background: #f0f0f0; padding: 2px 4px; border-radius: 3px; }}
    </style>
</head>
<body>
    <h1>WebLogic Probe Exporter</h1>
    <p>Version {version} (build {build}), up {uptime_str}</p>
    <h2>Endpoints</h2>
    <ul>
        <li><code>/probe?host=&lt;host&gt;&amp;port=&lt;port&gt;</code> with basic-auth credentials:
            metrics of one target plus <code>{PROBE_SUCCESS_METRIC}</code></li>
        <li><a href="/metrics"><code>/metrics</code></a>: exporter metrics</li>
        <li><a href="/health"><code>/health</code></a>: health and suppression state</li>
    </ul>
</body>
</html>
"#
    ))
}
