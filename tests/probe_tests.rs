//! Integration tests for the probe endpoint and gateway.
//!
//! These tests drive `/probe` against a scripted query engine and verify
//! validation, the rendered exposition document, and failure log suppression.

use axum::{
    body::to_bytes,
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::Level;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use wls_probe_exporter::handlers::{probe_handler, router};
use wls_probe_exporter::state::{AppState, SharedState};
use wls_probe_exporter::{
    Config, Credentials, MetricSample, ProbeGateway, ProbeRequest, QueryEngine, QueryError,
    TargetKey, ERROR_LOG_THRESHOLD,
};

/// Engine whose behavior is switched by the test.
#[derive(Default)]
struct ScriptedEngine {
    calls: AtomicUsize,
    failing: AtomicBool,
    samples: Vec<MetricSample>,
    delay: Option<Duration>,
    panics: bool,
}

impl ScriptedEngine {
    fn succeeding(samples: Vec<MetricSample>) -> Self {
        Self {
            samples,
            ..Default::default()
        }
    }

    fn failing() -> Self {
        let engine = Self::default();
        engine.failing.store(true, Ordering::SeqCst);
        engine
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QueryEngine for ScriptedEngine {
    fn query(
        &self,
        target: &TargetKey,
        _credentials: &Credentials,
    ) -> Result<Vec<MetricSample>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panics {
            panic!("engine exploded");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(QueryError::Unreachable(target.clone()));
        }
        Ok(self.samples.clone())
    }
}

/// Captures the level and formatted message of every event.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<(Level, String)>>>);

impl CapturedLogs {
    fn count_starting_with(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| m.starts_with(prefix))
            .count()
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// Events at INFO or more severe.
    fn notable(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level <= Level::INFO)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

const FAILURE_LINE: &str = "Failed to probe weblogic instance";
const PAUSE_LINE: &str = "Pausing logging of errors";

fn three_samples() -> Vec<MetricSample> {
    vec![
        MetricSample::gauge("weblogic_heap_free_bytes", "Free heap", 104857600.0)
            .with_label("server", "AdminServer"),
        MetricSample::gauge("weblogic_open_sockets", "Open sockets", 12.0),
        MetricSample::gauge("weblogic_threads_idle", "Idle threads", 4.0),
    ]
}

fn state_with(engine: Arc<ScriptedEngine>) -> SharedState {
    AppState::new(Config::default(), engine)
        .expect("exporter metrics should register")
        .shared()
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn basic_auth(username: &str, password: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let token = STANDARD.encode(format!("{username}:{password}"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {token}")).unwrap(),
    );
    headers
}

async fn call(
    state: &SharedState,
    query: HashMap<String, String>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let response: Response = probe_handler(State(state.clone()), Query(query), headers)
        .await
        .into_response();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn series(body: &str) -> Vec<&str> {
    body.lines().filter(|l| !l.starts_with('#')).collect()
}

fn request(host: &str, port: u16) -> ProbeRequest {
    ProbeRequest {
        target: TargetKey::new(host, port),
        credentials: Credentials::new("weblogic", "welcome1"),
    }
}

#[tokio::test]
async fn test_successful_probe_returns_indicator_and_samples() {
    let engine = Arc::new(ScriptedEngine::succeeding(three_samples()));
    let state = state_with(engine.clone());

    let (status, body) = call(
        &state,
        params(&[("host", "10.0.0.5"), ("port", "7001")]),
        basic_auth("weblogic", "welcome1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(engine.calls(), 1);
    assert!(body.contains("weblogic_probe_success 1"));
    assert!(body.contains("weblogic_heap_free_bytes{server=\"AdminServer\"} 104857600"));
    assert!(body.contains("weblogic_open_sockets 12"));
    assert!(body.contains("weblogic_threads_idle 4"));
    assert_eq!(series(&body).len(), 4);
}

#[tokio::test]
async fn test_failed_probe_is_still_a_successful_scrape() {
    let engine = Arc::new(ScriptedEngine::failing());
    let state = state_with(engine.clone());

    let (status, body) = call(
        &state,
        params(&[("host", "10.0.0.5"), ("port", "7001")]),
        basic_auth("weblogic", "welcome1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(series(&body), vec!["weblogic_probe_success 0"]);
    assert_eq!(
        state
            .gateway
            .suppression()
            .failures(&TargetKey::new("10.0.0.5", 7001)),
        Some(1)
    );
}

#[tokio::test]
async fn test_invalid_port_is_rejected_without_side_effects() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(logs.clone()));

    let engine = Arc::new(ScriptedEngine::failing());
    let state = state_with(engine.clone());

    let (status, body) = call(
        &state,
        params(&[("host", "10.0.0.5"), ("port", "abc")]),
        basic_auth("weblogic", "welcome1"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Unable to convert port to integer"));
    assert_eq!(engine.calls(), 0);
    assert_eq!(state.gateway.suppression().failing_targets(), 0);
    assert!(logs.notable().is_empty(), "unexpected logs: {:?}", logs.notable());
    assert_eq!(logs.count_starting_with(FAILURE_LINE), 0);
}

#[tokio::test]
async fn test_missing_parameters_are_rejected() {
    let engine = Arc::new(ScriptedEngine::succeeding(three_samples()));
    let state = state_with(engine.clone());

    let cases = [
        params(&[("port", "7001")]),
        params(&[("host", "10.0.0.5")]),
        params(&[("host", ""), ("port", "7001")]),
        params(&[("host", "10.0.0.5"), ("port", "")]),
        params(&[]),
    ];

    for query in cases {
        let (status, body) = call(&state, query, basic_auth("weblogic", "welcome1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Missing required parameter"), "body: {body}");
    }

    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_missing_parameter_is_reported_before_bad_port_and_auth() {
    let engine = Arc::new(ScriptedEngine::default());
    let state = state_with(engine);

    let (status, body) = call(&state, params(&[("port", "abc")]), HeaderMap::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Missing required parameter"));

    let (_, body) = call(
        &state,
        params(&[("host", "10.0.0.5"), ("port", "abc")]),
        HeaderMap::new(),
    )
    .await;
    assert!(body.contains("Unable to convert port"));
}

#[tokio::test]
async fn test_missing_authentication_is_rejected() {
    let engine = Arc::new(ScriptedEngine::succeeding(three_samples()));
    let state = state_with(engine.clone());

    let (status, body) = call(
        &state,
        params(&[("host", "10.0.0.5"), ("port", "7001")]),
        HeaderMap::new(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Missing authentication information"));
    assert_eq!(engine.calls(), 0);
    assert_eq!(
        state
            .metrics
            .invalid_requests_total
            .with_label_values(&["missing_authentication"])
            .get(),
        1
    );
}

#[tokio::test]
async fn test_twelve_failures_log_ten_lines_and_one_pause() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(logs.clone()));

    let gateway = ProbeGateway::new(Arc::new(ScriptedEngine::failing()), None);
    for _ in 0..10 {
        let report = gateway.probe(request("10.0.0.5", 7001)).await.unwrap();
        assert_eq!(report.exposition.probe_success(), Some(0.0));
    }

    assert_eq!(ERROR_LOG_THRESHOLD, 10);
    assert_eq!(logs.count_starting_with(FAILURE_LINE), 10);
    assert_eq!(logs.count_starting_with(PAUSE_LINE), 1);

    // Failures past the threshold stay silent at every level
    let before = logs.len();
    for _ in 0..2 {
        let report = gateway.probe(request("10.0.0.5", 7001)).await.unwrap();
        assert_eq!(report.exposition.probe_success(), Some(0.0));
    }
    assert_eq!(logs.len(), before);
}

#[tokio::test]
async fn test_success_resets_suppression() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(logs.clone()));

    let engine = Arc::new(ScriptedEngine::failing());
    let gateway = ProbeGateway::new(engine.clone(), None);
    let key = TargetKey::new("10.0.0.5", 7001);

    for _ in 0..15 {
        gateway.probe(request("10.0.0.5", 7001)).await.unwrap();
    }
    assert!(gateway.suppression().is_suppressed(&key));

    engine.failing.store(false, Ordering::SeqCst);
    let report = gateway.probe(request("10.0.0.5", 7001)).await.unwrap();
    assert!(report.success);
    assert_eq!(gateway.suppression().failures(&key), None);

    engine.failing.store(true, Ordering::SeqCst);
    gateway.probe(request("10.0.0.5", 7001)).await.unwrap();
    assert_eq!(gateway.suppression().failures(&key), Some(1));
    assert_eq!(logs.count_starting_with(FAILURE_LINE), 11);
    assert_eq!(logs.count_starting_with(PAUSE_LINE), 1);
}

#[tokio::test]
async fn test_targets_are_suppressed_independently() {
    let gateway = ProbeGateway::new(Arc::new(ScriptedEngine::failing()), None);

    for _ in 0..ERROR_LOG_THRESHOLD {
        gateway.probe(request("10.0.0.5", 1)).await.unwrap();
    }
    gateway.probe(request("10.0.0.", 51)).await.unwrap();

    let suppression = gateway.suppression();
    assert!(suppression.is_suppressed(&TargetKey::new("10.0.0.5", 1)));
    assert_eq!(suppression.failures(&TargetKey::new("10.0.0.", 51)), Some(1));
    assert_eq!(suppression.failing_targets(), 2);
    assert_eq!(suppression.suppressed_targets(), 1);
}

#[tokio::test]
async fn test_slow_engine_hits_deadline() {
    let engine = Arc::new(ScriptedEngine {
        delay: Some(Duration::from_millis(300)),
        samples: three_samples(),
        ..Default::default()
    });
    let gateway = ProbeGateway::new(engine, Some(Duration::from_millis(20)));

    let report = gateway.probe(request("10.0.0.5", 7001)).await.unwrap();
    assert!(!report.success);
    assert_eq!(series(report.exposition.body()), vec!["weblogic_probe_success 0"]);
}

#[tokio::test]
async fn test_engine_panic_counts_as_failure() {
    let engine = Arc::new(ScriptedEngine {
        panics: true,
        ..Default::default()
    });
    let gateway = ProbeGateway::new(engine, None);

    let report = gateway.probe(request("10.0.0.5", 7001)).await.unwrap();
    assert!(!report.success);
    assert_eq!(report.exposition.probe_success(), Some(0.0));
}

#[tokio::test]
async fn test_probe_outcomes_are_counted() {
    let engine = Arc::new(ScriptedEngine::succeeding(three_samples()));
    let state = state_with(engine.clone());
    let query = params(&[("host", "10.0.0.5"), ("port", "7001")]);

    call(&state, query.clone(), basic_auth("weblogic", "welcome1")).await;
    engine.failing.store(true, Ordering::SeqCst);
    call(&state, query.clone(), basic_auth("weblogic", "welcome1")).await;
    call(&state, query, basic_auth("weblogic", "welcome1")).await;

    assert_eq!(state.metrics.probes("success"), 1);
    assert_eq!(state.metrics.probes("failure"), 2);
}

/// Serves the full router on an ephemeral port and returns its base URL.
async fn serve(state: SharedState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_router_serves_target_metrics_over_http() {
    let engine = Arc::new(ScriptedEngine::succeeding(three_samples()));
    let base = serve(state_with(engine.clone())).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/probe?host=10.0.0.5&port=7001"))
        .basic_auth("weblogic", Some("welcome1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(
        content_type.starts_with("text/plain; version=0.0.4"),
        "content type: {content_type}"
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("weblogic_probe_success 1"), "body: {body}");
    assert!(body.contains("weblogic_open_sockets 12"), "body: {body}");
    assert_eq!(engine.calls(), 1);

    let rejected = client
        .get(format!("{base}/probe?host=10.0.0.5&port=abc"))
        .basic_auth("weblogic", Some("welcome1"))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(engine.calls(), 1);
}
