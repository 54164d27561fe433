//! WebLogic Probe Exporter Library
//!
//! A multi-target Prometheus exporter core. Each request to `/probe` names a
//! remote instance (`host`, `port`) and carries basic-auth credentials for it;
//! the exporter queries that instance through a [`QueryEngine`] and answers
//! with a freshly built exposition document containing
//! `weblogic_probe_success` and whatever samples the engine returned.
//!
//! # Features
//!
//! - **Probe validation**: missing parameters, bad ports and missing
//!   credentials are rejected with 400 before any query happens
//! - **Ephemeral registries**: every probe renders its own registry, nothing
//!   leaks between requests
//! - **Error suppression**: a persistently failing target logs its first ten
//!   failures and a single pause notice, then stays quiet until it recovers
//! - **Pluggable engine**: anything implementing [`QueryEngine`] can answer
//!   probes; [`TestDataEngine`] serves snapshots from a file
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use wls_probe_exporter::{
//!     Config, Credentials, MetricSample, QueryEngine, QueryError, TargetKey,
//! };
//! use wls_probe_exporter::state::AppState;
//!
//! struct StaticEngine;
//!
//! impl QueryEngine for StaticEngine {
//!     fn query(
//!         &self,
//!         _target: &TargetKey,
//!         _credentials: &Credentials,
//!     ) -> Result<Vec<MetricSample>, QueryError> {
//!         Ok(vec![MetricSample::gauge("weblogic_open_sockets", "Open sockets", 3.0)])
//!     }
//! }
//!
//! let state = AppState::new(Config::default(), Arc::new(StaticEngine))
//!     .expect("metrics registry")
//!     .shared();
//! let app = wls_probe_exporter::handlers::router(state);
//! # let _ = app;
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod state;
pub mod suppression;
pub mod target;

// Re-export main types for convenience
pub use config::Config;
pub use engine::{MetricSample, QueryDefinition, QueryEngine, QueryError, SampleKind, TestDataEngine};
pub use gateway::{ProbeError, ProbeGateway, ProbeReport, ProbeRequest};
pub use registry::{ExposedMetric, Exposition, ProbeRegistry, RegistryError, PROBE_SUCCESS_METRIC};
pub use suppression::{ErrorSuppression, FailureVerdict, ERROR_LOG_THRESHOLD};
pub use target::{Credentials, TargetKey};
