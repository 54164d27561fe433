//! Query engine contract.
//!
//! The engine connects to a remote instance and returns the measurements
//! described by the configured queries. The gateway treats it as opaque: it
//! hands over the target and credentials, blocks until the engine returns, and
//! forwards whatever samples come back.

pub mod test_data;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::target::{Credentials, TargetKey};

pub use test_data::{TestDataEngine, TestDataError, TestDataFile, TestDataTarget};

/// Exposition type of a forwarded sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    #[default]
    Gauge,
    Counter,
}

/// One measured value with its name and labels.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub help: String,
    pub kind: SampleKind,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl MetricSample {
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: SampleKind::Gauge,
            labels: BTreeMap::new(),
            value,
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }
}

/// A single query definition handed to the engine at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Engine-specific attribute path.
    pub attribute: String,
    /// Exposed metric name.
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default)]
    pub kind: SampleKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl QueryDefinition {
    /// Help text, falling back to a generated one.
    pub fn help_text(&self) -> String {
        self.help
            .clone()
            .unwrap_or_else(|| format!("Value of {}", self.attribute))
    }

    /// Builds the sample this query yields for `value`.
    pub fn sample(&self, value: f64) -> MetricSample {
        MetricSample {
            name: self.metric.clone(),
            help: self.help_text(),
            kind: self.kind,
            labels: self.labels.clone(),
            value,
        }
    }
}

/// Failures reported by a query engine. Each one counts as a single probe failure.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("target {0} is unreachable")]
    Unreachable(TargetKey),

    #[error("credentials for user '{username}' were rejected by {target}")]
    Unauthorized { target: TargetKey, username: String },

    #[error("query failed: {0}")]
    Failed(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("query engine panicked: {0}")]
    Panicked(String),
}

/// Synchronous collection from one remote target.
///
/// Implementations are called from blocking worker threads and must be safe to
/// call concurrently with different arguments. No retries happen on top of
/// the engine; one failed call is one failed probe.
pub trait QueryEngine: Send + Sync {
    fn query(
        &self,
        target: &TargetKey,
        credentials: &Credentials,
    ) -> Result<Vec<MetricSample>, QueryError>;
}
