//! File-backed query engine.
//!
//! Answers probes from a snapshot file instead of a live instance, so the
//! exporter can be run and scraped without a remote target. The snapshot
//! lists targets with their attribute values; the configured queries decide
//! which attributes become metrics.
//!
//! ```yaml
//! targets:
//!   - host: 10.0.0.5
//!     port: 7001
//!     username: weblogic
//!     password: welcome1
//!     attributes:
//!       serverRuntime.heapFreeCurrent: 104857600
//!       serverRuntime.openSocketsCurrentCount: 12
//!   - host: 10.0.0.6
//!     port: 7001
//!     error: "connection refused"
//! ```

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::{MetricSample, QueryDefinition, QueryEngine, QueryError};
use crate::target::{Credentials, TargetKey};

#[derive(Debug, Error)]
pub enum TestDataError {
    #[error("failed to read test data file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse test data file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("test data file lists {0} more than once")]
    DuplicateTarget(TargetKey),
}

/// One target entry in the snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestDataTarget {
    pub host: String,
    pub port: u16,
    /// Expected username; when set, probes with another username are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Forces every probe of this target to fail with this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
}

/// Snapshot file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestDataFile {
    #[serde(default)]
    pub targets: Vec<TestDataTarget>,
}

impl TestDataFile {
    /// Loads a snapshot from YAML or JSON, chosen by file extension.
    pub fn load(path: &Path) -> Result<Self, TestDataError> {
        let content = fs::read_to_string(path).map_err(|source| TestDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|message| TestDataError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// Query engine serving samples from a [`TestDataFile`].
pub struct TestDataEngine {
    targets: HashMap<TargetKey, TestDataTarget>,
    queries: Vec<QueryDefinition>,
}

impl TestDataEngine {
    pub fn new(data: TestDataFile, queries: Vec<QueryDefinition>) -> Result<Self, TestDataError> {
        let mut targets = HashMap::with_capacity(data.targets.len());
        for target in data.targets {
            let key = TargetKey::new(target.host.clone(), target.port);
            if targets.contains_key(&key) {
                return Err(TestDataError::DuplicateTarget(key));
            }
            targets.insert(key, target);
        }

        Ok(Self { targets, queries })
    }

    pub fn from_file(path: &Path, queries: Vec<QueryDefinition>) -> Result<Self, TestDataError> {
        let engine = Self::new(TestDataFile::load(path)?, queries)?;
        info!(
            "Loaded test data for {} targets from: {}",
            engine.targets.len(),
            path.display()
        );
        Ok(engine)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

impl QueryEngine for TestDataEngine {
    fn query(
        &self,
        target: &TargetKey,
        credentials: &Credentials,
    ) -> Result<Vec<MetricSample>, QueryError> {
        let entry = self
            .targets
            .get(target)
            .ok_or_else(|| QueryError::Unreachable(target.clone()))?;

        let username_ok = entry
            .username
            .as_ref()
            .map_or(true, |expected| *expected == credentials.username);
        let password_ok = entry
            .password
            .as_ref()
            .map_or(true, |expected| *expected == credentials.password);
        if !(username_ok && password_ok) {
            return Err(QueryError::Unauthorized {
                target: target.clone(),
                username: credentials.username.clone(),
            });
        }

        if let Some(message) = &entry.error {
            return Err(QueryError::Failed(message.clone()));
        }

        let samples: Vec<MetricSample> = self
            .queries
            .iter()
            .filter_map(|query| {
                entry
                    .attributes
                    .get(&query.attribute)
                    .map(|value| query.sample(*value))
            })
            .collect();

        debug!(
            "Test data query for {} returned {} of {} configured queries",
            target,
            samples.len(),
            self.queries.len()
        );
        Ok(samples)
    }
}
