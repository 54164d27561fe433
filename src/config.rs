//! Configuration management for wls-probe-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats. Configuration is
//! read once at startup.

use crate::cli::{Args, ConfigFormat};
use crate::engine::QueryDefinition;
use crate::registry::PROBE_SUCCESS_METRIC;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9325;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    #[serde(
        default,
        alias = "listen_port",
        deserialize_with = "deserialize_port"
    )]
    pub port: Option<u16>,
    pub bind: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    // Probing
    /// Seconds to wait for the query engine; 0 disables the deadline
    #[serde(alias = "probe-timeout-seconds")]
    pub probe_timeout_seconds: Option<u64>,

    /// Path to test data snapshot answering probes instead of live targets
    #[serde(alias = "test-data-file")]
    pub test_data_file: Option<PathBuf>,

    /// Query definitions handed to the query engine
    #[serde(default)]
    pub queries: Vec<QueryDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            enable_tls: None,
            tls_cert_path: None,
            tls_key_path: None,
            probe_timeout_seconds: Some(DEFAULT_PROBE_TIMEOUT_SECS),
            test_data_file: None,
            queries: Vec::new(),
        }
    }
}

impl Config {
    /// TLS is on when requested explicitly, or when only a certificate path is given.
    pub fn tls_enabled(&self) -> bool {
        self.enable_tls
            .unwrap_or_else(|| self.tls_cert_path.is_some())
    }

    /// Deadline for a single probe, `None` when disabled.
    pub fn probe_timeout(&self) -> Option<Duration> {
        match self
            .probe_timeout_seconds
            .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS)
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Accepts the port as a number or as a string such as `"9325"`.
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match Option::<RawPort>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPort::Number(port)) => Ok(Some(port)),
        Some(RawPort::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawPort::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid listen port '{}'", text))),
    }
}

/// Checks a Prometheus metric name: `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Checks a Prometheus label name: `[a-zA-Z_][a-zA-Z0-9_]*`, not starting with `__`.
pub fn is_valid_label_name(name: &str) -> bool {
    !name.starts_with("__") && is_valid_metric_name(name) && !name.contains(':')
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Query validation
    let mut seen = HashSet::new();
    let mut families: HashMap<&str, &QueryDefinition> = HashMap::new();
    for query in &cfg.queries {
        if query.attribute.trim().is_empty() {
            return Err(format!("Query for metric '{}' has an empty attribute", query.metric).into());
        }
        if !is_valid_metric_name(&query.metric) {
            return Err(format!("Invalid metric name '{}' in queries", query.metric).into());
        }
        if let Some(label) = query.labels.keys().find(|l| !is_valid_label_name(l)) {
            return Err(format!(
                "Invalid label name '{}' on metric '{}'",
                label, query.metric
            )
            .into());
        }
        if query.metric == PROBE_SUCCESS_METRIC {
            return Err(format!(
                "Metric name '{}' is reserved for the probe outcome",
                PROBE_SUCCESS_METRIC
            )
            .into());
        }
        if !seen.insert((query.metric.as_str(), &query.labels)) {
            return Err(format!(
                "Metric '{}' is defined more than once with the same labels",
                query.metric
            )
            .into());
        }
        match families.get(query.metric.as_str()).copied() {
            Some(first) => check_same_family(first, query)?,
            None => {
                families.insert(query.metric.as_str(), query);
            }
        }
    }

    if let Some(path) = &cfg.test_data_file {
        if !path.exists() {
            return Err(format!("Test data file not found: {}", path.display()).into());
        }
    }

    // TLS validation
    if cfg.tls_enabled() {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Queries sharing a metric name end up in one metric family, which needs a
/// single help text, a single type and the same label names on every series.
fn check_same_family(
    first: &QueryDefinition,
    other: &QueryDefinition,
) -> Result<(), Box<dyn std::error::Error>> {
    if first.kind != other.kind {
        return Err(format!(
            "Metric '{}' is defined with different kinds ({:?} and {:?})",
            other.metric, first.kind, other.kind
        )
        .into());
    }
    if first.help_text() != other.help_text() {
        return Err(format!(
            "Metric '{}' is defined with different help texts ('{}' and '{}')",
            other.metric,
            first.help_text(),
            other.help_text()
        )
        .into());
    }
    if !first.labels.keys().eq(other.labels.keys()) {
        return Err(format!(
            "Metric '{}' is defined with different label names",
            other.metric
        )
        .into());
    }
    Ok(())
}

/// Checks that a TLS file exists, is readable and is not empty.
fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        return Err(format!("TLS {} file not found: {}", what, path).into());
    }

    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
        Ok(_) => Ok(()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    if let Some(test_file) = &args.test_data_file {
        config.test_data_file = Some(test_file.clone());
    }
    if let Some(timeout) = args.probe_timeout {
        config.probe_timeout_seconds = Some(timeout);
    }

    Ok(config)
}

/// Loads the config file, trying the default locations when no path is given.
/// Missing files yield the default configuration.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/wls-probe-exporter/config.yaml",
                "/etc/wls-probe-exporter/config.yml",
                "./wls-probe-exporter.yaml",
                "./wls-probe-exporter.yml",
                "./config.yaml",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config text; the extension selects JSON or TOML, anything else is YAML.
pub fn parse_config(
    content: &str,
    extension: Option<&str>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}
