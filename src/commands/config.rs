//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use wls_probe_exporter::cli::ConfigFormat;
use wls_probe_exporter::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("wls-probe-exporter.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# WebLogic Probe Exporter Configuration
# =====================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9325                   # HTTP port (alias: listen_port)
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: null             # Enable HTTPS (null = on when tls_cert_path is set)
# tls_cert_path: null          # Certificate (PEM), include the CA chain if signed
# tls_key_path: null           # Private key (PEM)
#
# Probing
# -------
# probe_timeout_seconds: 30    # Deadline per probe (0 = wait indefinitely)
# test_data_file: null         # Snapshot file answering probes (YAML/JSON)
#
# Queries
# -------
# queries:
#   - attribute: serverRuntime.openSocketsCurrentCount
#     metric: weblogic_open_sockets
#     help: "Current number of open sockets"
#     kind: gauge              # gauge | counter
#     labels:
#       server: AdminServer
"#;

    format!("{comments}\n{yaml}")
}
