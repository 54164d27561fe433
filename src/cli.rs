//! CLI arguments and subcommands for wls-probe-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "wls-probe-exporter",
    about = "Multi-target Prometheus probe exporter for WebLogic instances",
    long_about = "Multi-target Prometheus probe exporter for WebLogic instances.\n\n\
                  Each scrape of /probe?host=<host>&port=<port> with basic-auth credentials \
                  queries that instance and returns its metrics together with \
                  weblogic_probe_success.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format, include the CA chain if signed)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Path to a test data snapshot (YAML/JSON) answering probes instead of live targets
    #[arg(short = 't', long)]
    pub test_data_file: Option<PathBuf>,

    /// Seconds to wait for a target before reporting the probe as failed (0 = no limit)
    #[arg(long)]
    pub probe_timeout: Option<u64>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run a single probe and print the resulting metrics
    Probe {
        /// Target host
        #[arg(long)]
        host: String,

        /// Target port
        #[arg(long)]
        port: String,

        /// Username forwarded to the target
        #[arg(short = 'u', long)]
        username: String,

        /// Password forwarded to the target
        #[arg(long, env = "WLS_PROBE_PASSWORD", hide_env_values = true)]
        password: String,
    },
}
