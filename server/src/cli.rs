//! # Command-Line Interface
//!
//! Argument parsing for the `meshmail-server` binary, built with clap's
//! derive API. Every flag can also come from an environment variable so
//! the binary fits container deployments without wrapper scripts.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Meshmail directory server — address registration and attestation.
#[derive(Debug, Parser)]
#[command(name = "meshmail-server", version, about, long_about = None)]
pub struct MeshmailServerCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the directory server.
    Run(RunArgs),
    /// Initialize a data directory and generate the authority key.
    Init(InitArgs),
    /// Print version information.
    Version,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory for the address registry and authority key.
    #[arg(long, env = "MESHMAIL_DATA_DIR", default_value = "./meshmail-data")]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "MESHMAIL_PORT", default_value_t = 8460)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "MESHMAIL_METRICS_PORT", default_value_t = 9460)]
    pub metrics_port: u16,

    /// Hex-encoded authority secret key. Overrides the key file in the
    /// data directory. Intended for tests and local development only —
    /// never pass real key material on the command line in production.
    #[arg(long, env = "MESHMAIL_AUTHORITY_KEY", hide_env_values = true)]
    pub authority_key: Option<String>,

    /// Log output format.
    #[arg(long, env = "MESHMAIL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: crate::logging::LogFormat,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize.
    #[arg(long, env = "MESHMAIL_DATA_DIR", default_value = "./meshmail-data")]
    pub data_dir: PathBuf,
}
