//! # Structured Logging
//!
//! Sets up the `tracing` subscriber for the directory server: format is
//! selectable on the command line, filtering follows `RUST_LOG`.
//!
//! Everything goes to stderr. Handlers never log addresses together with
//! key material — public keys are fine, attestation plumbing failures
//! are logged by reason only.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format, selectable via `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output for local development.
    Pretty,
    /// JSON lines for log aggregation in production.
    Json,
}

/// Initialize the global tracing subscriber.
///
/// Call once, early in `main()`. A second call panics.
///
/// `default_level` applies when `RUST_LOG` is unset; it takes the usual
/// `EnvFilter` directive syntax, e.g.
/// `meshmail_server=info,meshmail_protocol=info,tower_http=debug`.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true))
                .init();
        }
    }

    tracing::info!("logging initialized (format={:?})", format);
}
