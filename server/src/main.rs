// Copyright (c) 2026 Meshmail Contributors. MIT License.
// See LICENSE for details.

//! # Meshmail Directory Server
//!
//! Entry point for the `meshmail-server` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the registration API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the directory server
//! - `init`    — initialize the data directory and generate the authority key
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod registration;
mod registry;
mod signer;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use meshmail_protocol::crypto::keys::MeshKeypair;

use cli::{Commands, MeshmailServerCli};
use logging::LogFormat;
use metrics::ServerMetrics;
use registration::RegistrationService;
use registry::AddressRegistry;
use signer::{AuthoritySigner, LocalKms};

/// Filename of the authority secret key inside the data directory.
const AUTHORITY_KEY_FILE: &str = "authority.key";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = MeshmailServerCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Init(args) => init_data_dir(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the directory server: registration API plus metrics endpoint.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "meshmail_server=info,meshmail_protocol=info,tower_http=debug",
        args.log_format,
    );

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting meshmail-server"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let registry = Arc::new(
        AddressRegistry::open(&db_path)
            .with_context(|| format!("failed to open registry at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), users = registry.count(), "address registry opened");

    // --- Authority key ---
    let authority = load_authority_key(&args)?;
    tracing::info!(public_key = %authority.public_key_hex(), "authority key loaded");

    // --- Services ---
    let signer = Arc::new(AuthoritySigner::new(Arc::new(LocalKms::new(authority))));
    let registration = Arc::new(RegistrationService::new(Arc::clone(&registry), signer));

    // --- Metrics ---
    let server_metrics = Arc::new(ServerMetrics::new());
    server_metrics.registered_users.set(registry.count() as i64);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            meshmail_protocol::config::PROTOCOL_VERSION,
        ),
        registration,
        metrics: Arc::clone(&server_metrics),
        started_at: std::time::Instant::now(),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&server_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    registry.flush().context("failed to flush registry on shutdown")?;
    tracing::info!("meshmail-server stopped");
    Ok(())
}

/// Loads the authority keypair, preferring the CLI/env override, then
/// the key file written by `init`.
fn load_authority_key(args: &cli::RunArgs) -> Result<MeshKeypair> {
    if let Some(hex_key) = &args.authority_key {
        tracing::warn!("authority key supplied via flag/env; use the key file in production");
        return MeshKeypair::from_hex(hex_key.trim())
            .map_err(|_| anyhow::anyhow!("invalid authority key material in --authority-key"));
    }

    let key_path = args.data_dir.join(AUTHORITY_KEY_FILE);
    let hex_key = std::fs::read_to_string(&key_path).with_context(|| {
        format!(
            "failed to read authority key at {} (run `meshmail-server init` first)",
            key_path.display()
        )
    })?;

    MeshKeypair::from_hex(hex_key.trim()).map_err(|_| {
        anyhow::anyhow!("invalid authority key material in {}", key_path.display())
    })
}

/// Initializes the data directory and generates the authority keypair.
fn init_data_dir(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("meshmail_server=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing data directory");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let key_path = data_dir.join(AUTHORITY_KEY_FILE);
    if key_path.exists() {
        anyhow::bail!(
            "authority key already exists at {}; refusing to overwrite",
            key_path.display()
        );
    }

    let keypair = MeshKeypair::try_generate()
        .map_err(|_| anyhow::anyhow!("system randomness unavailable"))?;
    write_key_file(&key_path, &keypair.secret_key_hex())?;

    tracing::info!(
        public_key = %keypair.public_key_hex(),
        key_path = %key_path.display(),
        "authority keypair generated"
    );

    println!("Data directory initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Authority key  : {}", key_path.display());
    println!("  Public key     : {}", keypair.public_key_hex());

    Ok(())
}

/// Writes the hex-encoded secret key, owner-readable only on Unix.
fn write_key_file(key_path: &Path, hex_key: &str) -> Result<()> {
    std::fs::write(key_path, hex_key)
        .with_context(|| format!("failed to write authority key to {}", key_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("meshmail-server {}", env!("CARGO_PKG_VERSION"));
    println!("protocol        {}", meshmail_protocol::config::PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
