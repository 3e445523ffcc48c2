//! # REST API
//!
//! Builds the axum router that exposes the directory server's HTTP
//! interface. All endpoints share application state through axum's
//! `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                       |
//! |--------|--------------------------|-----------------------------------|
//! | GET    | `/health`                | Liveness probe                    |
//! | GET    | `/status`                | Server status summary             |
//! | GET    | `/availability/:address` | Advisory address availability     |
//! | POST   | `/register`              | Claim an address for a public key |
//!
//! ## Status mapping
//!
//! Registration refusals map onto HTTP statuses a client can branch on:
//! 400 for validation failures (the body carries the ordered reason
//! code), 409 when the address is taken — including the case where the
//! claim lost the storage-level race after a clean availability check —
//! 503 when signing is temporarily down, and 500 when key material is
//! missing or storage failed.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::SharedMetrics;
use crate::registration::{RegistrationError, RegistrationService};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The server's reported version string.
    pub version: String,
    /// Registration and availability service.
    pub registration: Arc<RegistrationService>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// When the server started, for uptime reporting.
    pub started_at: std::time::Instant,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/availability/:address", get(availability_handler))
        .route("/register", post(register_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server software version.
    pub version: String,
    /// Number of registered addresses.
    pub registered_users: u64,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /availability/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    /// True when the address can currently be claimed.
    pub available: bool,
    /// Reason code when unavailable; empty when available.
    pub reason: String,
}

/// Request payload for `POST /register`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// The address the device wants to claim.
    pub address: String,
    /// Hex-encoded Ed25519 device public key.
    pub public_key_hex: String,
}

/// Response payload for `POST /register` on success.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// The claimed address, canonical lowercase.
    pub address: String,
    /// Base64-encoded authority attestation signature.
    pub signature: String,
    /// Stable record identifier.
    pub user_id: String,
    /// When the claim was committed, ISO-8601.
    pub created_at: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable description.
    pub error: String,
    /// Stable machine-readable reason code.
    pub reason: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { error: error.into(), reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the server is alive.
///
/// This is the liveness probe for orchestrators. It intentionally does
/// not check the signing backend — that surfaces through registration
/// errors and the `signing_failures_total` metric.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns server status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = StatusResponse {
        version: state.version.clone(),
        registered_users: state.registration.registry().count() as u64,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `GET /availability/:address` — advisory availability probe.
///
/// Always 200 with a verdict; a syntactically invalid address is simply
/// "unavailable" with its validation reason, not a client error, so the
/// typing UI gets one uniform response shape.
async fn availability_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    state.metrics.availability_checks_total.inc();

    match state.registration.availability(&address) {
        Ok(availability) => (
            StatusCode::OK,
            Json(AvailabilityResponse {
                available: availability.available,
                reason: availability.reason,
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(%address, error = %err, "availability check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("availability check failed", "storage")),
            )
                .into_response()
        }
    }
}

/// `POST /register` — claim an address for a device public key.
async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let timer = state.metrics.registration_latency_seconds.start_timer();
    let outcome = state
        .registration
        .register(&req.address, &req.public_key_hex)
        .await;
    timer.observe_duration();

    match outcome {
        Ok(record) => {
            state.metrics.registrations_total.inc();
            state
                .metrics
                .registered_users
                .set(state.registration.registry().count() as i64);
            (
                StatusCode::CREATED,
                Json(RegisterResponse {
                    address: record.address,
                    signature: record.signature_b64,
                    user_id: record.id.to_string(),
                    created_at: record.created_at.to_rfc3339(),
                }),
            )
                .into_response()
        }
        Err(err) => registration_error_response(&state, err),
    }
}

/// Maps a [`RegistrationError`] to its HTTP response and records the
/// relevant metric.
fn registration_error_response(
    state: &AppState,
    err: RegistrationError,
) -> axum::response::Response {
    let (status, reason) = match &err {
        RegistrationError::Invalid(invalid) => {
            (StatusCode::BAD_REQUEST, invalid.reason_code().to_string())
        }
        RegistrationError::MalformedPublicKey => {
            (StatusCode::BAD_REQUEST, "malformed_public_key".to_string())
        }
        RegistrationError::AddressTaken => {
            state.metrics.registration_conflicts_total.inc();
            (StatusCode::CONFLICT, "taken".to_string())
        }
        RegistrationError::SigningServiceUnavailable => {
            state.metrics.signing_failures_total.inc();
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "signing_unavailable".to_string(),
            )
        }
        RegistrationError::KeyMaterialMissing => {
            state.metrics.signing_failures_total.inc();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "key_material_missing".to_string(),
            )
        }
        RegistrationError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "storage".to_string())
        }
    };

    (status, Json(ErrorResponse::new(err.to_string(), reason))).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
