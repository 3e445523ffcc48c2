//! # Prometheus Metrics
//!
//! Operational metrics for the directory server, scraped at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the server.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers and background tasks.
#[derive(Clone)]
pub struct ServerMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total successful registrations.
    pub registrations_total: IntCounter,
    /// Registrations refused because the address was already taken,
    /// whether at the fast path or at the conditional insert.
    pub registration_conflicts_total: IntCounter,
    /// Registrations that failed because the signing backend was down.
    pub signing_failures_total: IntCounter,
    /// Total availability probes served.
    pub availability_checks_total: IntCounter,
    /// Current number of registered addresses.
    pub registered_users: IntGauge,
    /// Histogram of end-to-end registration latency in seconds,
    /// dominated by the signing round trip.
    pub registration_latency_seconds: Histogram,
}

impl ServerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("meshmail".into()), None)
            .expect("failed to create prometheus registry");

        let registrations_total = IntCounter::new(
            "registrations_total",
            "Total number of successful address registrations",
        )
        .expect("metric creation");
        registry
            .register(Box::new(registrations_total.clone()))
            .expect("metric registration");

        let registration_conflicts_total = IntCounter::new(
            "registration_conflicts_total",
            "Registrations refused because the address was already taken",
        )
        .expect("metric creation");
        registry
            .register(Box::new(registration_conflicts_total.clone()))
            .expect("metric registration");

        let signing_failures_total = IntCounter::new(
            "signing_failures_total",
            "Registrations that failed in the signing backend",
        )
        .expect("metric creation");
        registry
            .register(Box::new(signing_failures_total.clone()))
            .expect("metric registration");

        let availability_checks_total = IntCounter::new(
            "availability_checks_total",
            "Total number of availability probes served",
        )
        .expect("metric creation");
        registry
            .register(Box::new(availability_checks_total.clone()))
            .expect("metric registration");

        let registered_users =
            IntGauge::new("registered_users", "Current number of registered addresses")
                .expect("metric creation");
        registry
            .register(Box::new(registered_users.clone()))
            .expect("metric registration");

        let registration_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "registration_latency_seconds",
                "End-to-end registration latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(registration_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            registrations_total,
            registration_conflicts_total,
            signing_failures_total,
            availability_checks_total,
            registered_users,
            registration_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<ServerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
