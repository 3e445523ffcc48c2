//! # Availability Probe
//!
//! Debounced, cancellation-safe availability checking for address entry
//! UIs. Each keystroke calls [`AvailabilityProbe::on_input`]; the probe
//! validates locally first (invalid input never touches the network),
//! waits out a short debounce window, then queries the directory. A newer
//! input supersedes any in-flight probe, whose result is discarded rather
//! than published out of order.
//!
//! Results are advisory: only registration's storage-level uniqueness
//! check is authoritative, so a probe's "available" can still lose the
//! race at claim time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::address::validate;
use crate::config::AVAILABILITY_DEBOUNCE;
use crate::directory::Directory;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the probe currently knows about the text in the address field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Nothing entered yet, or the field was cleared.
    Idle,
    /// Input passed local validation; a directory query is pending or in
    /// flight.
    Checking { address: String },
    /// Input failed local validation. Carries the stable reason code.
    Invalid { input: String, reason: &'static str },
    /// The directory reported the address claimable.
    Available { address: String },
    /// The directory reported the address unclaimable.
    Unavailable { address: String, reason: String },
    /// The directory could not be queried. The address may or may not be
    /// free; the UI should allow proceeding to registration.
    Unknown { address: String },
}

/// Debounces address input and publishes the latest probe outcome on a
/// watch channel. Clone-cheap; clones share the generation counter, so a
/// probe started through one handle is superseded by input on another.
#[derive(Clone)]
pub struct AvailabilityProbe {
    directory: Arc<dyn Directory>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    tx: Arc<watch::Sender<ProbeOutcome>>,
}

impl AvailabilityProbe {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self::with_debounce(directory, AVAILABILITY_DEBOUNCE)
    }

    /// Same as [`new`](Self::new) with an explicit debounce window.
    pub fn with_debounce(directory: Arc<dyn Directory>, debounce: Duration) -> Self {
        let (tx, _rx) = watch::channel(ProbeOutcome::Idle);
        Self {
            directory,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
        }
    }

    /// Subscribe to outcome updates. The receiver immediately holds the
    /// most recent outcome.
    pub fn subscribe(&self) -> watch::Receiver<ProbeOutcome> {
        self.tx.subscribe()
    }

    /// Feed the current contents of the address field. Supersedes any
    /// probe still in flight for earlier input.
    pub fn on_input(&self, raw: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.publish(generation, ProbeOutcome::Idle);
            return;
        }

        // Local validation short-circuit: a malformed address never
        // reaches the directory.
        let address = match validate(trimmed) {
            Ok(address) => address,
            Err(err) => {
                self.publish(
                    generation,
                    ProbeOutcome::Invalid {
                        input: trimmed.to_string(),
                        reason: err.reason_code(),
                    },
                );
                return;
            }
        };

        self.publish(
            generation,
            ProbeOutcome::Checking { address: address.as_str().to_string() },
        );

        let probe = self.clone();
        let address = address.into_string();
        tokio::spawn(async move {
            tokio::time::sleep(probe.debounce).await;
            if probe.is_stale(generation) {
                return;
            }

            let outcome = match probe.directory.availability(&address).await {
                Ok(availability) if availability.available => {
                    ProbeOutcome::Available { address }
                }
                Ok(availability) => ProbeOutcome::Unavailable {
                    address,
                    reason: availability.reason,
                },
                Err(err) => {
                    tracing::warn!(%address, error = %err, "availability probe failed");
                    ProbeOutcome::Unknown { address }
                }
            };

            // The directory round trip may have been outrun by newer input.
            probe.publish(generation, outcome);
        });
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn publish(&self, generation: u64, outcome: ProbeOutcome) {
        if !self.is_stale(generation) {
            let _ = self.tx.send(outcome);
        }
    }
}
