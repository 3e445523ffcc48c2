//! # Directory Client Interface
//!
//! The client-side seam to the address directory: availability probes and
//! registration. Shipping builds talk HTTP to a directory server; tests
//! plug in an in-memory implementation. Everything above this trait —
//! the availability probe, the enrollment flow — is transport-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by directory operations. These mirror the server's
/// refusal taxonomy so callers can map them to user-facing guidance
/// without string matching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// The address is already bound to another public key.
    #[error("address is already taken")]
    AddressTaken,

    /// The directory refused the request as invalid (bad address, bad
    /// public key encoding). Carries the server's reason code.
    #[error("directory rejected the request: {0}")]
    Rejected(String),

    /// The signing backend timed out or returned an error; the request
    /// may succeed on retry.
    #[error("signing service unavailable")]
    SigningServiceUnavailable,

    /// The signing backend produced no usable signature. Not retryable
    /// without operator intervention.
    #[error("authority key material missing")]
    KeyMaterialMissing,

    /// The directory could not be reached at all.
    #[error("directory transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of an availability probe against the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    /// True when the address can currently be claimed.
    pub available: bool,
    /// Machine-readable reason when unavailable ("taken",
    /// "reserved_prefix", ...); empty when available.
    #[serde(default)]
    pub reason: String,
}

impl Availability {
    /// An address that is free to claim.
    pub fn free() -> Self {
        Self { available: true, reason: String::new() }
    }

    /// An address that cannot be claimed, with a reason code.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { available: false, reason: reason.into() }
    }
}

/// Client-side view of the directory service.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Ask whether `address` can currently be claimed. Advisory only —
    /// the authoritative uniqueness check happens inside `register`.
    async fn availability(&self, address: &str) -> Result<Availability, DirectoryError>;

    /// Claim `address` for `public_key_hex`. On success returns the
    /// authority's attestation signature, base64-encoded.
    async fn register(
        &self,
        address: &str,
        public_key_hex: &str,
    ) -> Result<String, DirectoryError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory directory used by probe and enrollment tests.

    use super::*;
    use crate::attestation::message::build_message;
    use crate::crypto::keys::MeshKeypair;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A directory backed by a map and a local authority keypair. Signs
    /// real attestations so verification tests can run end to end.
    pub struct FakeDirectory {
        authority: MeshKeypair,
        claimed: Mutex<HashMap<String, String>>,
        pub fail_with: Mutex<Option<DirectoryError>>,
    }

    impl FakeDirectory {
        pub fn new() -> Self {
            Self {
                authority: MeshKeypair::generate(),
                claimed: Mutex::new(HashMap::new()),
                fail_with: Mutex::new(None),
            }
        }

        pub fn authority(&self) -> &MeshKeypair {
            &self.authority
        }

        pub fn claim_count(&self) -> usize {
            self.claimed.lock().len()
        }
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn availability(&self, address: &str) -> Result<Availability, DirectoryError> {
            if let Some(err) = self.fail_with.lock().clone() {
                return Err(err);
            }
            if self.claimed.lock().contains_key(address) {
                Ok(Availability::unavailable("taken"))
            } else {
                Ok(Availability::free())
            }
        }

        async fn register(
            &self,
            address: &str,
            public_key_hex: &str,
        ) -> Result<String, DirectoryError> {
            if let Some(err) = self.fail_with.lock().clone() {
                return Err(err);
            }
            let mut claimed = self.claimed.lock();
            if claimed.contains_key(address) {
                return Err(DirectoryError::AddressTaken);
            }
            let signature = self
                .authority
                .sign(&build_message(address, public_key_hex))
                .to_base64();
            claimed.insert(address.to_string(), public_key_hex.to_string());
            Ok(signature)
        }
    }
}
