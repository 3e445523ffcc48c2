//! # Registration Protocol
//!
//! Orchestrates an address claim end to end: validate, fast-path
//! availability check, attestation signing, then the authoritative
//! conditional insert into the registry.
//!
//! The availability lookup before signing is purely an optimization — it
//! spares the signing backend work for addresses that are obviously
//! taken. It reserves nothing. The registry's compare-and-swap is the
//! only uniqueness decision, so a claim that passed the fast path can
//! still lose at commit and is reported as taken, not as a server error.
//! The attestation signed for the loser binds a pair that never enters
//! the registry; it grants nothing and is simply dropped.

use std::sync::Arc;

use thiserror::Error;

use meshmail_protocol::address::{validate, AddressInvalid};
use meshmail_protocol::directory::Availability;

use crate::registry::{AddressRegistry, RegistryError, UserRecord};
use crate::signer::{AuthoritySigner, SignerError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a registration attempt was refused or failed.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The address failed validation. Carries the ordered reason.
    #[error(transparent)]
    Invalid(#[from] AddressInvalid),

    /// The address is already bound to another public key.
    #[error("address is already taken")]
    AddressTaken,

    /// The public key is not 64 lowercase hex characters.
    #[error("public key must be 64 lowercase hex characters")]
    MalformedPublicKey,

    /// The signing backend errored or timed out. Retryable.
    #[error("signing service unavailable")]
    SigningServiceUnavailable,

    /// The signing backend produced no usable signature.
    #[error("authority key material missing")]
    KeyMaterialMissing,

    /// The registry failed at the storage layer.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<SignerError> for RegistrationError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::MalformedPublicKey => RegistrationError::MalformedPublicKey,
            SignerError::SigningServiceUnavailable => {
                RegistrationError::SigningServiceUnavailable
            }
            SignerError::KeyMaterialMissing => RegistrationError::KeyMaterialMissing,
        }
    }
}

impl From<RegistryError> for RegistrationError {
    fn from(err: RegistryError) -> Self {
        RegistrationError::Storage(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The directory's registration and availability service.
pub struct RegistrationService {
    registry: Arc<AddressRegistry>,
    signer: Arc<AuthoritySigner>,
}

impl RegistrationService {
    pub fn new(registry: Arc<AddressRegistry>, signer: Arc<AuthoritySigner>) -> Self {
        Self { registry, signer }
    }

    /// The registry backing this service.
    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    /// Answer an availability probe. Advisory — [`register`] is the only
    /// operation that commits anything.
    ///
    /// [`register`]: Self::register
    pub fn availability(&self, raw: &str) -> Result<Availability, RegistrationError> {
        let address = match validate(raw) {
            Ok(address) => address,
            Err(err) => return Ok(Availability::unavailable(err.reason_code())),
        };
        if self.registry.lookup(address.as_str())?.is_some() {
            Ok(Availability::unavailable("taken"))
        } else {
            Ok(Availability::free())
        }
    }

    /// Claim `raw_address` for `public_key_hex`.
    ///
    /// On success the committed [`UserRecord`] is returned, attestation
    /// signature included.
    pub async fn register(
        &self,
        raw_address: &str,
        public_key_hex: &str,
    ) -> Result<UserRecord, RegistrationError> {
        let address = validate(raw_address)?;

        // Fast path: skip the signing round trip for addresses that are
        // already taken. Advisory only, so no reservation happens here.
        if self.registry.lookup(address.as_str())?.is_some() {
            return Err(RegistrationError::AddressTaken);
        }

        let signature = self
            .signer
            .sign_attestation(&address, public_key_hex)
            .await?;

        let record = UserRecord::new(address.as_str(), public_key_hex, &signature);
        if !self.registry.try_claim(&record)? {
            // Lost the race between the fast path and the insert. The
            // signature we just issued never reaches a client.
            tracing::info!(address = %address, "claim lost conditional insert");
            return Err(RegistrationError::AddressTaken);
        }

        tracing::info!(address = %address, user_id = %record.id, "address registered");
        Ok(record)
    }
}
