//! # Enrollment Flow
//!
//! Drives a device from "no identity" to "attested identity": validate
//! the chosen address, ensure a keypair exists, claim the address at the
//! directory, then persist the returned attestation and the handle. The
//! handle write is last, so a crash anywhere earlier leaves the device
//! looking unregistered and the flow safely re-runnable.
//!
//! Only one enrollment attempt may run at a time per instance; a second
//! call while one is in flight is refused rather than queued, since the
//! first attempt will already decide the address's fate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::address::{validate, Address, AddressInvalid};
use crate::directory::{Directory, DirectoryError};
use crate::keystore::{CredentialManager, KeystoreError, SecureStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// The chosen address failed local validation.
    #[error(transparent)]
    InvalidAddress(#[from] AddressInvalid),

    /// Another enrollment attempt is already in flight on this instance.
    #[error("an enrollment attempt is already in progress")]
    AttemptInFlight,

    /// This device already holds a registered handle.
    #[error("device is already enrolled as {0}")]
    AlreadyEnrolled(String),

    /// The directory refused or could not complete the claim.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The secure store failed while reading or writing credentials.
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// One device's enrollment state machine.
pub struct Enrollment<S: SecureStore> {
    manager: CredentialManager<S>,
    directory: Arc<dyn Directory>,
    in_flight: AtomicBool,
}

impl<S: SecureStore> Enrollment<S> {
    pub fn new(manager: CredentialManager<S>, directory: Arc<dyn Directory>) -> Self {
        Self {
            manager,
            directory,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The credential manager backing this flow.
    pub fn manager(&self) -> &CredentialManager<S> {
        &self.manager
    }

    /// Attempt to claim `raw` as this device's address. On success the
    /// keypair, attestation signature, and handle are all persisted and
    /// the canonical [`Address`] is returned.
    pub async fn register(&self, raw: &str) -> Result<Address, EnrollmentError> {
        let address = validate(raw)?;

        if let Some(existing) = self.manager.load_handle()? {
            return Err(EnrollmentError::AlreadyEnrolled(existing));
        }

        // Single-flight guard. Released on every exit path below.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EnrollmentError::AttemptInFlight);
        }
        let result = self.register_inner(&address).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result?;
        Ok(address)
    }

    async fn register_inner(&self, address: &Address) -> Result<(), EnrollmentError> {
        // Reuse an existing keypair so a failed attempt does not burn
        // key material; generate one on first use.
        let keypair = self.manager.ensure_keypair()?;
        let public_key_hex = keypair.public_key_hex();

        tracing::info!(address = %address, "claiming address at directory");
        let signature = self
            .directory
            .register(address.as_str(), &public_key_hex)
            .await?;

        self.manager.save_signature(&signature)?;
        self.manager.save_handle(address)?;
        tracing::info!(address = %address, "enrollment complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::verifier::verify_with_key;
    use crate::directory::testing::FakeDirectory;
    use crate::keystore::MemoryStore;

    fn flow(dir: Arc<FakeDirectory>) -> Enrollment<MemoryStore> {
        Enrollment::new(CredentialManager::new(MemoryStore::new()), dir)
    }

    #[tokio::test]
    async fn successful_enrollment_persists_everything() {
        let dir = Arc::new(FakeDirectory::new());
        let flow = flow(dir.clone());

        let address = flow.register("alice").await.unwrap();
        assert_eq!(address.as_str(), "alice");

        let manager = flow.manager();
        let keypair = manager.load_keypair().unwrap().unwrap();
        let signature = manager.load_signature().unwrap().unwrap();
        assert_eq!(manager.load_handle().unwrap().as_deref(), Some("alice"));
        assert!(verify_with_key(
            &dir.authority().public_key(),
            "alice",
            &keypair.public_key_hex(),
            &signature,
        ));
    }

    #[tokio::test]
    async fn invalid_address_fails_before_any_side_effect() {
        let dir = Arc::new(FakeDirectory::new());
        let flow = flow(dir.clone());

        let err = flow.register("911help").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::InvalidAddress(_)));
        assert!(!flow.manager().has_keypair().unwrap());
        assert_eq!(dir.claim_count(), 0);
    }

    #[tokio::test]
    async fn taken_address_surfaces_directory_refusal() {
        let dir = Arc::new(FakeDirectory::new());
        flow(dir.clone()).register("alice").await.unwrap();

        let second = flow(dir.clone());
        let err = second.register("alice").await.unwrap_err();
        assert!(matches!(
            err,
            EnrollmentError::Directory(DirectoryError::AddressTaken)
        ));
        // Keypair survives for a retry with a different address.
        assert!(second.manager().has_keypair().unwrap());
        assert!(second.manager().load_handle().unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_attempt_reuses_keypair_on_retry() {
        let dir = Arc::new(FakeDirectory::new());
        flow(dir.clone()).register("alice").await.unwrap();

        let second = flow(dir.clone());
        second.register("alice").await.unwrap_err();
        let before = second.manager().load_keypair().unwrap().unwrap();

        second.register("bob").await.unwrap();
        let after = second.manager().load_keypair().unwrap().unwrap();
        assert_eq!(before.public_key(), after.public_key());
    }

    #[tokio::test]
    async fn already_enrolled_device_is_refused() {
        let dir = Arc::new(FakeDirectory::new());
        let flow = flow(dir);
        flow.register("alice").await.unwrap();

        let err = flow.register("bob").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::AlreadyEnrolled(h) if h == "alice"));
    }

    #[tokio::test]
    async fn signing_outage_is_retryable() {
        let dir = Arc::new(FakeDirectory::new());
        *dir.fail_with.lock() = Some(DirectoryError::SigningServiceUnavailable);

        let flow = flow(dir.clone());
        let err = flow.register("alice").await.unwrap_err();
        assert!(matches!(
            err,
            EnrollmentError::Directory(DirectoryError::SigningServiceUnavailable)
        ));

        *dir.fail_with.lock() = None;
        flow.register("alice").await.unwrap();
    }
}
