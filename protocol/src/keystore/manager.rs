//! # Credential Manager
//!
//! Owns the lifecycle of everything the device stores in its secure store:
//! the Ed25519 keypair (hex at rest, under fixed keys), the authority's
//! attestation signature (base64), and the registered handle.
//!
//! Two distinct reset operations exist on purpose:
//!
//! - [`delete_credentials`](CredentialManager::delete_credentials) removes
//!   key material and the signature but **keeps the handle** — this is the
//!   key-rotation path, where the identity survives and only the keys are
//!   replaced.
//! - [`reset_all`](CredentialManager::reset_all) removes the handle too —
//!   a full onboarding reset, after which the device has no identity.
//!
//! The private key never leaves this module except inside a [`MeshKeypair`],
//! and a `MeshKeypair` only ever signs locally.

use thiserror::Error;

use super::store::{SecureStore, StoreError};
use crate::address::Address;
use crate::config::{
    STORE_KEY_HANDLE, STORE_KEY_PRIVATE, STORE_KEY_PUBLIC, STORE_KEY_SIGNATURE,
};
use crate::crypto::keys::{KeyError, MeshKeypair};

/// Errors from credential lifecycle operations.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// The platform RNG could not be read. Fatal at first launch —
    /// onboarding must halt rather than proceed with weak keys.
    #[error("platform RNG unavailable: cannot generate a keypair")]
    EntropyUnavailable,

    /// Stored key material failed to parse or is internally inconsistent
    /// (e.g., the stored public key does not match the stored private key).
    #[error("stored key material is corrupt")]
    CorruptKeyMaterial,

    /// The backing secure store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<KeyError> for KeystoreError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::EntropyUnavailable => KeystoreError::EntropyUnavailable,
            _ => KeystoreError::CorruptKeyMaterial,
        }
    }
}

/// Manages the device's credentials on top of an injected [`SecureStore`].
pub struct CredentialManager<S: SecureStore> {
    store: S,
}

impl<S: SecureStore> CredentialManager<S> {
    /// Wrap a secure store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// True iff both halves of the keypair are present in the store.
    pub fn has_keypair(&self) -> Result<bool, KeystoreError> {
        let private = self.store.get(STORE_KEY_PRIVATE)?;
        let public = self.store.get(STORE_KEY_PUBLIC)?;
        Ok(private.is_some() && public.is_some())
    }

    /// Draw a fresh keypair from the OS CSPRNG.
    ///
    /// Does not persist it — pair with [`save_keypair`](Self::save_keypair),
    /// or use [`ensure_keypair`](Self::ensure_keypair) for the common
    /// load-or-create flow.
    pub fn generate_keypair(&self) -> Result<MeshKeypair, KeystoreError> {
        Ok(MeshKeypair::try_generate()?)
    }

    /// Persist a keypair under the fixed store keys, hex-encoded at rest.
    pub fn save_keypair(&self, keypair: &MeshKeypair) -> Result<(), KeystoreError> {
        self.store.set(STORE_KEY_PRIVATE, &keypair.secret_key_hex())?;
        self.store.set(STORE_KEY_PUBLIC, &keypair.public_key_hex())?;
        Ok(())
    }

    /// Load the stored keypair, if one exists.
    ///
    /// The keypair is reconstructed from the private key and the stored
    /// public key is cross-checked against the derived one — a mismatch
    /// means the store was tampered with or half-written, and the material
    /// is reported corrupt rather than silently trusted.
    pub fn load_keypair(&self) -> Result<Option<MeshKeypair>, KeystoreError> {
        let Some(private_hex) = self.store.get(STORE_KEY_PRIVATE)? else {
            return Ok(None);
        };
        let keypair =
            MeshKeypair::from_hex(&private_hex).map_err(|_| KeystoreError::CorruptKeyMaterial)?;

        if let Some(public_hex) = self.store.get(STORE_KEY_PUBLIC)? {
            if public_hex != keypair.public_key_hex() {
                return Err(KeystoreError::CorruptKeyMaterial);
            }
        }

        Ok(Some(keypair))
    }

    /// Load the keypair, generating and persisting one if absent.
    ///
    /// This is the first-launch path: at most one live keypair per device,
    /// created once and reused until an explicit reset.
    pub fn ensure_keypair(&self) -> Result<MeshKeypair, KeystoreError> {
        if let Some(existing) = self.load_keypair()? {
            return Ok(existing);
        }
        let fresh = self.generate_keypair()?;
        self.save_keypair(&fresh)?;
        tracing::info!(public_key = %fresh.public_key_hex(), "generated device keypair");
        Ok(fresh)
    }

    /// Persist the authority's attestation signature (base64).
    pub fn save_signature(&self, signature_b64: &str) -> Result<(), KeystoreError> {
        self.store.set(STORE_KEY_SIGNATURE, signature_b64)?;
        Ok(())
    }

    /// Load the stored attestation signature, if any.
    pub fn load_signature(&self) -> Result<Option<String>, KeystoreError> {
        Ok(self.store.get(STORE_KEY_SIGNATURE)?)
    }

    /// Persist the registered handle in canonical (lowercase) form.
    pub fn save_handle(&self, handle: &Address) -> Result<(), KeystoreError> {
        self.store.set(STORE_KEY_HANDLE, handle.as_str())?;
        Ok(())
    }

    /// Load the registered handle, if any.
    pub fn load_handle(&self) -> Result<Option<String>, KeystoreError> {
        Ok(self.store.get(STORE_KEY_HANDLE)?)
    }

    /// Remove key material and the attestation signature, preserving the
    /// handle. Used for key rotation without losing the identity.
    pub fn delete_credentials(&self) -> Result<(), KeystoreError> {
        self.store.delete(STORE_KEY_PRIVATE)?;
        self.store.delete(STORE_KEY_PUBLIC)?;
        self.store.delete(STORE_KEY_SIGNATURE)?;
        tracing::info!("credentials deleted, handle preserved");
        Ok(())
    }

    /// Remove everything, including the handle. Full onboarding reset.
    pub fn reset_all(&self) -> Result<(), KeystoreError> {
        self.delete_credentials()?;
        self.store.delete(STORE_KEY_HANDLE)?;
        tracing::info!("all identity state reset");
        Ok(())
    }
}
