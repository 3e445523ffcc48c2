//! # Authority Signer
//!
//! Issues attestation signatures on behalf of the Meshmail directory
//! authority. The signer composes the canonical attestation message
//! itself from the validated address and public key — it never signs
//! caller-supplied bytes, so a compromised or buggy caller cannot turn
//! the authority into a general-purpose signing oracle.
//!
//! Key material lives behind the [`Kms`] trait. Production deployments
//! back it with a managed signing service; [`LocalKms`] holds the key in
//! process for development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use meshmail_protocol::address::Address;
use meshmail_protocol::attestation::message::build_message;
use meshmail_protocol::config::{
    AUTHORITY_KEY_VERSION, PUBLIC_KEY_HEX_LENGTH, SIGNATURE_LENGTH, SIGNING_TIMEOUT,
};
use meshmail_protocol::crypto::codec;
use meshmail_protocol::crypto::keys::MeshKeypair;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure inside a KMS backend.
#[derive(Debug, Error)]
pub enum KmsError {
    /// The backend could not be reached or returned an error.
    #[error("kms backend error: {0}")]
    Backend(String),
}

/// Failures surfaced by the authority signer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    /// The public key is not 64 lowercase hex characters.
    #[error("public key must be 64 lowercase hex characters")]
    MalformedPublicKey,

    /// The signing backend errored or exceeded the signing deadline.
    /// Retryable.
    #[error("signing service unavailable")]
    SigningServiceUnavailable,

    /// The backend answered but produced no usable signature — the key
    /// version is misconfigured or the key material is gone. Not
    /// retryable without operator intervention.
    #[error("authority key material missing")]
    KeyMaterialMissing,
}

// ---------------------------------------------------------------------------
// KMS seam
// ---------------------------------------------------------------------------

/// A signing backend holding the authority's private key.
#[async_trait]
pub trait Kms: Send + Sync {
    /// Sign `message` with the key identified by `key_version`, returning
    /// the raw signature bytes.
    async fn sign(&self, key_version: &str, message: &[u8]) -> Result<Vec<u8>, KmsError>;
}

/// In-process KMS that holds the authority keypair directly.
pub struct LocalKms {
    keypair: MeshKeypair,
}

impl LocalKms {
    pub fn new(keypair: MeshKeypair) -> Self {
        Self { keypair }
    }

    /// The authority's public key, hex-encoded. Logged at startup so
    /// operators can confirm which key a deployment is using.
    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }
}

#[async_trait]
impl Kms for LocalKms {
    async fn sign(&self, _key_version: &str, message: &[u8]) -> Result<Vec<u8>, KmsError> {
        Ok(self.keypair.sign(message).as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// AuthoritySigner
// ---------------------------------------------------------------------------

/// Produces attestation signatures for validated (address, key) pairs.
pub struct AuthoritySigner {
    kms: Arc<dyn Kms>,
    key_version: String,
}

impl AuthoritySigner {
    pub fn new(kms: Arc<dyn Kms>) -> Self {
        Self {
            kms,
            key_version: AUTHORITY_KEY_VERSION.to_string(),
        }
    }

    /// Sign the attestation for `address` and `public_key_hex`, returning
    /// the signature base64-encoded.
    ///
    /// The message is rebuilt here from the two validated inputs. A KMS
    /// error or deadline overrun maps to
    /// [`SignerError::SigningServiceUnavailable`]; a response with no
    /// plausible signature in it maps to
    /// [`SignerError::KeyMaterialMissing`].
    pub async fn sign_attestation(
        &self,
        address: &Address,
        public_key_hex: &str,
    ) -> Result<String, SignerError> {
        if !codec::is_lower_hex(public_key_hex, PUBLIC_KEY_HEX_LENGTH) {
            return Err(SignerError::MalformedPublicKey);
        }

        let message = build_message(address.as_str(), public_key_hex);

        let outcome = tokio::time::timeout(
            SIGNING_TIMEOUT,
            self.kms.sign(&self.key_version, &message),
        )
        .await;

        let signature = match outcome {
            Err(_elapsed) => {
                tracing::warn!(address = %address, "signing deadline exceeded");
                return Err(SignerError::SigningServiceUnavailable);
            }
            Ok(Err(err)) => {
                tracing::warn!(address = %address, error = %err, "kms signing failed");
                return Err(SignerError::SigningServiceUnavailable);
            }
            Ok(Ok(bytes)) => bytes,
        };

        if signature.len() != SIGNATURE_LENGTH {
            tracing::error!(
                address = %address,
                got = signature.len(),
                "kms returned unusable signature"
            );
            return Err(SignerError::KeyMaterialMissing);
        }

        Ok(codec::encode_base64(&signature))
    }
}
