//! # Key Management
//!
//! Ed25519 keypair types for Meshmail device identities.
//!
//! Every device holds exactly one live keypair at a time. The private key
//! never leaves the device except as input to a local signing operation;
//! the public key travels as lowercase hex (64 characters) at every wire
//! boundary, and authority signatures travel as base64.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek).
//! - Generation uses the OS CSPRNG. [`MeshKeypair::try_generate`] surfaces
//!   an RNG read failure instead of panicking, because first-launch
//!   onboarding must halt cleanly if the platform has no entropy.
//! - Key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::codec::{self, CodecError};

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed — leaking details about
/// key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or malformed encoding")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("platform RNG unavailable: cannot draw key material")]
    EntropyUnavailable,
}

/// A Meshmail device keypair wrapping an Ed25519 signing key.
///
/// This is the atomic unit of identity: the attestation the authority
/// issues binds an address to this keypair's public half, and nothing else.
///
/// ## Serialization
///
/// `MeshKeypair` intentionally does NOT implement `Serialize`/`Deserialize`.
/// Serializing a private key should be a deliberate, conscious act (see the
/// backup codec), not something that happens because someone shoved a
/// keypair into a JSON response. Use `secret_key_hex()` / `from_hex()`
/// explicitly.
pub struct MeshKeypair {
    /// The Ed25519 signing (private) key. 32 bytes of pure responsibility.
    signing_key: SigningKey,
}

/// The public half of a device identity, safe to share with the world.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature over a message.
///
/// 64 bytes, deterministic for a given (key, message) pair. Stored as
/// `Vec<u8>` for serde compatibility but always exactly 64 bytes when
/// produced by this crate. A signature of any other length simply fails
/// verification — no panics, just `false`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSignature {
    bytes: Vec<u8>,
}

impl MeshKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    ///
    /// Infallible convenience for contexts (tests, tooling) where an RNG
    /// failure may abort the process. Device onboarding should use
    /// [`try_generate`](Self::try_generate) instead.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Generate a fresh keypair, surfacing RNG failure as
    /// [`KeyError::EntropyUnavailable`].
    ///
    /// Draws 32 bytes from the OS CSPRNG and uses them as the Ed25519 seed.
    /// If the platform RNG cannot be read, onboarding must halt — a keypair
    /// derived from weak entropy is worse than no keypair.
    pub fn try_generate() -> Result<Self, KeyError> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|_| KeyError::EntropyUnavailable)?;
        Ok(Self::from_seed(&seed))
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the 32-byte secret key *is* the seed; the public key is
    /// re-derived from it, so a restored keypair is always self-consistent.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Reconstruct a keypair from a hex-encoded secret key.
    ///
    /// This is the restore path for backups and the at-rest keystore format.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let seed: [u8; 32] =
            codec::decode_hex_exact(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> MeshPublicKey {
        MeshPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Get the public key as lowercase hex. This is the wire representation.
    pub fn public_key_hex(&self) -> String {
        self.public_key().to_hex()
    }

    /// Sign a message and return a `MeshSignature`.
    ///
    /// Ed25519 signatures are deterministic — the same (key, message) pair
    /// always produces the same signature (RFC 8032). No nonce management,
    /// no RNG needed at signing time.
    pub fn sign(&self, message: &[u8]) -> MeshSignature {
        let sig = self.signing_key.sign(message);
        MeshSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &MeshSignature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Exports the raw 32-byte secret key material.
    ///
    /// **Handle with extreme care.** This is the only secret standing
    /// between an attacker and full control of the identity. The only
    /// legitimate consumers are the keystore and the backup codec.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Hex-encoded secret key, the at-rest and backup representation.
    pub fn secret_key_hex(&self) -> String {
        codec::encode_hex(&self.secret_key_bytes())
    }
}

impl Clone for MeshKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for MeshKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even "partially."
        write!(f, "MeshKeypair(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for MeshKeypair {
    /// Two keypairs are equal if their public keys match. Comparing secret
    /// material in a non-constant-time way is a bad habit, and for identity
    /// purposes the public key is what matters.
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for MeshKeypair {}

// ---------------------------------------------------------------------------
// MeshPublicKey
// ---------------------------------------------------------------------------

impl MeshPublicKey {
    /// Try to create a `MeshPublicKey` from a byte slice.
    ///
    /// Validates the length and that the bytes represent a valid Ed25519
    /// point. We don't accept any 32 bytes — low-order points and other
    /// degenerate cases are rejected here rather than at verify time.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded public key string (64 lowercase hex characters).
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = codec::decode_hex_exact(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    ///
    /// Returns `true` if the signature is valid, `false` otherwise. A
    /// boolean rather than a `Result`, because the vast majority of callers
    /// want a yes/no answer and a detailed failure oracle helps nobody but
    /// attackers.
    pub fn verify(&self, message: &[u8], signature: &MeshSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; 64] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let dalek_sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation. 64 characters for 32 bytes.
    pub fn to_hex(&self) -> String {
        codec::encode_hex(&self.bytes)
    }
}

impl fmt::Display for MeshPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for MeshPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeshPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// MeshSignature
// ---------------------------------------------------------------------------

impl MeshSignature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Base64-encoded signature, the wire and at-rest representation.
    pub fn to_base64(&self) -> String {
        codec::encode_base64(&self.bytes)
    }

    /// Parse a base64-encoded signature, checking the decoded length.
    pub fn from_base64(s: &str) -> Result<Self, CodecError> {
        let bytes = codec::decode_base64(s)?;
        if bytes.len() != 64 {
            return Err(CodecError::WrongLength {
                expected: 64,
                got: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }
}

impl fmt::Debug for MeshSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b64 = self.to_base64();
        if b64.len() >= 16 {
            write!(f, "MeshSignature({}...)", &b64[..16])
        } else {
            write!(f, "MeshSignature({})", b64)
        }
    }
}
