//! # Attestation Verification
//!
//! The read-side dual of the authority signer. Anyone holding the
//! authority's published public key can audit a claimed identity entirely
//! offline: rebuild the canonical message, check the Ed25519 signature,
//! done. No backend, no network.
//!
//! Verification is **total**: it takes attacker-supplied strings and must
//! never panic or error. Every malformed input — bad base64, a key that
//! isn't a curve point, a truncated PEM — collapses to `false`. A detailed
//! failure oracle helps nobody but attackers, and a crash in an advisory
//! code path is strictly worse than a `false`.

use thiserror::Error;

use super::message::build_message;
use crate::config::{AUTHORITY_PUBLIC_KEY_PEM, PUBLIC_KEY_LENGTH};
use crate::crypto::codec;
use crate::crypto::keys::{MeshPublicKey, MeshSignature};

/// Errors from parsing an authority public key out of PEM.
///
/// These only surface from [`authority_key_from_pem`]; the boolean verify
/// functions swallow them by design.
#[derive(Debug, Error)]
pub enum AuthorityKeyError {
    #[error("PEM framing is malformed")]
    MalformedPem,

    #[error("PEM body is not valid base64")]
    InvalidBase64,

    #[error("DER payload too short to contain an Ed25519 key")]
    DerTooShort,

    #[error("embedded key bytes are not a valid Ed25519 point")]
    InvalidKey,
}

/// Extract the raw Ed25519 public key from a PEM-encoded
/// SubjectPublicKeyInfo value.
///
/// We don't carry a full DER parser for a fixed, known-shape document: an
/// Ed25519 SPKI is a 12-byte algorithm header followed by the raw key, so
/// the key is simply the final 32 bytes of the DER payload.
pub fn authority_key_from_pem(pem: &str) -> Result<MeshPublicKey, AuthorityKeyError> {
    let mut body = String::new();
    let mut in_body = false;
    for line in pem.lines() {
        let line = line.trim();
        if line.starts_with("-----BEGIN") {
            in_body = true;
            continue;
        }
        if line.starts_with("-----END") {
            in_body = false;
            continue;
        }
        if in_body {
            body.push_str(line);
        }
    }
    if body.is_empty() {
        return Err(AuthorityKeyError::MalformedPem);
    }

    let der = codec::decode_base64(&body).map_err(|_| AuthorityKeyError::InvalidBase64)?;
    if der.len() < PUBLIC_KEY_LENGTH {
        return Err(AuthorityKeyError::DerTooShort);
    }

    let raw = &der[der.len() - PUBLIC_KEY_LENGTH..];
    MeshPublicKey::try_from_slice(raw).map_err(|_| AuthorityKeyError::InvalidKey)
}

/// Verify an attestation against an explicitly provided authority key.
///
/// Used by tests and by deployments that pin a different authority than the
/// one compiled in. Returns `false` on any parse failure or signature
/// mismatch, never an error.
pub fn verify_with_key(
    authority: &MeshPublicKey,
    address: &str,
    public_key_hex: &str,
    signature_b64: &str,
) -> bool {
    let Ok(signature) = MeshSignature::from_base64(signature_b64) else {
        return false;
    };
    let message = build_message(address, public_key_hex);
    authority.verify(&message, &signature)
}

/// Verify an attestation against the compiled-in authority public key.
///
/// `verify(a, k, sign(a, k))` is `true` for every valid (address, key)
/// pair the real authority has signed; everything else — tampered
/// signatures, swapped addresses, malformed anything — is `false`.
pub fn verify(address: &str, public_key_hex: &str, signature_b64: &str) -> bool {
    let Ok(authority) = authority_key_from_pem(AUTHORITY_PUBLIC_KEY_PEM) else {
        // Unreachable with the compiled-in constant, but advisory code
        // does not get to panic on principle.
        return false;
    };
    verify_with_key(&authority, address, public_key_hex, signature_b64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::MeshKeypair;

    /// Builds a throwaway authority and a valid attestation for `address`.
    fn attested(address: &str) -> (MeshPublicKey, String, String) {
        let authority = MeshKeypair::generate();
        let device = MeshKeypair::generate();
        let key_hex = device.public_key_hex();
        let sig = authority.sign(&build_message(address, &key_hex));
        (authority.public_key(), key_hex, sig.to_base64())
    }

    #[test]
    fn compiled_in_pem_parses() {
        let key = authority_key_from_pem(AUTHORITY_PUBLIC_KEY_PEM).unwrap();
        assert_eq!(key.as_bytes().len(), 32);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (authority, key_hex, sig) = attested("alice");
        assert!(verify_with_key(&authority, "alice", &key_hex, &sig));
    }

    #[test]
    fn mixed_case_address_verifies_against_lowercase_signature() {
        // Signer and verifier both fold case, so the canonical bytes match.
        let (authority, key_hex, sig) = attested("alice");
        assert!(verify_with_key(&authority, "Alice", &key_hex, &sig));
    }

    #[test]
    fn tampered_signature_fails() {
        let (authority, key_hex, sig) = attested("alice");
        let mut sig_bytes = codec::decode_base64(&sig).unwrap();
        // Flip a single bit of a single byte.
        sig_bytes[10] ^= 0x01;
        let tampered = codec::encode_base64(&sig_bytes);
        assert!(!verify_with_key(&authority, "alice", &key_hex, &tampered));
    }

    #[test]
    fn every_single_byte_flip_fails() {
        let (authority, key_hex, sig) = attested("alice");
        let sig_bytes = codec::decode_base64(&sig).unwrap();
        for i in 0..sig_bytes.len() {
            let mut corrupted = sig_bytes.clone();
            corrupted[i] ^= 0xFF;
            let b64 = codec::encode_base64(&corrupted);
            assert!(
                !verify_with_key(&authority, "alice", &key_hex, &b64),
                "flip at byte {i} still verified"
            );
        }
    }

    #[test]
    fn changed_address_fails() {
        let (authority, key_hex, sig) = attested("alice");
        assert!(!verify_with_key(&authority, "bob", &key_hex, &sig));
    }

    #[test]
    fn changed_public_key_fails() {
        let (authority, _, sig) = attested("alice");
        let other = MeshKeypair::generate().public_key_hex();
        assert!(!verify_with_key(&authority, "alice", &other, &sig));
    }

    #[test]
    fn wrong_authority_fails() {
        let (_, key_hex, sig) = attested("alice");
        let impostor = MeshKeypair::generate().public_key();
        assert!(!verify_with_key(&impostor, "alice", &key_hex, &sig));
    }

    #[test]
    fn malformed_inputs_collapse_to_false() {
        let (authority, key_hex, _) = attested("alice");
        assert!(!verify_with_key(&authority, "alice", &key_hex, "not base64 at all"));
        assert!(!verify_with_key(&authority, "alice", &key_hex, ""));
        // Valid base64 of the wrong length.
        let short = codec::encode_base64(b"short");
        assert!(!verify_with_key(&authority, "alice", &key_hex, &short));
    }

    #[test]
    fn compiled_in_verify_rejects_garbage() {
        // We can't produce a valid signature for the published authority in
        // tests (its private key lives in the KMS), but the negative path
        // must still be total.
        assert!(!verify("alice", &"aa".repeat(32), "AAAA"));
        assert!(!verify("", "", ""));
    }

    #[test]
    fn pem_error_cases() {
        assert!(matches!(
            authority_key_from_pem("no pem here"),
            Err(AuthorityKeyError::MalformedPem)
        ));
        assert!(matches!(
            authority_key_from_pem(
                "-----BEGIN PUBLIC KEY-----\n!!!\n-----END PUBLIC KEY-----\n"
            ),
            Err(AuthorityKeyError::InvalidBase64)
        ));
        assert!(matches!(
            authority_key_from_pem(
                "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n"
            ),
            Err(AuthorityKeyError::DerTooShort)
        ));
    }
}
