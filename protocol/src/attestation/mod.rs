//! # Attestation Codec & Verifier
//!
//! An attestation is the authority's signed statement that an address
//! belongs to a public key. This module owns both halves of that contract:
//!
//! 1. **Message** — the canonical byte sequence that gets signed. This is
//!    the most fragile code in the repository: signer and verifier must
//!    produce identical bytes or every signature in existence is garbage.
//! 2. **Verifier** — total, boolean, offline verification against the
//!    authority's published PEM key.
//!
//! The signing half lives in the server crate, next to the KMS that holds
//! the authority's private key. It builds its messages through this module
//! too — the server never signs caller-supplied bytes.

pub mod message;
pub mod verifier;

pub use message::build_message;
pub use verifier::{authority_key_from_pem, verify, verify_with_key, AuthorityKeyError};
