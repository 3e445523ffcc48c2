//! # Canonical Attestation Message
//!
//! Builds the exact byte sequence the authority signs when it attests that
//! an address belongs to a public key:
//!
//! ```text
//! meshmail.attestation.v1
//! address: <lowercased address>
//! pubkey_ed25519_hex: <publicKeyHex>
//! ```
//!
//! Three lines joined by single `\n` separators, no trailing newline. Both
//! the signer and every verifier must reproduce these bytes *identically* —
//! a reordered line, a stray space, or a case change produces signatures
//! that verify against nothing. Treat this format as an append-only wire
//! contract: v1 is frozen forever.

use crate::config::{ADDRESS_LABEL, ATTESTATION_TAG, PUBKEY_LABEL};

/// Build the canonical attestation message for `(address, public_key_hex)`.
///
/// The address is lowercased before being embedded, so the message for
/// "Alice" and "alice" is byte-identical. The public key hex is embedded
/// verbatim; callers are expected to have validated it as 64 lowercase hex
/// characters (the signer and verifier both do).
///
/// Deterministic and stable across calls — no timestamps, no nonces.
pub fn build_message(address: &str, public_key_hex: &str) -> Vec<u8> {
    format!(
        "{tag}\n{addr_label}: {address}\n{key_label}: {key}",
        tag = ATTESTATION_TAG,
        addr_label = ADDRESS_LABEL,
        address = address.to_lowercase(),
        key_label = PUBKEY_LABEL,
        key = public_key_hex,
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_wire_bytes() {
        let key = "aa".repeat(32);
        let msg = build_message("alice", &key);
        let expected = format!(
            "meshmail.attestation.v1\naddress: alice\npubkey_ed25519_hex: {key}"
        );
        assert_eq!(msg, expected.into_bytes());
    }

    #[test]
    fn no_trailing_newline() {
        let msg = build_message("alice", &"aa".repeat(32));
        assert_ne!(*msg.last().unwrap(), b'\n');
    }

    #[test]
    fn address_is_case_folded() {
        let key = "bb".repeat(32);
        assert_eq!(build_message("Alice", &key), build_message("alice", &key));
        assert_eq!(build_message("ALICE", &key), build_message("alice", &key));
    }

    #[test]
    fn stable_across_calls() {
        let key = "cc".repeat(32);
        assert_eq!(build_message("bob", &key), build_message("bob", &key));
    }

    #[test]
    fn distinct_inputs_distinct_messages() {
        let key = "dd".repeat(32);
        assert_ne!(build_message("alice", &key), build_message("bob", &key));
        assert_ne!(
            build_message("alice", &key),
            build_message("alice", &"ee".repeat(32))
        );
    }
}
