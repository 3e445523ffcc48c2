//! # Protocol Configuration & Constants
//!
//! Every magic number and wire literal in Meshmail lives here. If you're
//! hardcoding a constant somewhere else, you're doing it wrong and you owe
//! the team coffee.
//!
//! Several of these values are wire contracts: the attestation tag and field
//! labels are baked into every signature the authority has ever produced.
//! Changing them invalidates all historical attestations, so don't.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Attestation Wire Format
// ---------------------------------------------------------------------------

/// The protocol tag that opens every canonical attestation message.
///
/// Versioned so that a future format change can coexist with the v1
/// signatures already in the wild. Append-only: v1 never changes.
pub const ATTESTATION_TAG: &str = "meshmail.attestation.v1";

/// Field label for the address line of the canonical message.
pub const ADDRESS_LABEL: &str = "address";

/// Field label for the public key line of the canonical message.
pub const PUBKEY_LABEL: &str = "pubkey_ed25519_hex";

// ---------------------------------------------------------------------------
// Address Rules
// ---------------------------------------------------------------------------

/// Maximum length of an address, in characters.
pub const MAX_ADDRESS_LENGTH: usize = 16;

/// Prefixes no address may start with. Blocks impersonation of system and
/// administrative identities ("help.desk", "admin1", ...). Checked in order;
/// the first match is the one reported.
pub const RESERVED_PREFIXES: &[&str] = &[
    "911",
    "help",
    "info",
    "admin",
    "support",
    "noreply",
    "postmaster",
    "abuse",
    "security",
    "root",
    "system",
    "mail",
    "test",
];

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 secret key length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

/// Length of a hex-encoded public key at the wire boundary (32 bytes * 2).
pub const PUBLIC_KEY_HEX_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// The authority's published Ed25519 public key, PEM-encoded
/// SubjectPublicKeyInfo. Distributed with every client so attestations can
/// be audited offline. The raw 32-byte key is the final 32 bytes of the
/// DER payload.
pub const AUTHORITY_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MCowBQYDK2VwAyEA11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=
-----END PUBLIC KEY-----
";

/// Default KMS key version identifier for the authority signing key.
pub const AUTHORITY_KEY_VERSION: &str = "meshmail-authority-v1";

/// How long a signing call may take before it is treated as a hard failure.
/// Safe to retry: no record is ever inserted without a signature in hand.
pub const SIGNING_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Keystore
// ---------------------------------------------------------------------------

/// Secure-store key for the device's Ed25519 private key (hex at rest).
pub const STORE_KEY_PRIVATE: &str = "meshmail.private_key";

/// Secure-store key for the device's Ed25519 public key (hex at rest).
pub const STORE_KEY_PUBLIC: &str = "meshmail.public_key";

/// Secure-store key for the authority attestation signature (base64).
pub const STORE_KEY_SIGNATURE: &str = "meshmail.attestation_signature";

/// Secure-store key for the device's registered address.
pub const STORE_KEY_HANDLE: &str = "meshmail.handle";

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

/// Current backup bundle schema version. Checked on restore.
pub const BACKUP_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Client Behavior
// ---------------------------------------------------------------------------

/// Debounce window for interactive availability probing. Each keystroke
/// resets the clock; only the probe that survives the window hits the
/// network.
pub const AVAILABILITY_DEBOUNCE: Duration = Duration::from_millis(350);

/// Protocol library version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_prefixes_are_lowercase() {
        for prefix in RESERVED_PREFIXES {
            assert_eq!(*prefix, prefix.to_lowercase(), "prefix {prefix} not lowercase");
        }
    }

    #[test]
    fn authority_pem_has_expected_framing() {
        assert!(AUTHORITY_PUBLIC_KEY_PEM.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(AUTHORITY_PUBLIC_KEY_PEM.contains("-----END PUBLIC KEY-----"));
    }

    #[test]
    fn attestation_tag_is_versioned() {
        assert!(ATTESTATION_TAG.ends_with(".v1"));
    }
}
