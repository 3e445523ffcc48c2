//! # Backup Codec
//!
//! Packages the full credential set — handle, keypair, authority signature —
//! into a portable transport string, and restores it on a new device. The
//! transport form is `base64(JSON(bundle))`: printable ASCII, fit for a QR
//! code or a clipboard.
//!
//! A backup codec bug is the one failure mode that permanently strands an
//! identity, so restore is deliberately paranoid: the bundle is fully
//! parsed, the keypair reconstructed, and the embedded public key
//! cross-checked against the derived one **before a single byte is
//! written**. Writes then happen in dependency order with the handle last;
//! a crash mid-restore leaves no handle and therefore no observable
//! identity, and a retried restore converges on the same state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::validate;
use crate::config::BACKUP_VERSION;
use crate::crypto::codec;
use crate::crypto::keys::MeshKeypair;
use crate::keystore::{CredentialManager, KeystoreError, SecureStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from backup encode/decode. All of these are recoverable — the
/// user can retry with a different code or after completing registration.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Export requires a keypair, a handle, and a signature; at least one
    /// is missing from the store.
    #[error("cannot export: credential set is incomplete")]
    IncompleteCredentials,

    /// The bundle declares a schema version this build does not understand.
    #[error("unsupported backup version {version} (expected {BACKUP_VERSION})")]
    UnsupportedVersion {
        /// The version the bundle declared.
        version: u32,
    },

    /// The transport string could not be decoded into a usable bundle:
    /// bad base64, bad JSON, missing credential fields, or key material
    /// that does not hang together.
    #[error("backup data is malformed")]
    MalformedBackup,

    /// The secure store failed while reading or writing credentials.
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// The versioned backup payload, serialized as camelCase JSON.
///
/// `timestamp` (unix milliseconds, export time) is informational only; it
/// does not participate in restore decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBundle {
    /// Schema version. Checked on restore.
    pub version: u32,
    /// The registered address in canonical lowercase form.
    pub handle: String,
    /// Hex-encoded Ed25519 private key.
    pub private_key: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    /// Base64-encoded authority attestation signature.
    pub signature: String,
    /// Export time, unix milliseconds.
    pub timestamp: i64,
}

/// Permissive mirror of [`BackupBundle`] used during decode, so a missing
/// field maps to [`BackupError::MalformedBackup`] instead of an opaque
/// serde message.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBundle {
    version: Option<u32>,
    handle: Option<String>,
    private_key: Option<String>,
    public_key: Option<String>,
    signature: Option<String>,
    #[allow(dead_code)]
    timestamp: Option<i64>,
}

// ---------------------------------------------------------------------------
// Encode / Decode
// ---------------------------------------------------------------------------

/// Export the device's full credential set as a transport string.
///
/// Fails with [`BackupError::IncompleteCredentials`] unless the keypair,
/// handle, and authority signature are all present — a partial backup
/// would restore into a broken identity, which is worse than no backup.
pub fn encode<S: SecureStore>(manager: &CredentialManager<S>) -> Result<String, BackupError> {
    let keypair = manager
        .load_keypair()?
        .ok_or(BackupError::IncompleteCredentials)?;
    let handle = manager
        .load_handle()?
        .ok_or(BackupError::IncompleteCredentials)?;
    let signature = manager
        .load_signature()?
        .ok_or(BackupError::IncompleteCredentials)?;

    let bundle = BackupBundle {
        version: BACKUP_VERSION,
        handle,
        private_key: keypair.secret_key_hex(),
        public_key: keypair.public_key_hex(),
        signature,
        timestamp: chrono::Utc::now().timestamp_millis(),
    };

    let json = serde_json::to_vec(&bundle).map_err(|_| BackupError::MalformedBackup)?;
    Ok(codec::encode_base64(&json))
}

/// Restore a credential set from a transport string.
///
/// Everything is validated before anything is written: version, field
/// presence, private key decoding, and the public key cross-check. Only
/// then are the keypair, signature, and finally the handle persisted — the
/// handle is the commit point, so an interrupted restore never leaves a
/// half-identity that looks whole.
pub fn decode<S: SecureStore>(
    manager: &CredentialManager<S>,
    transport: &str,
) -> Result<(), BackupError> {
    let json = codec::decode_base64(transport.trim()).map_err(|_| BackupError::MalformedBackup)?;
    let raw: RawBundle =
        serde_json::from_slice(&json).map_err(|_| BackupError::MalformedBackup)?;

    let version = raw.version.ok_or(BackupError::MalformedBackup)?;
    if version != BACKUP_VERSION {
        return Err(BackupError::UnsupportedVersion { version });
    }

    let handle = raw.handle.ok_or(BackupError::MalformedBackup)?;
    let private_key = raw.private_key.ok_or(BackupError::MalformedBackup)?;
    let public_key = raw.public_key.ok_or(BackupError::MalformedBackup)?;
    let signature = raw.signature.ok_or(BackupError::MalformedBackup)?;

    // Reconstruct and cross-check before any write. A bundle whose public
    // key does not derive from its private key was corrupted or forged.
    let keypair = MeshKeypair::from_hex(&private_key).map_err(|_| BackupError::MalformedBackup)?;
    if keypair.public_key_hex() != public_key {
        return Err(BackupError::MalformedBackup);
    }
    let address = validate(&handle).map_err(|_| BackupError::MalformedBackup)?;

    manager.save_keypair(&keypair)?;
    manager.save_signature(&signature)?;
    manager.save_handle(&address)?;

    tracing::info!(handle = %address, "credentials restored from backup");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::validate;
    use crate::keystore::MemoryStore;

    fn populated_manager() -> CredentialManager<MemoryStore> {
        let m = CredentialManager::new(MemoryStore::new());
        let kp = m.ensure_keypair().unwrap();
        let sig = kp.sign(b"stand-in for the authority signature");
        m.save_signature(&sig.to_base64()).unwrap();
        m.save_handle(&validate("alice").unwrap()).unwrap();
        m
    }

    #[test]
    fn encode_decode_roundtrip() {
        let source = populated_manager();
        let transport = encode(&source).unwrap();

        // Transport string is printable ASCII (base64).
        assert!(transport.bytes().all(|b| b.is_ascii_graphic()));

        let target = CredentialManager::new(MemoryStore::new());
        decode(&target, &transport).unwrap();

        assert_eq!(
            source.load_keypair().unwrap().unwrap().public_key(),
            target.load_keypair().unwrap().unwrap().public_key()
        );
        assert_eq!(
            source.load_signature().unwrap(),
            target.load_signature().unwrap()
        );
        assert_eq!(target.load_handle().unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn encode_without_handle_fails() {
        let m = CredentialManager::new(MemoryStore::new());
        let kp = m.ensure_keypair().unwrap();
        m.save_signature(&kp.sign(b"sig").to_base64()).unwrap();
        assert!(matches!(encode(&m), Err(BackupError::IncompleteCredentials)));
    }

    #[test]
    fn encode_without_signature_fails() {
        let m = CredentialManager::new(MemoryStore::new());
        m.ensure_keypair().unwrap();
        m.save_handle(&validate("alice").unwrap()).unwrap();
        assert!(matches!(encode(&m), Err(BackupError::IncompleteCredentials)));
    }

    #[test]
    fn encode_without_keypair_fails() {
        let m = CredentialManager::new(MemoryStore::new());
        m.save_handle(&validate("alice").unwrap()).unwrap();
        m.save_signature("c2ln").unwrap();
        assert!(matches!(encode(&m), Err(BackupError::IncompleteCredentials)));
    }

    #[test]
    fn version_two_rejected_regardless_of_contents() {
        let source = populated_manager();
        let transport = encode(&source).unwrap();

        // Re-encode the same bundle with version bumped to 2.
        let json = codec::decode_base64(&transport).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        value["version"] = serde_json::json!(2);
        let tampered = codec::encode_base64(&serde_json::to_vec(&value).unwrap());

        let target = CredentialManager::new(MemoryStore::new());
        assert!(matches!(
            decode(&target, &tampered),
            Err(BackupError::UnsupportedVersion { version: 2 })
        ));
        // Nothing was written.
        assert!(!target.has_keypair().unwrap());
        assert!(target.load_handle().unwrap().is_none());
    }

    #[test]
    fn missing_credential_field_rejected() {
        let source = populated_manager();
        let transport = encode(&source).unwrap();
        let json = codec::decode_base64(&transport).unwrap();

        for field in ["handle", "privateKey", "publicKey", "signature"] {
            let mut value: serde_json::Value = serde_json::from_slice(&json).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let stripped = codec::encode_base64(&serde_json::to_vec(&value).unwrap());

            let target = CredentialManager::new(MemoryStore::new());
            assert!(
                matches!(decode(&target, &stripped), Err(BackupError::MalformedBackup)),
                "missing {field} should be malformed"
            );
            assert!(!target.has_keypair().unwrap(), "no writes after missing {field}");
        }
    }

    #[test]
    fn garbage_transport_rejected() {
        let target = CredentialManager::new(MemoryStore::new());
        assert!(matches!(
            decode(&target, "definitely not base64 !!!"),
            Err(BackupError::MalformedBackup)
        ));
        // Valid base64 of invalid JSON.
        let not_json = codec::encode_base64(b"hello");
        assert!(matches!(
            decode(&target, &not_json),
            Err(BackupError::MalformedBackup)
        ));
    }

    #[test]
    fn mismatched_public_key_rejected_before_writing() {
        let source = populated_manager();
        let transport = encode(&source).unwrap();
        let json = codec::decode_base64(&transport).unwrap();

        let mut value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        value["publicKey"] = serde_json::json!("ff".repeat(32));
        let tampered = codec::encode_base64(&serde_json::to_vec(&value).unwrap());

        let target = CredentialManager::new(MemoryStore::new());
        assert!(matches!(
            decode(&target, &tampered),
            Err(BackupError::MalformedBackup)
        ));
        assert!(!target.has_keypair().unwrap());
    }

    #[test]
    fn restore_is_idempotent() {
        let source = populated_manager();
        let transport = encode(&source).unwrap();

        let target = CredentialManager::new(MemoryStore::new());
        decode(&target, &transport).unwrap();
        decode(&target, &transport).unwrap(); // retry converges

        assert_eq!(target.load_handle().unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn surrounding_whitespace_tolerated() {
        // Clipboards love to append newlines.
        let source = populated_manager();
        let transport = format!("  {}\n", encode(&source).unwrap());
        let target = CredentialManager::new(MemoryStore::new());
        decode(&target, &transport).unwrap();
    }

    #[test]
    fn bundle_json_uses_camel_case_keys() {
        let source = populated_manager();
        let transport = encode(&source).unwrap();
        let json = codec::decode_base64(&transport).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["version", "handle", "privateKey", "publicKey", "signature", "timestamp"] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
    }
}
