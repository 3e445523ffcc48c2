//! # Address Registry — Persistent Storage Engine
//!
//! The directory's record of which address belongs to which public key,
//! built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree    | Key                | Value                 |
//! |---------|--------------------|-----------------------|
//! | `users` | `address` (UTF-8)  | `bincode(UserRecord)` |
//!
//! ## Uniqueness
//!
//! The registry is the arbiter of address ownership. [`try_claim`] uses
//! sled's `compare_and_swap` with an expected value of `None`, so the
//! insert succeeds only if no record exists for that key at commit time.
//! Two concurrent claims for the same address resolve inside the storage
//! engine: exactly one wins, regardless of what any earlier availability
//! check reported.
//!
//! [`try_claim`]: AddressRegistry::try_claim

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// UserRecord
// ---------------------------------------------------------------------------

/// One registered identity: an address bound to a device public key,
/// with the attestation the authority issued for the pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Stable record identifier.
    pub id: Uuid,
    /// The claimed address, canonical lowercase.
    pub address: String,
    /// Hex-encoded Ed25519 device public key.
    pub public_key_hex: String,
    /// Base64-encoded authority attestation signature.
    pub signature_b64: String,
    /// When the claim was committed.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(address: &str, public_key_hex: &str, signature_b64: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.to_string(),
            public_key_hex: public_key_hex.to_string(),
            signature_b64: signature_b64.to_string(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// AddressRegistry
// ---------------------------------------------------------------------------

/// Persistent registry of claimed addresses.
///
/// Wraps a sled `Db` and exposes typed accessors. All serialization uses
/// bincode for compactness and speed.
///
/// # Thread Safety
///
/// sled is inherently thread-safe — trees support lock-free concurrent
/// reads and serialized writes. `AddressRegistry` can be shared across
/// tasks via `Arc<AddressRegistry>` without external synchronization.
#[derive(Debug, Clone)]
pub struct AddressRegistry {
    /// The underlying sled database handle.
    db: Db,
    /// User records indexed by address (UTF-8).
    users: Tree,
}

impl AddressRegistry {
    /// Open or create a registry at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> RegistryResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary registry that lives in memory and is cleaned up
    /// when dropped.
    ///
    /// Ideal for unit tests — no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> RegistryResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> RegistryResult<Self> {
        let users = db.open_tree("users")?;
        Ok(Self { db, users })
    }

    /// Retrieve the record for an address, if one exists.
    pub fn lookup(&self, address: &str) -> RegistryResult<Option<UserRecord>> {
        match self.users.get(address.as_bytes())? {
            Some(bytes) => {
                let record: UserRecord = bincode::deserialize(&bytes)
                    .map_err(|e| RegistryError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Atomically claim an address for `record`.
    ///
    /// Returns `true` if the record was inserted, `false` if another
    /// record already held the address. The compare-and-swap runs inside
    /// the storage engine, so this is the TOCTOU-safe path — callers
    /// must treat any prior availability check as advisory.
    pub fn try_claim(&self, record: &UserRecord) -> RegistryResult<bool> {
        let bytes = bincode::serialize(record)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;

        let outcome = self.users.compare_and_swap(
            record.address.as_bytes(),
            None as Option<&[u8]>,
            Some(bytes),
        )?;

        match outcome {
            Ok(()) => {
                self.db.flush()?;
                Ok(true)
            }
            Err(_conflict) => Ok(false),
        }
    }

    /// Remove the record for an address. Returns `true` if one existed.
    pub fn remove(&self, address: &str) -> RegistryResult<bool> {
        let existed = self.users.remove(address.as_bytes())?.is_some();
        if existed {
            self.db.flush()?;
        }
        Ok(existed)
    }

    /// Number of registered addresses.
    pub fn count(&self) -> usize {
        self.users.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> RegistryResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
