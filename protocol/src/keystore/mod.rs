//! # Keystore
//!
//! Credential persistence for the device: a [`SecureStore`] trait modeling
//! the platform's secure key-value storage, and a [`CredentialManager`]
//! that owns the keypair / signature / handle lifecycle on top of it.
//!
//! The store is injected, never global — tests use [`MemoryStore`], tooling
//! uses [`FileStore`], a real device wires in its keychain.

pub mod manager;
pub mod store;

pub use manager::{CredentialManager, KeystoreError};
pub use store::{FileStore, MemoryStore, SecureStore, StoreError};
