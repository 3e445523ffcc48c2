//! # Cryptographic Primitives for Meshmail
//!
//! Everything security-related in the identity subsystem flows through here.
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures — fast, deterministic, and nobody has broken it.
//! - **Lowercase hex** for key material, **base64** for signatures — one
//!   shared codec module, used by both the device and the server, so the
//!   two sides can never disagree about what a key string looks like.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, please
//! reconsider. Then reconsider again.

pub mod codec;
pub mod keys;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy.
pub use codec::CodecError;
pub use keys::{KeyError, MeshKeypair, MeshPublicKey, MeshSignature};
