// Copyright (c) 2026 Meshmail Contributors. MIT License.
// See LICENSE for details.

//! # Meshmail Protocol — Core Library
//!
//! The identity and attestation layer of Meshmail: every device owns an
//! Ed25519 keypair, claims a short human-readable address, and carries a
//! signature from the directory authority binding the two together. Peers
//! verify that binding offline; the directory is only consulted to claim
//! an address, never to check one.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the lifecycle of an
//! identity:
//!
//! - **crypto** — Ed25519 keypairs plus the hex/base64 codec helpers.
//! - **address** — Address validation with stable, ordered reason codes.
//! - **attestation** — The canonical attestation message and its verifier.
//! - **keystore** — Secure at-rest storage for keys, signature, handle.
//! - **directory** — The client-side seam to the directory service.
//! - **probe** — Debounced availability checking for address entry UIs.
//! - **enrollment** — The validate → claim → persist registration flow.
//! - **backup** — Portable export and paranoid restore of a full identity.
//! - **config** — Protocol constants: wire labels, limits, reserved names.
//!
//! ## Design Philosophy
//!
//! 1. Verification is total — a verifier returns `bool`, never panics.
//! 2. Key material never appears in logs, `Debug` output, or errors.
//! 3. The storage engine, not the application, arbitrates address races.
//! 4. A restore writes nothing until the whole bundle checks out.

pub mod address;
pub mod attestation;
pub mod backup;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod enrollment;
pub mod keystore;
pub mod probe;
