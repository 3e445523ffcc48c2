//! # Address Validation
//!
//! A Meshmail address is the human-chosen handle that the authority binds to
//! a device's public key: 1–16 characters of `[a-z0-9.]`, starting with a
//! letter, never starting with a reserved prefix.
//!
//! This module is the **only** validator in the system. The server consumes
//! it through its dependency on this crate, so the submitting side and the
//! authoritative side can never drift apart — a divergence between the two
//! is a correctness bug class, not a style nit (an address the client
//! accepts and the server rejects strands the user mid-onboarding; the
//! reverse silently reserves an unreachable handle).
//!
//! Checks run in a fixed order and the first failing check wins, so a given
//! input always produces the same reason code on every surface that shows
//! one.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{MAX_ADDRESS_LENGTH, RESERVED_PREFIXES};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an address candidate was rejected.
///
/// Variants are ordered the way the checks run. Every variant maps to a
/// stable wire string via [`reason_code`](Self::reason_code); those strings
/// are part of the availability API contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressInvalid {
    /// Empty after trimming surrounding whitespace.
    #[error("address is required")]
    Required,

    /// The input differs from its lowercased form.
    #[error("address must be lowercase")]
    MustBeLowercase,

    /// Too long, or contains characters outside `[a-z0-9.]`.
    #[error("address may be at most {MAX_ADDRESS_LENGTH} characters of a-z, 0-9 and '.'")]
    InvalidFormat,

    /// The first character is not a letter.
    #[error("address must start with a letter")]
    MustStartWithLetter,

    /// The address starts with a reserved system prefix.
    #[error("addresses starting with '{prefix}' are reserved")]
    ReservedPrefix {
        /// The first matching entry of the reserved list.
        prefix: &'static str,
    },
}

impl AddressInvalid {
    /// The stable wire string for this reason, as returned by the
    /// availability endpoint.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AddressInvalid::Required => "required",
            AddressInvalid::MustBeLowercase => "must_be_lowercase",
            AddressInvalid::InvalidFormat => "invalid_format",
            AddressInvalid::MustStartWithLetter => "must_start_with_letter",
            AddressInvalid::ReservedPrefix { .. } => "reserved_prefix",
        }
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A validated, canonical (lowercase) Meshmail address.
///
/// The only way to obtain one is [`validate`], so holding an `Address` is
/// proof the handle passed every rule. The inner string is the canonical
/// storage form — there is no separate display casing.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// The canonical lowercase handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper, yielding the canonical string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        validate(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an address candidate.
///
/// Pure and total: never panics, never touches the network, and the same
/// input always produces the same verdict. Checks run in fixed order —
/// `required`, `must_be_lowercase`, `invalid_format`,
/// `must_start_with_letter`, `reserved_prefix` — and the first failure is
/// the one reported.
///
/// Surrounding whitespace is trimmed before any rule runs; everything else
/// about the input is significant.
pub fn validate(raw: &str) -> Result<Address, AddressInvalid> {
    let candidate = raw.trim();

    if candidate.is_empty() {
        return Err(AddressInvalid::Required);
    }

    // Case is an error, not something we normalize away. Silently folding
    // "Alice" to "alice" would let two visually distinct inputs race for
    // the same record.
    if candidate != candidate.to_lowercase() {
        return Err(AddressInvalid::MustBeLowercase);
    }

    if candidate.len() > MAX_ADDRESS_LENGTH
        || !candidate
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.')
    {
        return Err(AddressInvalid::InvalidFormat);
    }

    if !candidate
        .as_bytes()
        .first()
        .is_some_and(|b| b.is_ascii_lowercase())
    {
        return Err(AddressInvalid::MustStartWithLetter);
    }

    for &prefix in RESERVED_PREFIXES {
        if candidate.starts_with(prefix) {
            return Err(AddressInvalid::ReservedPrefix { prefix });
        }
    }

    Ok(Address(candidate.to_string()))
}
