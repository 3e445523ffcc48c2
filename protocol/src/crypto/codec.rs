//! # Shared Byte Codecs
//!
//! The single home for hex and base64 encoding in the protocol. Both the
//! device-side and server-side paths go through these functions — duplicated
//! ad-hoc encode/decode helpers are how two "identical" validators drift
//! apart, one escaped edge case at a time.
//!
//! Hex is used for key material (at rest and at the wire boundary), base64
//! for signatures and backup transport strings. Both are the standard
//! alphabets: lowercase hex, padded standard base64.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// Errors from decoding externally supplied strings.
///
/// Deliberately does not echo the offending input back — callers may be
/// decoding key material, and key material does not belong in error strings.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid hex string")]
    InvalidHex,

    #[error("invalid base64 string")]
    InvalidBase64,

    #[error("decoded length {got} does not match expected {expected}")]
    WrongLength {
        /// Expected number of decoded bytes.
        expected: usize,
        /// Actual number of decoded bytes.
        got: usize,
    },
}

/// Encode bytes as lowercase hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string into bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(s).map_err(|_| CodecError::InvalidHex)
}

/// Decode a hex string into a fixed-size array, checking the length.
pub fn decode_hex_exact<const N: usize>(s: &str) -> Result<[u8; N], CodecError> {
    let bytes = decode_hex(s)?;
    let arr: [u8; N] = bytes.as_slice().try_into().map_err(|_| CodecError::WrongLength {
        expected: N,
        got: bytes.len(),
    })?;
    Ok(arr)
}

/// Encode bytes as padded standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode a padded standard base64 string into bytes.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, CodecError> {
    BASE64.decode(s).map_err(|_| CodecError::InvalidBase64)
}

/// True iff `s` is exactly `len` lowercase hex characters.
///
/// This is the wire-boundary check for public keys (`len == 64`). Uppercase
/// hex is rejected on purpose: the canonical message embeds the key string
/// verbatim, so two casings of the same key would produce two different
/// signatures over the "same" identity.
pub fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = [0u8, 1, 2, 0xFE, 0xFF];
        let encoded = encode_hex(&bytes);
        assert_eq!(encoded, "000102feff");
        assert_eq!(decode_hex(&encoded).unwrap(), bytes);
    }

    #[test]
    fn hex_exact_rejects_wrong_length() {
        let err = decode_hex_exact::<32>("aabb").unwrap_err();
        assert!(matches!(err, CodecError::WrongLength { expected: 32, got: 2 }));
    }

    #[test]
    fn base64_roundtrip() {
        let bytes = b"meshmail transport payload";
        let encoded = encode_base64(bytes);
        assert_eq!(decode_base64(&encoded).unwrap(), bytes);
    }

    #[test]
    fn base64_rejects_garbage() {
        assert!(decode_base64("!!! not base64 !!!").is_err());
    }

    #[test]
    fn lower_hex_predicate() {
        assert!(is_lower_hex(&"ab".repeat(32), 64));
        assert!(!is_lower_hex(&"AB".repeat(32), 64)); // uppercase
        assert!(!is_lower_hex("abcd", 64)); // too short
        assert!(!is_lower_hex(&"gg".repeat(32), 64)); // not hex
    }
}
