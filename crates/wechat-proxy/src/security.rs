//! Timing-safe checks on caller-supplied credentials.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare two secrets without leaking where, or whether, their lengths differ.
///
/// Inputs are reduced to SHA-256 digests first so the final `ct_eq` always
/// runs over 32 bytes.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    Sha256::digest(a).ct_eq(&Sha256::digest(b)).into()
}

/// Match a vendor hex signature against the one we computed.
///
/// The vendor is not consistent about hex case, so `provided` is lowercased
/// before the comparison.
pub fn hex_signature_eq(expected: &str, provided: &str) -> bool {
    constant_time_eq(
        expected.as_bytes(),
        provided.trim().to_ascii_lowercase().as_bytes(),
    )
}

/// Check an `Authorization: Bearer <token>` header value.
pub fn bearer_matches(header: Option<&str>, expected: &str) -> bool {
    header
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()))
}
