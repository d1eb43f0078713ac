//! Hashing and masking helpers for admin and translation API keys.

use sha2::{Digest, Sha256};

/// Suffix carried by keys issued for the free translation API tier.
pub const FREE_TIER_SUFFIX: &str = ":fx";

/// Number of leading characters left visible by [`mask_api_key`].
const VISIBLE_PREFIX_LEN: usize = 4;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares two strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Returns true if the key belongs to the free API tier.
pub fn is_free_tier_key(key: &str) -> bool {
    key.trim().ends_with(FREE_TIER_SUFFIX)
}

/// Masks key material for display, e.g. `1a2b…c3d4:fx`.
///
/// Keys too short to mask meaningfully are fully hidden.
pub fn mask_api_key(key: &str) -> String {
    let key = key.trim();
    let (body, suffix) = match key.strip_suffix(FREE_TIER_SUFFIX) {
        Some(body) => (body, FREE_TIER_SUFFIX),
        None => (key, ""),
    };

    let chars: Vec<char> = body.chars().collect();
    if chars.len() <= VISIBLE_PREFIX_LEN * 2 {
        return format!("{}{}", "*".repeat(chars.len().max(4)), suffix);
    }

    let head: String = chars[..VISIBLE_PREFIX_LEN].iter().collect();
    let tail: String = chars[chars.len() - VISIBLE_PREFIX_LEN..].iter().collect();
    format!("{}…{}{}", head, tail, suffix)
}
