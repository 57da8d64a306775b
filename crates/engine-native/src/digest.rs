//! Keyed digest export.

use hex_literal::hex;

/// Number of digest bytes written per item.
pub const DIGEST_LEN: usize = 16;

/// Fixed BLAKE3 key for the demo digest.
///
/// Note that this key is intentionally arbitrary, fixed, and public: the
/// demo only needs both parties to hash under the *same* key so that equal
/// items collide deterministically.
pub const DIGEST_KEY: [u8; 32] =
    hex!("426c616b65332d5053492d44656d6f2d4b65792d31323334aabbccdd55667788");

/// Hashes `data` with the fixed keyed BLAKE3 instance, truncated to
/// [`DIGEST_LEN`] bytes.
///
/// Accepts empty input; the digest of the empty string is still keyed and
/// deterministic.
pub fn keyed_digest(data: &[u8]) -> [u8; DIGEST_LEN] {
    let hash = blake3::keyed_hash(&DIGEST_KEY, data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hash.as_bytes()[..DIGEST_LEN]);
    out
}
