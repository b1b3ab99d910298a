use sha2::{Digest as _, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

/// SHA-256 digest (32 bytes).
pub type Digest = [u8; 32];

const DIGEST_LEN: usize = 32;

/// Hash arbitrary data using SHA-256.
pub fn hash(data: &[u8]) -> Digest {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// SHA-256 of `data`, lower-case hex encoded.
pub fn hash_hex(data: &[u8]) -> String {
    hex::encode(hash(data))
}

/// Lower-case hex encoding of a digest.
pub fn hex_digest(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Digest of colon-joined fields: `H(f0 ":" f1 ":" ... fn)`.
///
/// Fields must not contain `:` themselves.
pub fn digest_fields(fields: &[&str]) -> Digest {
    hash(fields.join(":").as_bytes())
}

/// Decode a hex digest, rejecting anything that is not exactly 32 bytes.
pub fn digest_from_hex(encoded: &str) -> Result<Digest, CryptoError> {
    let bytes = hex::decode(encoded)?;
    if bytes.len() != DIGEST_LEN {
        return Err(CryptoError::InvalidDigestLength {
            expected: DIGEST_LEN,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Constant-time digest comparison.
pub fn digest_eq(a: &Digest, b: &Digest) -> bool {
    a[..].ct_eq(&b[..]).into()
}
