pub mod error;
pub mod hashing;

pub use error::CryptoError;
pub use hashing::{digest_eq, digest_fields, digest_from_hex, hash, hash_hex, hex_digest, Digest};
