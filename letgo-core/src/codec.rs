//! One-time code generation and salted digests.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{CoreError, CoreResult};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_SALT_BYTES: usize = 16;

/// Six-digit numeric code drawn uniformly from 100000..=999999 using the OS CSPRNG.
pub fn generate_code() -> String {
    OsRng.gen_range(100_000..=999_999u32).to_string()
}

/// Hex-encoded random salt of `byte_len` bytes.
pub fn generate_salt(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// HMAC-SHA256 of `code` keyed by `salt`, hex-encoded.
pub fn digest(code: &str, salt: &str) -> CoreResult<String> {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
        .map_err(|e| CoreError::InternalError(format!("HMAC key rejected: {}", e)))?;
    mac.update(code.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Length mismatch returns early; otherwise the comparison time does not depend on
/// where the inputs differ.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
