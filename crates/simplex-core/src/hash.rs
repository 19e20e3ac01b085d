//! The trinity hash: two standard layers and one φ layer.
//!
//! ```text
//! h1    = BLAKE3(data)
//! h2    = XOF(h1, 32)
//! h3    = phi_hash(h1 || h2)          (hex text)
//! final = BLAKE3(h1 || h2 || h3)
//! ```
//!
//! Both standard layers are BLAKE3: plain hashing for `H` and derive-key mode
//! with a fixed context for the XOF. SHA3-256 and SHAKE256 are not used, so
//! digests from this crate never equal SHA-3 based trinity digests of the
//! same input.
//!
//! Collision resistance comes from BLAKE3 alone. The φ layer is additive
//! floating-point arithmetic with no cryptographic properties.

use crate::types::Digest;

/// The golden ratio, (1 + √5) / 2.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Exponents of φ cycle with this period.
const PHI_PERIOD: usize = 20;

/// The running φ sum is reduced modulo this value after every byte.
const PHI_MODULUS: f64 = 1e16;

/// Derive-key context for the extendable-output layer.
const TRINITY_XOF_CONTEXT: &str = "simplex 2024 trinity xof";

/// Additive φ hash, rendered as lowercase hex.
///
/// `h += byte * φ^(i mod 20)`, reduced modulo 10^16 at each step. Cheap and
/// deterministic, and trivially invertible for short inputs.
pub fn phi_hash(data: &[u8]) -> String {
    let mut h = 0.0_f64;
    for (i, &byte) in data.iter().enumerate() {
        h += f64::from(byte) * PHI.powi((i % PHI_PERIOD) as i32);
        h %= PHI_MODULUS;
    }
    format!("{:x}", h as u64)
}

/// Extendable-output hash of `data`, `len` bytes long.
pub fn xof_digest(data: &[u8], len: usize) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new_derive_key(TRINITY_XOF_CONTEXT);
    hasher.update(data);
    let mut out = vec![0u8; len];
    hasher.finalize_xof().fill(&mut out);
    out
}

/// Compute the trinity digest of arbitrary bytes. Never fails, including on
/// empty input.
pub fn trinity_digest(data: &[u8]) -> Digest {
    let h1 = Digest::hash(data);
    let h2 = xof_digest(h1.as_bytes(), Digest::LEN);

    let mut combined = Vec::with_capacity(Digest::LEN * 2);
    combined.extend_from_slice(h1.as_bytes());
    combined.extend_from_slice(&h2);

    let h3 = phi_hash(&combined);
    Digest::hash_concat(&[combined.as_slice(), h3.as_bytes()])
}

/// Trinity digest rendered as lowercase hex.
pub fn trinity_hex(data: &[u8]) -> String {
    trinity_digest(data).to_hex()
}
