//! Stable two-way bucket split
//!
//! Multiplicative string hash: start at 5381, then for each UTF-16 code
//! unit multiply by 33 and XOR the unit in, wrapping at 32 bits. The bucket
//! is the hash modulo 2. Not suitable for anything security related.

const SEED: u32 = 5381;
const MULTIPLIER: u32 = 33;

/// Full 32-bit hash of `id`
pub fn bucket_hash(id: &str) -> u32 {
    id.encode_utf16()
        .fold(SEED, |hash, unit| hash.wrapping_mul(MULTIPLIER) ^ u32::from(unit))
}

/// Bucket for `id`: always 0 or 1
pub fn variant_hash(id: &str) -> u32 {
    bucket_hash(id) % 2
}
