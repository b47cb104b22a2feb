//! Stable object digest
//!
//! MurmurHash3 x86 32-bit. Routing must be identical across runs and
//! toolchains, which rules out `DefaultHasher`.

/// MurmurHash3 x86_32 of `data` with the given seed
#[inline]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    // Reading from a byte slice never fails
    murmur3::murmur3_32(&mut &data[..], seed).unwrap_or_default()
}

/// Digest of an object identifier, seed 0
#[inline]
pub fn object_digest(object_id: &str) -> u32 {
    murmur3_32(object_id.as_bytes(), 0)
}
