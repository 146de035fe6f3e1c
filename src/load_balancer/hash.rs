//! Hash-based load balancing strategies (client IP and header value).
//!
//! Both hash a string with 32-bit FNV-1a and take it modulo the pool size,
//! so the same input always lands on the same server for a given pool.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of `key`.
pub fn fnv1a32(key: &str) -> u32 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Map `key` to an index in `[0, len)`. `len` must be non-zero.
pub fn index_for(key: &str, len: usize) -> usize {
    fnv1a32(key) as usize % len
}
