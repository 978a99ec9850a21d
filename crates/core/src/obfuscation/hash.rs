//! FNV-1a string fingerprints
//!
//! Strings are hashed in their NUL-terminated form, so `"abc"` hashes the
//! bytes `a b c 0`. Each byte is sign-extended to the hash width before it is
//! mixed in, the way the host hashes signed `char` strings; bytes from 0x80
//! up therefore hash differently than in plain FNV-1a. The compile-time and
//! runtime forms must agree; build-time hashes are compared against runtime
//! hashes without ever storing the plaintext twice.

/// FNV-1a 32-bit hash (compile-time capable)
pub const fn fnv1a_32(data: &[u8]) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
    const FNV_PRIME: u32 = 0x01000193;

    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// FNV-1a 64-bit hash (compile-time capable)
pub const fn fnv1a_64(data: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001B3;

    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Hash width matching the target pointer width
#[cfg(target_pointer_width = "64")]
pub type FnvHash = u64;

/// Hash width matching the target pointer width
#[cfg(not(target_pointer_width = "64"))]
pub type FnvHash = u32;

#[cfg(target_pointer_width = "64")]
mod params {
    pub const OFFSET_BASIS: super::FnvHash = 0xcbf29ce484222325;
    pub const PRIME: super::FnvHash = 0x00000100000001B3;
}

#[cfg(not(target_pointer_width = "64"))]
mod params {
    pub const OFFSET_BASIS: super::FnvHash = 0x811c9dc5;
    pub const PRIME: super::FnvHash = 0x01000193;
}

#[inline(always)]
const fn step(hash: FnvHash, byte: u8) -> FnvHash {
    (hash ^ (byte as i8 as isize as FnvHash)).wrapping_mul(params::PRIME)
}

/// Hash a string at compile time
///
/// Use through [`fnv!`](crate::fnv) to force evaluation in a const context.
pub const fn hash_const(s: &str) -> FnvHash {
    let bytes = s.as_bytes();
    let mut hash = params::OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash = step(hash, bytes[i]);
        i += 1;
    }
    step(hash, 0)
}

/// Hash a string at runtime
#[inline]
pub fn hash_runtime(s: &str) -> FnvHash {
    hash_bytes_with_nul(s.as_bytes().iter().copied().chain(std::iter::once(0)))
}

/// Hash a C string read from host memory
#[inline]
pub fn hash_c_str(s: &std::ffi::CStr) -> FnvHash {
    hash_bytes_with_nul(s.to_bytes_with_nul().iter().copied())
}

fn hash_bytes_with_nul(bytes: impl Iterator<Item = u8>) -> FnvHash {
    bytes.fold(params::OFFSET_BASIS, step)
}

/// Hash a string literal at compile time
///
/// ```ignore
/// use overlayhook_core::{fnv, obfuscation::hash_runtime};
///
/// assert_eq!(fnv!("EndScene"), hash_runtime("EndScene"));
/// ```
#[macro_export]
macro_rules! fnv {
    ($s:literal) => {{
        const HASH: $crate::obfuscation::FnvHash = $crate::obfuscation::hash_const($s);
        HASH
    }};
}
