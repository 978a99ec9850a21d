//! XOR-obfuscated string literals
//!
//! A literal is stored encrypted in the binary and only decrypted in place at
//! the point of use. Byte `i` is XORed with `key1 + (i mod (1 + key2))`, so the
//! same transform both encrypts and decrypts.

use std::ffi::CStr;
use std::fmt;

/// Key pair for the rolling XOR transform
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ObfuscationKeys {
    key1: u8,
    key2: u8,
}

impl ObfuscationKeys {
    pub const fn new(key1: u8, key2: u8) -> Self {
        Self { key1, key2 }
    }

    /// Derive keys from a `HH:MM:SS` build time
    ///
    /// Uses the minute and second units characters. Falls back to `'0'` for
    /// malformed input.
    pub const fn from_build_time(time: &str) -> Self {
        let bytes = time.as_bytes();
        let key1 = if bytes.len() > 4 { bytes[4] } else { b'0' };
        let key2 = if bytes.len() > 7 { bytes[7] } else { b'0' };
        Self { key1, key2 }
    }

    pub const fn key1(&self) -> u8 {
        self.key1
    }

    pub const fn key2(&self) -> u8 {
        self.key2
    }

    /// Whether every key byte is non-zero
    ///
    /// With a zero key byte the terminator would stay zero after encryption
    /// and [`ObfuscatedLiteral::is_encrypted`] could not tell the states apart.
    pub const fn is_valid(&self) -> bool {
        self.key1 != 0 && (self.key1 as u16 + self.key2 as u16) <= u8::MAX as u16
    }

    /// Key byte applied at position `index`
    #[inline(always)]
    pub const fn key_byte(&self, index: usize) -> u8 {
        self.key1
            .wrapping_add((index % (1 + self.key2 as usize)) as u8)
    }
}

impl fmt::Debug for ObfuscationKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        f.write_str("ObfuscationKeys(..)")
    }
}

/// Apply the rolling XOR transform
pub const fn crypt<const N: usize>(data: [u8; N], keys: ObfuscationKeys) -> [u8; N] {
    let mut out = data;
    let mut i = 0;
    while i < N {
        out[i] = data[i] ^ keys.key_byte(i);
        i += 1;
    }
    out
}

/// A NUL-terminated string literal of `N` bytes (terminator included)
///
/// Build one with [`obfuscate!`](crate::obfuscate), which encrypts the literal
/// at compile time so the plaintext never appears in the binary.
pub struct ObfuscatedLiteral<const N: usize> {
    storage: [u8; N],
    keys: ObfuscationKeys,
}

impl<const N: usize> ObfuscatedLiteral<N> {
    /// Encrypt a NUL-terminated plaintext buffer
    pub const fn encrypt(plaintext: [u8; N], keys: ObfuscationKeys) -> Self {
        Self {
            storage: crypt(plaintext, keys),
            keys,
        }
    }

    /// Wrap a buffer that was already encrypted with `keys`
    pub const fn from_encrypted(ciphertext: [u8; N], keys: ObfuscationKeys) -> Self {
        Self {
            storage: ciphertext,
            keys,
        }
    }

    /// Whether the buffer currently holds ciphertext
    ///
    /// Derived from the terminator byte, which is non-zero only when encrypted.
    #[inline]
    pub fn is_encrypted(&self) -> bool {
        N > 0 && self.storage[N - 1] != 0
    }

    /// Decrypt in place; no-op when already decrypted
    pub fn decrypt(&mut self) -> &[u8; N] {
        if self.is_encrypted() {
            self.storage = crypt(self.storage, self.keys);
        }
        &self.storage
    }

    /// Encrypt in place; no-op when already encrypted
    pub fn encrypt_in_place(&mut self) -> &[u8; N] {
        if !self.is_encrypted() {
            self.storage = crypt(self.storage, self.keys);
        }
        &self.storage
    }

    /// Raw buffer in its current state
    #[inline]
    pub fn get(&self) -> &[u8; N] {
        &self.storage
    }

    /// Decrypt and view as `&str` (terminator excluded)
    pub fn as_str(&mut self) -> &str {
        let bytes = self.decrypt();
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(N);
        std::str::from_utf8(&bytes[..len]).unwrap_or_default()
    }

    /// Decrypt and view as a C string for passing to the host
    pub fn as_c_str(&mut self) -> &CStr {
        CStr::from_bytes_until_nul(self.decrypt()).unwrap_or_default()
    }

    /// Zero the whole buffer
    ///
    /// A cleared literal reads as an empty, decrypted string.
    pub fn clear(&mut self) {
        for byte in self.storage.iter_mut() {
            // SAFETY: `byte` is a valid exclusive reference into our buffer
            unsafe { std::ptr::write_volatile(byte, 0) };
        }
    }

    /// Buffer size including the terminator
    #[inline]
    pub const fn size(&self) -> usize {
        N
    }

    /// First key byte
    #[inline]
    pub const fn key(&self) -> u8 {
        self.keys.key1()
    }
}

impl<const N: usize> fmt::Debug for ObfuscatedLiteral<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObfuscatedLiteral")
            .field("size", &N)
            .field("encrypted", &self.is_encrypted())
            .finish_non_exhaustive()
    }
}
