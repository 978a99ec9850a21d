//! Compile-time string obfuscation and FNV-1a fingerprints
//!
//! String constants that would otherwise be trivially found by scanning the
//! agent image (module names, export names, window classes) are stored
//! encrypted and decrypted at the point of use.
//!
//! # Example
//!
//! ```ignore
//! use overlayhook_core::obfuscate;
//!
//! let mut module = obfuscate!("d3d9.dll");
//! assert!(module.is_encrypted());
//! let name = module.as_c_str(); // decrypts in place
//! // ... pass `name` to the host ...
//! module.clear();
//! ```
//!
//! `obfuscate!` derives its keys from the build time (`HH:MM:SS`, minute and
//! second units). Set `OVERLAYHOOK_OBFUSCATION_TIME` while building for
//! reproducible output, or pass explicit keys: `obfuscate!("text", 0x41, 7)`.

mod hash;
mod literal;

pub use hash::{fnv1a_32, fnv1a_64, hash_c_str, hash_const, hash_runtime, FnvHash};
pub use literal::{crypt, ObfuscatedLiteral, ObfuscationKeys};
