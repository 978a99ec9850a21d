//! overlayhook Proc Macros
//!
//! This crate provides proc macros for the overlayhook agent:
//!
//! - `obfuscate!` - Encrypt a string literal at compile time
//!
//! # Example
//!
//! ```ignore
//! use overlayhook_core::obfuscate;
//!
//! // Keys derived from the build time
//! let mut module = obfuscate!("d3d9.dll");
//!
//! // Explicit keys
//! let mut class = obfuscate!("Valve001", 0x35, 0x39);
//!
//! assert_eq!(module.as_str(), "d3d9.dll");
//! ```

mod build_time;
mod obfuscate;

use proc_macro::TokenStream;
use syn::parse_macro_input;

/// Encrypt a string literal at compile time
///
/// Expands to an `overlayhook_core::obfuscation::ObfuscatedLiteral<N>` where
/// `N` is the literal's byte length plus the NUL terminator. Only the
/// ciphertext is emitted into the binary.
///
/// # Arguments
///
/// - First argument: the string literal
/// - Optional: two `u8` keys (`key1`, `key2`). Without them the keys are the
///   minute and second units characters of the build time.
#[proc_macro]
pub fn obfuscate(input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(input as obfuscate::ObfuscateArgs);
    obfuscate::generate_obfuscated(args).into()
}
