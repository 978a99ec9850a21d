//! `obfuscate!` implementation
//!
//! Encrypts the literal with the same rolling XOR transform as
//! `overlayhook_core::obfuscation::crypt` and emits only the ciphertext.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse::Parse, parse::ParseStream, LitInt, LitStr, Token};

use crate::build_time::{build_time, keys_from_time};

/// Arguments to the obfuscate macro
///
/// Usage:
/// - `obfuscate!("d3d9.dll")`
/// - `obfuscate!("d3d9.dll", 0x41, 7)`
pub struct ObfuscateArgs {
    /// The literal to encrypt
    pub literal: LitStr,
    /// Explicit key pair
    pub keys: Option<(LitInt, LitInt)>,
}

impl Parse for ObfuscateArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let literal: LitStr = input.parse()?;

        let keys = if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            let key1: LitInt = input.parse()?;
            input.parse::<Token![,]>()?;
            let key2: LitInt = input.parse()?;
            Some((key1, key2))
        } else {
            None
        };

        // Allow a trailing comma
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
        }

        Ok(Self { literal, keys })
    }
}

fn key_byte(key1: u8, key2: u8, index: usize) -> u8 {
    key1.wrapping_add((index % (1 + key2 as usize)) as u8)
}

/// Generate the encrypted literal expression
pub fn generate_obfuscated(args: ObfuscateArgs) -> TokenStream {
    let (key1, key2) = match &args.keys {
        Some((k1, k2)) => match (k1.base10_parse::<u8>(), k2.base10_parse::<u8>()) {
            (Ok(k1), Ok(k2)) => (k1, k2),
            (Err(e), _) | (_, Err(e)) => return e.to_compile_error(),
        },
        None => keys_from_time(&build_time()),
    };

    if key1 == 0 || key1 as u16 + key2 as u16 > u8::MAX as u16 {
        return syn::Error::new(
            args.literal.span(),
            "obfuscation keys must satisfy key1 != 0 and key1 + key2 <= 255",
        )
        .to_compile_error();
    }

    let value = args.literal.value();
    if value.as_bytes().contains(&0) {
        return syn::Error::new(args.literal.span(), "literal must not contain NUL bytes")
            .to_compile_error();
    }

    let encrypted: Vec<u8> = value
        .bytes()
        .chain(std::iter::once(0))
        .enumerate()
        .map(|(i, b)| b ^ key_byte(key1, key2, i))
        .collect();
    let size = encrypted.len();

    quote! {
        {
            const LITERAL: ::overlayhook_core::obfuscation::ObfuscatedLiteral<#size> =
                ::overlayhook_core::obfuscation::ObfuscatedLiteral::from_encrypted(
                    [#(#encrypted),*],
                    ::overlayhook_core::obfuscation::ObfuscationKeys::new(#key1, #key2),
                );
            LITERAL
        }
    }
}
