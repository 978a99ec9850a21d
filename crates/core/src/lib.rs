//! overlayhook - Core Logic
//!
//! This crate contains everything the agent does inside the host process:
//! - Render pipeline interception and device capture ([`hooks`])
//! - Tick-based deferred callbacks ([`scheduler`])
//! - Generational entity references ([`entities`])
//! - Compile-time string obfuscation and FNV hashing ([`obfuscation`])
//! - Agent configuration ([`config`])
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - Graphics device types and dispatch table indices
//! - [`engine`] - Host collaborators and host globals

// Allow the crate to refer to itself as `overlayhook_core` for proc macro compatibility
extern crate self as overlayhook_core;

// Re-export SDK and engine crates
pub use overlayhook_engine as engine;
pub use overlayhook_sdk as sdk;

pub mod config;
pub mod entities;
pub mod hooks;
pub mod obfuscation;
pub mod scheduler;

// Re-export commonly used items
pub use hooks::{
    destroy_singleton, init_singleton, init_singleton_with, is_singleton_initialized, singleton,
    CaptureError, CaptureEvent, CaptureGuard, CaptureListenerKey, CaptureState, CapturedDevice,
    HookInstallError, RenderHook,
};
pub use scheduler::{ActionKind, AdvanceStats, DeferredScheduler};

// Re-export entity types
pub use entities::{EntityKey, EntityLookup, EntityTable};

// Re-export obfuscation types
pub use obfuscation::{hash_const, hash_runtime, FnvHash, ObfuscatedLiteral, ObfuscationKeys};

// Re-export config types
pub use config::{AgentConfig, ConfigError, ConfigResult, HookConfig};

// Re-export macros
pub use overlayhook_macros::obfuscate;
