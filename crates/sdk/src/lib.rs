//! overlayhook SDK - host graphics device type definitions
//!
//! This crate contains the opaque types and function signatures of the host's
//! Direct3D 9 device. It has no dependencies so every other crate can build
//! against it in parallel.
//!
//! # Modules
//!
//! - [`device`] - Opaque device types, handles and entry point signatures
//! - [`indices`] - Dispatch table slot indices for the device entry points
//! - [`math`] - Plain value types shared with the host
//! - [`window`] - Window procedure signature and messages

pub mod device;
pub mod indices;
pub mod math;
pub mod window;

pub use device::*;
pub use math::Vector3;
pub use window::{WindowMessage, WindowProcFn};
