//! Render pipeline interception
//!
//! Replaces the device's present and reset dispatch table entries with our
//! own entry points, which capture the host's device and forward to the
//! originals:
//! - [`vtable`]: one replaced dispatch table slot ([`HookRecord`])
//! - [`capture`]: the capture state machine ([`RenderHook`])
//! - [`singleton`]: the process-wide instance the entry points dispatch to
//!
//! With a window subclasser the captured window's procedure is replaced too,
//! so overlay input can be taken before the host sees it.
//!
//! # Example
//! ```ignore
//! let guard = init_singleton(Arc::new(locator), Arc::new(CreationParametersResolver))?;
//!
//! guard.on_capture(|event| match event {
//!     CaptureEvent::Lost { .. } => release_overlay_resources(),
//!     CaptureEvent::Captured(device) | CaptureEvent::Restored(device) => {
//!         create_overlay_resources(device)
//!     }
//! });
//! guard.on_present(|device| draw_overlay(device));
//! guard.on_window_message(|message| overlay_wants_input(message).then_some(0));
//! ```

pub mod capture;
mod detours;
pub mod device;
pub mod error;
pub mod listeners;
pub mod singleton;
pub mod vtable;

pub use capture::{CaptureState, RenderHook};
pub use device::CapturedDevice;
pub use error::{CaptureError, HookInstallError};
pub use listeners::{CaptureEvent, CaptureListenerKey};
pub use singleton::{
    destroy_singleton, init_singleton, init_singleton_with, is_singleton_initialized, singleton,
    CaptureGuard,
};
pub use vtable::HookRecord;
