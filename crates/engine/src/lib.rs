//! overlayhook Engine - Host Collaborators and Global Storage
//!
//! This crate handles everything the agent consumes from the host process:
//! - The simulation tick counter ([`tick`])
//! - Dispatch table slots of the device entry points ([`locator`])
//! - Resolving the window a device presents into ([`window`])
//! - Replacing that window's procedure ([`subclass`])
//! - The module base used for offset resolution ([`globals`])
//!
//! # Architecture
//!
//! Collaborators are plain traits so the core can be driven by the real host
//! or by test doubles. The entry point builds a [`globals::HostGlobals`] once
//! during attach via [`init_host`] and tears it down on detach via
//! [`teardown_host`].

pub mod error;
pub mod globals;
pub mod locator;
pub mod subclass;
pub mod tick;
pub mod window;

pub use error::HostError;
pub use globals::{
    check_control_thread, host, init_host, is_host_initialized, is_main_thread, teardown_host,
    HostGlobals,
};
pub use locator::{DeviceVTable, DispatchSlot, EntryPoint, EntryPointLocator};
pub use subclass::{call_window_proc, WindowSubclasser};
#[cfg(windows)]
pub use subclass::Win32Subclasser;
pub use tick::{HostTickFn, ManualTickSource, Tick, TickCountFn, TickSource};
pub use window::{CreationParametersResolver, WindowResolver};
