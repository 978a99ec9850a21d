//! overlayhook Agent - FFI Layer
//!
//! This crate provides the boundary between the host-side injector and the
//! Rust core logic. It compiles to a cdylib (.so/.dll) whose C exports are
//! described by the generated `include/overlayhook.h`.
//!
//! On Windows the loader's `DllMain` removes all interception when the
//! library is unloaded without a prior `overlayhook_detach`.

pub mod agent;
pub mod ffi;

pub use agent::{
    attach, detach, entities, is_attached, on_process_detach, scheduler, simulation_step,
    AttachError, AttachParams,
};

/// Library entry point
///
/// Attach is driven by the injector through `overlayhook_attach`; only
/// unload is handled here.
///
/// # Safety
/// Called by the Windows loader under the loader lock.
#[cfg(windows)]
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn DllMain(
    _hinst: windows::Win32::Foundation::HINSTANCE,
    reason: u32,
    _reserved: *mut std::ffi::c_void,
) -> windows::Win32::Foundation::BOOL {
    use windows::Win32::System::SystemServices::DLL_PROCESS_DETACH;

    if reason == DLL_PROCESS_DETACH {
        on_process_detach();
    }
    windows::Win32::Foundation::TRUE
}
