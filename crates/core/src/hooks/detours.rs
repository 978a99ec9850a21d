//! Replacement entry points written into the device dispatch table and the
//! captured window
//!
//! The device entry points run on the host's render thread, the window
//! procedure on the window's thread. Listener panics are caught here and
//! never unwind into the host; the call always goes on to the original.

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use overlayhook_engine::call_window_proc;
use overlayhook_sdk::{
    DeviceHandle, HResult, IDirect3DDevice9, PresentParameters, WindowHandle, WindowMessage,
    D3DERR_INVALIDCALL,
};

use super::singleton;

/// Replacement for the present entry point
pub(crate) unsafe extern "system" fn present_detour(device: *mut IDirect3DDevice9) -> HResult {
    let hook = singleton::singleton();

    if let (Some(hook), Some(handle)) = (hook.as_deref(), DeviceHandle::from_raw(device)) {
        if catch_unwind(AssertUnwindSafe(|| hook.present(handle))).is_err() {
            tracing::error!("Panic in present listener");
        }
    }

    let original = hook
        .as_deref()
        .and_then(|hook| hook.original_present())
        .or_else(singleton::last_original_present);

    match original {
        Some(original) => original(device),
        None => D3DERR_INVALIDCALL,
    }
}

/// Replacement for the reset entry point
///
/// Runs the two reset phases around the original call. A panicking listener
/// in the first phase does not keep the host from resetting.
pub(crate) unsafe extern "system" fn reset_detour(
    device: *mut IDirect3DDevice9,
    params: *mut PresentParameters,
) -> HResult {
    let hook = singleton::singleton();

    let original = hook
        .as_deref()
        .and_then(|hook| hook.original_reset())
        .or_else(singleton::last_original_reset);
    let Some(original) = original else {
        return D3DERR_INVALIDCALL;
    };

    let (Some(hook), Some(handle)) = (hook.as_deref(), DeviceHandle::from_raw(device)) else {
        return original(device, params);
    };

    if catch_unwind(AssertUnwindSafe(|| hook.begin_reset())).is_err() {
        tracing::error!("Panic in device lost listener");
    }

    let result = original(device, params);

    if catch_unwind(AssertUnwindSafe(|| hook.end_reset(handle, result))).is_err() {
        tracing::error!("Panic in device restored listener");
    }

    result
}

/// Last replaced window procedure, for messages racing with teardown
static LAST_WINDOW_PROC: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn remember_window_proc(previous: usize) {
    LAST_WINDOW_PROC.store(previous, Ordering::Release);
}

/// Replacement for the captured window's procedure
///
/// Message listeners see every message first. Those they do not consume go
/// on to the window's previous procedure.
pub(crate) unsafe extern "system" fn window_proc_detour(
    hwnd: *mut c_void,
    msg: u32,
    wparam: usize,
    lparam: isize,
) -> isize {
    let Some(window) = WindowHandle::from_raw(hwnd) else {
        return 0;
    };
    let message = WindowMessage {
        window,
        msg,
        wparam,
        lparam,
    };

    if let Some(hook) = singleton::singleton() {
        match catch_unwind(AssertUnwindSafe(|| hook.window_message(&message))) {
            Ok(Some(result)) => return result,
            Ok(None) => {}
            Err(_) => tracing::error!("Panic in window message listener"),
        }
        if let Some(result) = hook.call_original_window_proc(&message) {
            return result;
        }
    }

    match LAST_WINDOW_PROC.load(Ordering::Acquire) {
        0 => 0,
        previous => call_window_proc(previous, &message),
    }
}
