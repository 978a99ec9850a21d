//! Window procedure types
//!
//! Raw `WNDPROC` signature and the message tuple it receives.

use std::ffi::c_void;

use crate::device::WindowHandle;

/// Window procedure: `LRESULT (HWND, UINT, WPARAM, LPARAM)`
pub type WindowProcFn =
    unsafe extern "system" fn(hwnd: *mut c_void, msg: u32, wparam: usize, lparam: isize) -> isize;

/// `WM_NCDESTROY`, the last message a window receives
pub const WM_NCDESTROY: u32 = 0x0082;

/// One message delivered to the captured window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMessage {
    pub window: WindowHandle,
    pub msg: u32,
    pub wparam: usize,
    pub lparam: isize,
}
