//! Window procedure subclassing
//!
//! The overlay sees the captured window's input by replacing its window
//! procedure. Messages it does not consume go on to the procedure that was
//! installed before.

use overlayhook_sdk::{WindowHandle, WindowMessage, WindowProcFn};

/// Collaborator replacing a window's procedure
pub trait WindowSubclasser: Send + Sync {
    /// Install `procedure` on `window`
    ///
    /// Returns the procedure it replaced, or `None` if the window rejected
    /// the change.
    fn subclass(&self, window: WindowHandle, procedure: WindowProcFn) -> Option<usize>;

    /// Put `previous` back as the procedure of `window`
    fn restore(&self, window: WindowHandle, previous: usize) -> bool;
}

/// Forward `message` to a procedure returned by [`WindowSubclasser::subclass`]
///
/// # Safety
/// `previous` must be a window procedure, or procedure handle, of this
/// process.
pub unsafe fn call_window_proc(previous: usize, message: &WindowMessage) -> isize {
    #[cfg(windows)]
    {
        win32::call(previous, message)
    }
    #[cfg(not(windows))]
    {
        let procedure = std::mem::transmute::<usize, WindowProcFn>(previous);
        procedure(
            message.window.as_raw(),
            message.msg,
            message.wparam,
            message.lparam,
        )
    }
}

#[cfg(windows)]
pub use win32::Win32Subclasser;

#[cfg(windows)]
mod win32 {
    use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
    #[cfg(target_pointer_width = "64")]
    use windows::Win32::UI::WindowsAndMessaging::SetWindowLongPtrW;
    #[cfg(target_pointer_width = "32")]
    use windows::Win32::UI::WindowsAndMessaging::SetWindowLongW;
    use windows::Win32::UI::WindowsAndMessaging::{CallWindowProcW, GWLP_WNDPROC, WNDPROC};

    use super::*;

    /// Subclasses through `SetWindowLongPtrW(GWLP_WNDPROC)`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Win32Subclasser;

    unsafe fn set_window_proc(window: WindowHandle, value: isize) -> isize {
        let hwnd = HWND(window.as_raw());
        #[cfg(target_pointer_width = "64")]
        {
            SetWindowLongPtrW(hwnd, GWLP_WNDPROC, value)
        }
        #[cfg(target_pointer_width = "32")]
        {
            SetWindowLongW(hwnd, GWLP_WNDPROC, value as i32) as isize
        }
    }

    impl WindowSubclasser for Win32Subclasser {
        fn subclass(&self, window: WindowHandle, procedure: WindowProcFn) -> Option<usize> {
            // SAFETY: The window belongs to this process; any of its threads
            // may replace the procedure.
            let previous = unsafe { set_window_proc(window, procedure as isize) };
            if previous == 0 {
                tracing::warn!("SetWindowLongPtrW failed for {:?}", window);
                return None;
            }
            Some(previous as usize)
        }

        fn restore(&self, window: WindowHandle, previous: usize) -> bool {
            // SAFETY: `previous` came from `subclass` on the same window.
            unsafe { set_window_proc(window, previous as isize) != 0 }
        }
    }

    pub(super) unsafe fn call(previous: usize, message: &WindowMessage) -> isize {
        let procedure = std::mem::transmute::<usize, WNDPROC>(previous);
        CallWindowProcW(
            procedure,
            HWND(message.window.as_raw()),
            message.msg,
            WPARAM(message.wparam),
            LPARAM(message.lparam),
        )
        .0
    }
}
