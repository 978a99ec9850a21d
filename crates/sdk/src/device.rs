//! Direct3D 9 device type definitions
//!
//! These are opaque types representing the host's COM objects.
//! We don't need their internal structure - just pointers and the
//! dispatch table layout described in [`crate::indices`].

use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

/// Opaque type for IDirect3DDevice9
#[repr(C)]
pub struct IDirect3DDevice9 {
    _opaque: [u8; 0],
}

/// Opaque type for D3DPRESENT_PARAMETERS
///
/// Passed through to the original `Reset` untouched.
#[repr(C)]
pub struct PresentParameters {
    _opaque: [u8; 0],
}

/// D3DDEVICE_CREATION_PARAMETERS
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DeviceCreationParameters {
    pub adapter_ordinal: u32,
    pub device_type: u32,
    pub focus_window: *mut c_void,
    pub behavior_flags: u32,
}

impl Default for DeviceCreationParameters {
    fn default() -> Self {
        Self {
            adapter_ordinal: 0,
            device_type: 0,
            focus_window: std::ptr::null_mut(),
            behavior_flags: 0,
        }
    }
}

/// COM result code
pub type HResult = i32;

pub const S_OK: HResult = 0;

/// D3DERR_DEVICELOST
pub const D3DERR_DEVICELOST: HResult = 0x8876_0868_u32 as i32;

/// D3DERR_INVALIDCALL
pub const D3DERR_INVALIDCALL: HResult = 0x8876_086C_u32 as i32;

/// Equivalent of the `SUCCEEDED` macro
#[inline]
pub const fn succeeded(hr: HResult) -> bool {
    hr >= 0
}

/// `IDirect3DDevice9::EndScene` / `Present`-style entry point
pub type PresentFn = unsafe extern "system" fn(device: *mut IDirect3DDevice9) -> HResult;

/// `IDirect3DDevice9::Reset`
pub type ResetFn = unsafe extern "system" fn(
    device: *mut IDirect3DDevice9,
    params: *mut PresentParameters,
) -> HResult;

/// `IDirect3DDevice9::GetCreationParameters`
pub type GetCreationParametersFn = unsafe extern "system" fn(
    device: *mut IDirect3DDevice9,
    params: *mut DeviceCreationParameters,
) -> HResult;

/// Non-null handle to the host's device
///
/// The device is owned by the host; this is a borrowed observation only.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(NonNull<IDirect3DDevice9>);

// SAFETY: The handle is an address the host hands to us; it is never
// dereferenced without going through the device's own entry points.
unsafe impl Send for DeviceHandle {}
unsafe impl Sync for DeviceHandle {}

impl DeviceHandle {
    /// Wrap a raw device pointer, returning `None` for null
    #[inline]
    pub fn from_raw(ptr: *mut IDirect3DDevice9) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut IDirect3DDevice9 {
        self.0.as_ptr()
    }

    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceHandle({:#x})", self.addr())
    }
}

/// Native window handle (HWND) the device presents into
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(NonZeroUsize);

impl WindowHandle {
    /// Wrap a raw window handle, returning `None` for null
    #[inline]
    pub fn from_raw(hwnd: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(hwnd as usize).map(Self)
    }

    #[inline]
    pub fn as_raw(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowHandle({:#x})", self.0.get())
    }
}
