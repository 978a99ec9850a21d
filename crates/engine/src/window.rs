//! Window resolution for a captured device
//!
//! While the host is still starting up the device may exist before its
//! focus window does. Capture waits until a window can be resolved.

use overlayhook_sdk::{
    indices, succeeded, DeviceCreationParameters, DeviceHandle, GetCreationParametersFn,
    WindowHandle,
};

/// Collaborator resolving the window a device presents into
pub trait WindowResolver: Send + Sync {
    /// Window of `device`, or `None` if the host has not created it yet
    fn resolve_window(&self, device: DeviceHandle) -> Option<WindowHandle>;
}

/// Resolves the focus window through `IDirect3DDevice9::GetCreationParameters`
#[derive(Debug, Default, Clone, Copy)]
pub struct CreationParametersResolver;

impl WindowResolver for CreationParametersResolver {
    fn resolve_window(&self, device: DeviceHandle) -> Option<WindowHandle> {
        let mut params = DeviceCreationParameters::default();

        // SAFETY: `device` is a live device handed to us by the present
        // interception point; its first member is the vtable pointer.
        let hr = unsafe {
            let vtable = *(device.as_ptr() as *const *const *const ());
            let slot = *vtable.add(indices::GET_CREATION_PARAMETERS);
            if slot.is_null() {
                return None;
            }
            let get_params: GetCreationParametersFn = std::mem::transmute(slot);
            get_params(device.as_ptr(), &mut params)
        };

        if !succeeded(hr) {
            tracing::trace!("GetCreationParameters failed: {:#x}", hr);
            return None;
        }

        WindowHandle::from_raw(params.focus_window)
    }
}
