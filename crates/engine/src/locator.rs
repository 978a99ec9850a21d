//! Device entry point location
//!
//! The render hook intercepts the device by replacing dispatch table slots.
//! A locator tells it where those slots live.

use std::fmt;
use std::ptr::NonNull;

use overlayhook_sdk::{indices, IDirect3DDevice9};

use crate::error::HostError;

/// Device entry points the render hook intercepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Per-frame presentation (EndScene by default)
    Present,
    /// Device reset
    Reset,
}

impl EntryPoint {
    /// Human-readable name for logs and errors
    pub const fn name(self) -> &'static str {
        match self {
            EntryPoint::Present => "Present",
            EntryPoint::Reset => "Reset",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of one dispatch table entry
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DispatchSlot(NonNull<*const ()>);

// SAFETY: A slot is only an address; writes go through the hook record which
// serializes them behind the lifecycle lock.
unsafe impl Send for DispatchSlot {}
unsafe impl Sync for DispatchSlot {}

impl DispatchSlot {
    #[inline]
    pub fn new(slot: *mut *const ()) -> Option<Self> {
        NonNull::new(slot).map(Self)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut *const () {
        self.0.as_ptr()
    }

    /// Read the function pointer currently stored in the slot
    ///
    /// # Safety
    /// The slot must point into a live dispatch table.
    #[inline]
    pub unsafe fn read(self) -> *const () {
        self.0.as_ptr().read_volatile()
    }
}

impl fmt::Debug for DispatchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchSlot({:#x})", self.0.as_ptr() as usize)
    }
}

/// Collaborator returning the raw dispatch table slot of an entry point
pub trait EntryPointLocator: Send + Sync {
    /// Slot of `entry`, or `None` if it cannot be located
    fn locate(&self, entry: EntryPoint) -> Option<DispatchSlot>;
}

/// Locator over a device's vtable
///
/// All devices created by the same runtime share one vtable, so the table of
/// a throwaway device is enough to hook the host's device.
pub struct DeviceVTable {
    vtable: NonNull<*const ()>,
    present_index: usize,
    reset_index: usize,
}

// SAFETY: The vtable lives in the graphics runtime's image for the life of
// the process.
unsafe impl Send for DeviceVTable {}
unsafe impl Sync for DeviceVTable {}

impl DeviceVTable {
    /// Create a locator from a vtable pointer using the default slot indices
    ///
    /// # Safety
    /// `vtable` must point to a device vtable with at least
    /// [`indices::DEVICE_VTABLE_LEN`] entries.
    pub unsafe fn from_vtable(vtable: *mut *const ()) -> Result<Self, HostError> {
        let vtable = NonNull::new(vtable).ok_or(HostError::NullPointer("device vtable"))?;
        Ok(Self {
            vtable,
            present_index: indices::END_SCENE,
            reset_index: indices::RESET,
        })
    }

    /// Create a locator from a device object (first member is the vtable pointer)
    ///
    /// # Safety
    /// `device` must be a valid `IDirect3DDevice9` object.
    pub unsafe fn from_device(device: *mut IDirect3DDevice9) -> Result<Self, HostError> {
        if device.is_null() {
            return Err(HostError::NullPointer("device"));
        }
        let vtable = *(device as *const *mut *const ());
        tracing::debug!(
            "Device {:x} uses vtable {:x}",
            device as usize,
            vtable as usize
        );
        Self::from_vtable(vtable)
    }

    /// Override the slot indices (e.g. hook `Present` instead of `EndScene`)
    pub fn with_indices(mut self, present_index: usize, reset_index: usize) -> Self {
        self.present_index = present_index;
        self.reset_index = reset_index;
        self
    }

    /// Slot index used for `entry`
    pub fn index_of(&self, entry: EntryPoint) -> usize {
        match entry {
            EntryPoint::Present => self.present_index,
            EntryPoint::Reset => self.reset_index,
        }
    }
}

impl EntryPointLocator for DeviceVTable {
    fn locate(&self, entry: EntryPoint) -> Option<DispatchSlot> {
        let index = self.index_of(entry);
        if index >= indices::DEVICE_VTABLE_LEN {
            tracing::warn!("{} index {} is outside the device vtable", entry, index);
            return None;
        }
        // SAFETY: The index is within the vtable length checked above
        DispatchSlot::new(unsafe { self.vtable.as_ptr().add(index) })
    }
}
