//! Captured device state
//!
//! The device is owned by the host. The render hook only records which
//! device it last captured and whether that capture is still usable.

use overlayhook_sdk::{DeviceHandle, WindowHandle};

use super::error::CaptureError;

/// A device as captured by the render hook
///
/// Only valid for the frame it was obtained in. Consumers that keep one
/// across frames must re-check it with
/// [`RenderHook::is_current`](super::RenderHook::is_current); a reset can
/// invalidate it between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedDevice {
    /// The host's device
    pub handle: DeviceHandle,
    /// Window the device presents into
    pub window: WindowHandle,
    /// Capture generation; increases on every fresh capture
    pub generation: u64,
}

/// Device-side phase of the render hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DevicePhase {
    /// Nothing captured yet
    Idle,
    /// A usable device is cached
    Capturing,
    /// The cached device was invalidated
    Lost,
}

/// Single per-process record of the host device
#[derive(Debug)]
pub(crate) struct DeviceState {
    phase: DevicePhase,
    current: Option<CapturedDevice>,
    generation: u64,
    resetting: bool,
}

impl DeviceState {
    pub const fn new() -> Self {
        Self {
            phase: DevicePhase::Idle,
            current: None,
            generation: 0,
            resetting: false,
        }
    }

    #[inline]
    pub fn phase(&self) -> DevicePhase {
        self.phase
    }

    #[inline]
    pub fn is_resetting(&self) -> bool {
        self.resetting
    }

    /// Cached device if it is usable and matches `handle`
    #[inline]
    pub fn cached(&self, handle: DeviceHandle) -> Option<CapturedDevice> {
        match (self.phase, self.current) {
            (DevicePhase::Capturing, Some(c)) if c.handle == handle => Some(c),
            _ => None,
        }
    }

    /// Usable device, if any
    pub fn current(&self) -> Result<CapturedDevice, CaptureError> {
        match (self.phase, self.current) {
            (DevicePhase::Capturing, Some(c)) => Ok(c),
            _ => Err(CaptureError::DeviceLost),
        }
    }

    /// Record a fresh capture
    pub fn capture(&mut self, handle: DeviceHandle, window: WindowHandle) -> CapturedDevice {
        self.generation += 1;
        let captured = CapturedDevice {
            handle,
            window,
            generation: self.generation,
        };
        self.current = Some(captured);
        self.phase = DevicePhase::Capturing;
        captured
    }

    /// Invalidate the cached device
    ///
    /// Returns the capture that was usable until now, if any.
    pub fn invalidate(&mut self) -> Option<CapturedDevice> {
        let previous = self.current().ok();
        if self.phase != DevicePhase::Idle {
            self.phase = DevicePhase::Lost;
        }
        self.current = None;
        previous
    }

    pub fn set_resetting(&mut self, resetting: bool) {
        self.resetting = resetting;
    }

    /// Whether `captured` is still the usable device
    pub fn is_current(&self, captured: &CapturedDevice) -> bool {
        self.phase == DevicePhase::Capturing && self.current.as_ref() == Some(captured)
    }
}
