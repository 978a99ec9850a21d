//! Error types for the render hook

use overlayhook_engine::EntryPoint;

/// Error installing or removing an interception point
///
/// Fatal for the capture subsystem: it never proceeds to capturing.
#[derive(Debug, thiserror::Error)]
pub enum HookInstallError {
    #[error("Entry point not found: {0}")]
    EntryPointNotFound(EntryPoint),

    #[error("Memory protection failed for {entry}: {reason}")]
    MemoryProtection { entry: &'static str, reason: String },

    #[error("{0} is already hooked")]
    AlreadyHooked(&'static str),

    #[error("Render hook has been disposed")]
    Disposed,

    #[error("Render hook already initialized")]
    AlreadyInitialized,
}

/// Error obtaining the current device
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The device's window cannot be resolved yet (host still starting)
    #[error("Device window not available yet")]
    NoWindow,

    /// The device is being reset or was released
    #[error("Device lost")]
    DeviceLost,

    /// Interception points are not installed
    #[error("Render hook not installed")]
    NotInstalled,

    /// The render hook has been disposed
    #[error("Render hook disposed")]
    Disposed,
}

impl CaptureError {
    /// Whether trying again on a later frame can succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, CaptureError::NoWindow | CaptureError::DeviceLost)
    }
}
