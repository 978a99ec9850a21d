//! Process-wide render hook
//!
//! Exactly one [`RenderHook`] exists per process. It is created explicitly
//! by [`init_singleton`] and released by [`destroy_singleton`], which the
//! returned [`CaptureGuard`] calls on drop so every exit path tears it down.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use overlayhook_engine::{EntryPointLocator, WindowResolver};
use overlayhook_sdk::{PresentFn, ResetFn};

use super::capture::RenderHook;
use super::error::HookInstallError;

static INSTANCE: RwLock<Option<Arc<RenderHook>>> = RwLock::new(None);

/// Last installed originals, for detour calls racing with teardown
static LAST_PRESENT: AtomicUsize = AtomicUsize::new(0);
static LAST_RESET: AtomicUsize = AtomicUsize::new(0);

/// Create the process-wide render hook and install its interception points
///
/// Fails if an instance already exists or installation fails; in the latter
/// case no instance is left behind.
pub fn init_singleton(
    locator: Arc<dyn EntryPointLocator>,
    windows: Arc<dyn WindowResolver>,
) -> Result<CaptureGuard, HookInstallError> {
    init_singleton_with(RenderHook::new(locator, windows))
}

/// Make `hook` the process-wide render hook and install it
///
/// Same as [`init_singleton`] for a hook configured by the caller, e.g.
/// with [`RenderHook::with_subclasser`].
pub fn init_singleton_with(hook: RenderHook) -> Result<CaptureGuard, HookInstallError> {
    let hook = {
        let mut instance = INSTANCE.write();
        if instance.is_some() {
            return Err(HookInstallError::AlreadyInitialized);
        }
        let hook = Arc::new(hook);
        *instance = Some(Arc::clone(&hook));
        hook
    };

    // Stored before installing so the first intercepted frame finds it
    if let Err(e) = hook.initialize() {
        INSTANCE.write().take();
        hook.dispose();
        return Err(e);
    }

    if let Some(present) = hook.original_present() {
        LAST_PRESENT.store(present as usize, Ordering::Release);
    }
    if let Some(reset) = hook.original_reset() {
        LAST_RESET.store(reset as usize, Ordering::Release);
    }

    tracing::info!("Render hook singleton initialized");
    Ok(CaptureGuard { hook })
}

/// The process-wide render hook, if initialized
#[inline]
pub fn singleton() -> Option<Arc<RenderHook>> {
    INSTANCE.read().clone()
}

#[inline]
pub fn is_singleton_initialized() -> bool {
    INSTANCE.read().is_some()
}

/// Dispose and release the process-wide render hook
///
/// # Returns
/// `true` if an instance existed
pub fn destroy_singleton() -> bool {
    let Some(hook) = INSTANCE.write().take() else {
        return false;
    };

    hook.dispose();
    tracing::info!("Render hook singleton destroyed");
    true
}

pub(crate) fn last_original_present() -> Option<PresentFn> {
    let addr = LAST_PRESENT.load(Ordering::Acquire);
    if addr == 0 {
        return None;
    }
    // SAFETY: Only stored from an installed present hook's original.
    Some(unsafe { std::mem::transmute::<*const (), PresentFn>(addr as *const ()) })
}

pub(crate) fn last_original_reset() -> Option<ResetFn> {
    let addr = LAST_RESET.load(Ordering::Acquire);
    if addr == 0 {
        return None;
    }
    // SAFETY: Only stored from an installed reset hook's original.
    Some(unsafe { std::mem::transmute::<*const (), ResetFn>(addr as *const ()) })
}

/// Owner of the process-wide render hook
///
/// Dropping the guard destroys the singleton.
#[must_use = "dropping the guard destroys the render hook"]
#[derive(Debug)]
pub struct CaptureGuard {
    hook: Arc<RenderHook>,
}

impl CaptureGuard {
    pub fn hook(&self) -> &Arc<RenderHook> {
        &self.hook
    }
}

impl Deref for CaptureGuard {
    type Target = RenderHook;

    fn deref(&self) -> &RenderHook {
        &self.hook
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        // Only tear down the instance this guard created
        let ours = INSTANCE
            .read()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &self.hook));
        if ours {
            destroy_singleton();
        } else {
            self.hook.dispose();
        }
    }
}
