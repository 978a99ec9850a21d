//! Global host state storage
//!
//! Host collaborators are handed over once during attach and stored here.
//! Unlike a lazily-constructed global, the state has an explicit lifecycle:
//! [`init_host`] on attach, [`teardown_host`] on detach.

use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::RwLock;

use crate::error::HostError;
use crate::tick::{Tick, TickSource};

/// Process-wide state received from the host
pub struct HostGlobals {
    /// Base address of the host's main module
    pub module_base: usize,

    /// Host simulation clock
    pub ticks: Arc<dyn TickSource>,

    /// Thread that attached the agent (the host's control thread)
    pub main_thread_id: ThreadId,
}

impl HostGlobals {
    /// Create new HostGlobals, recording the calling thread as the main thread
    ///
    /// # Arguments
    /// * `module_base` - Base address of the host image
    /// * `ticks` - Host simulation clock
    pub fn new(module_base: usize, ticks: Arc<dyn TickSource>) -> Self {
        Self {
            module_base,
            ticks,
            main_thread_id: std::thread::current().id(),
        }
    }

    /// Current host tick
    #[inline]
    pub fn current_tick(&self) -> Tick {
        self.ticks.current_tick()
    }

    /// Resolve a relative virtual address against the module base
    #[inline]
    pub fn resolve_rva(&self, rva: usize) -> usize {
        self.module_base.wrapping_add(rva)
    }
}

/// Global host state storage
static HOST: RwLock<Option<Arc<HostGlobals>>> = RwLock::new(None);

/// Initialize host globals
///
/// Called once during attach. Returns error if already initialized.
pub fn init_host(globals: HostGlobals) -> Result<Arc<HostGlobals>, HostError> {
    let mut slot = HOST.write();
    if slot.is_some() {
        return Err(HostError::AlreadyInitialized);
    }

    let globals = Arc::new(globals);
    tracing::info!(
        "Host globals initialized: module base {:x}, main thread {:?}",
        globals.module_base,
        globals.main_thread_id
    );
    *slot = Some(Arc::clone(&globals));
    Ok(globals)
}

/// Drop the stored host globals
///
/// Returns `true` if globals were stored. Outstanding `Arc` clones stay valid.
pub fn teardown_host() -> bool {
    let removed = HOST.write().take().is_some();
    if removed {
        tracing::debug!("Host globals torn down");
    }
    removed
}

/// Get host globals
pub fn host() -> Result<Arc<HostGlobals>, HostError> {
    HOST.read().clone().ok_or(HostError::NotInitialized)
}

/// Check if host globals are initialized
pub fn is_host_initialized() -> bool {
    HOST.read().is_some()
}

/// Check if the current thread is the thread that attached the agent
pub fn is_main_thread() -> bool {
    HOST.read()
        .as_ref()
        .map(|g| std::thread::current().id() == g.main_thread_id)
        .unwrap_or(false)
}

/// Check that a control-thread operation runs on the thread that attached
///
/// Before attach every thread passes. Otherwise a mismatch is logged and
/// `false` returned; the caller decides whether to go on.
pub fn check_control_thread(operation: &str) -> bool {
    if !is_host_initialized() || is_main_thread() {
        return true;
    }
    tracing::warn!(
        "{} called from {:?} instead of the control thread",
        operation,
        std::thread::current().id()
    );
    false
}
