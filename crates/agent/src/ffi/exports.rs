//! C-compatible exports called by the injector

use std::ffi::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::instrument;
use tracing_subscriber::EnvFilter;

use overlayhook_core::{AgentConfig, EntityKey};
#[cfg(windows)]
use overlayhook_engine::Win32Subclasser;
use overlayhook_engine::{
    CreationParametersResolver, DeviceVTable, HostTickFn, TickCountFn, WindowSubclasser,
};

use crate::agent::{self, AttachParams};

// Agent metadata - static strings with null terminators for C compatibility
static NAME: &[u8] = b"overlayhook\0";
static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();

/// Host collaborators passed to [`overlayhook_attach`]
#[repr(C)]
pub struct HostCallbacks {
    /// Base address of the host's main module
    pub module_base: usize,
    /// Returns the host's current simulation tick
    pub tick_count: Option<TickCountFn>,
    /// Vtable of any `IDirect3DDevice9` created by the host's runtime
    pub device_vtable: *mut c_void,
}

/// Called when the agent is injected
///
/// # Safety
/// - `callbacks` must point to a valid [`HostCallbacks`]
/// - `error` must be a valid pointer to a buffer of at least `maxlen` bytes, or null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn overlayhook_attach(
    callbacks: *const HostCallbacks,
    error: *mut c_char,
    maxlen: usize,
) -> bool {
    let config = AgentConfig::load();
    let log_config = config.as_ref().cloned().unwrap_or_default();

    // Initialize tracing subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(log_config.effective_log_filter())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("overlayhook attaching...");

    let config = config.unwrap_or_else(|e| {
        tracing::warn!("Using default config: {}", e);
        AgentConfig::default()
    });

    let Some(callbacks) = callbacks.as_ref() else {
        write_error(error, maxlen, "Host callbacks are null");
        return false;
    };
    let Some(tick_count) = callbacks.tick_count else {
        write_error(error, maxlen, "Tick count function is null");
        return false;
    };

    let locator = match DeviceVTable::from_vtable(callbacks.device_vtable as *mut *const ()) {
        Ok(locator) => locator.with_indices(config.hooks.present_index, config.hooks.reset_index),
        Err(e) => {
            write_error(error, maxlen, &format!("Locator error: {}", e));
            return false;
        }
    };

    let params = AttachParams {
        module_base: callbacks.module_base,
        ticks: Arc::new(HostTickFn::new(tick_count)),
        locator: Arc::new(locator),
        windows: Arc::new(CreationParametersResolver),
        subclasser: if config.hooks.window_messages {
            window_subclasser()
        } else {
            None
        },
    };

    match catch_unwind(AssertUnwindSafe(|| agent::attach(params))) {
        Ok(Ok(())) => {
            tracing::info!("overlayhook attached successfully!");
            tracing::info!("Main thread ID: {:?}", std::thread::current().id());
            true
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to attach: {}", e);
            write_error(error, maxlen, &e.to_string());
            false
        }
        Err(_) => {
            write_error(error, maxlen, "Panic during attach");
            false
        }
    }
}

/// Called before the agent is unloaded
///
/// Removes all interception; the host must not unload the library otherwise.
///
/// # Safety
/// - `error` must be a valid pointer to a buffer of at least `maxlen` bytes, or null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn overlayhook_detach(error: *mut c_char, maxlen: usize) -> bool {
    tracing::info!("overlayhook detaching...");

    match catch_unwind(agent::detach) {
        Ok(_) => true,
        Err(_) => {
            write_error(error, maxlen, "Panic during detach");
            false
        }
    }
}

#[no_mangle]
pub extern "C" fn overlayhook_get_name() -> *const c_char {
    NAME.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn overlayhook_get_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

/// Called by the host once per simulation step
///
/// Returns the number of deferred actions that fired.
#[no_mangle]
#[instrument(skip_all)]
pub extern "C" fn overlayhook_simulation_step() -> u32 {
    match catch_unwind(agent::simulation_step) {
        Ok(Some(stats)) => stats.fired as u32,
        Ok(None) => 0,
        Err(_) => {
            tracing::error!("Panic in deferred action");
            0
        }
    }
}

/// Called by the host when an entity is created
///
/// Returns the key deferred actions should be bound to, or 0 when the agent
/// is not attached.
#[no_mangle]
pub extern "C" fn overlayhook_entity_created(entity: *mut c_void) -> u64 {
    if entity.is_null() {
        return 0;
    }
    agent::entities()
        .map(|entities| entities.insert(entity as usize).to_ffi())
        .unwrap_or(0)
}

/// Called by the host when an entity is deleted
///
/// Pending actions bound to the entity are dropped at their deadline.
#[no_mangle]
pub extern "C" fn overlayhook_entity_deleted(key: u64) -> bool {
    agent::entities()
        .and_then(|entities| entities.remove(EntityKey::from_ffi(key)))
        .is_some()
}

#[cfg(windows)]
fn window_subclasser() -> Option<Arc<dyn WindowSubclasser>> {
    Some(Arc::new(Win32Subclasser))
}

#[cfg(not(windows))]
fn window_subclasser() -> Option<Arc<dyn WindowSubclasser>> {
    None
}

/// Helper to write an error message to a C buffer
///
/// # Safety
/// - `error` must be a valid pointer or null
/// - `maxlen` must accurately reflect the buffer size
unsafe fn write_error(error: *mut c_char, maxlen: usize, msg: &str) {
    if !error.is_null() && maxlen > 0 {
        let bytes = msg.as_bytes();
        let len = bytes.len().min(maxlen - 1);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), error as *mut u8, len);
        *error.add(len) = 0;
    }
}
