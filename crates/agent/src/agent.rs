//! Process-wide agent state
//!
//! Everything the agent owns between attach and detach: the host globals,
//! the render hook singleton, the deferred scheduler and the entity table
//! it consults. [`attach`] builds it; [`detach`] tears it down in reverse.
//! If the library is unloaded while still attached, [`on_process_detach`]
//! does the same from the loader.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use overlayhook_core::{
    init_singleton_with, AdvanceStats, CaptureGuard, DeferredScheduler, EntityTable,
    HookInstallError, RenderHook,
};
use overlayhook_engine::{
    init_host, teardown_host, EntryPointLocator, HostError, HostGlobals, TickSource,
    WindowResolver, WindowSubclasser,
};

/// Failure to attach the agent
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("Agent already attached")]
    AlreadyAttached,

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Hook error: {0}")]
    Hook(#[from] HookInstallError),
}

/// Host collaborators handed over at attach
pub struct AttachParams {
    /// Base address of the host's main module
    pub module_base: usize,
    pub ticks: Arc<dyn TickSource>,
    pub locator: Arc<dyn EntryPointLocator>,
    pub windows: Arc<dyn WindowResolver>,
    /// Intercepts the captured window's messages when set
    pub subclasser: Option<Arc<dyn WindowSubclasser>>,
}

struct Agent {
    scheduler: Arc<DeferredScheduler>,
    /// Host entity addresses by generational key
    entities: Arc<EntityTable<usize>>,
    /// Dropped on detach, which destroys the render hook singleton
    _capture: CaptureGuard,
}

static AGENT: RwLock<Option<Agent>> = RwLock::new(None);

/// How long unload waits for a thread holding the agent lock
const PROCESS_DETACH_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Attach the agent to the host
///
/// On failure everything set up so far is torn down again.
pub fn attach(params: AttachParams) -> Result<(), AttachError> {
    let mut agent = AGENT.write();
    if agent.is_some() {
        return Err(AttachError::AlreadyAttached);
    }

    let host = init_host(HostGlobals::new(params.module_base, params.ticks))?;

    let mut hook = RenderHook::new(params.locator, params.windows);
    if let Some(subclasser) = params.subclasser {
        hook = hook.with_subclasser(subclasser);
    }

    let capture = match init_singleton_with(hook) {
        Ok(capture) => capture,
        Err(e) => {
            teardown_host();
            return Err(e.into());
        }
    };

    let entities: Arc<EntityTable<usize>> = Arc::new(EntityTable::new());
    let scheduler = Arc::new(DeferredScheduler::new(
        Arc::clone(&host.ticks),
        entities.clone(),
    ));

    *agent = Some(Agent {
        scheduler,
        entities,
        _capture: capture,
    });

    tracing::info!(
        "Agent attached (module base {:#x}, tick {})",
        host.module_base,
        host.current_tick()
    );
    Ok(())
}

/// Detach the agent, removing all interception
///
/// # Returns
/// `true` if the agent was attached
pub fn detach() -> bool {
    let agent = AGENT.write().take();
    teardown(agent)
}

/// Detach from the loader's unload notification
///
/// Covers hosts that unload the library or exit without calling [`detach`].
/// Threads killed at process exit may still hold the agent lock, so the
/// lock is only waited on briefly.
///
/// # Returns
/// `true` if the agent was still attached
pub fn on_process_detach() -> bool {
    let Some(mut slot) = AGENT.try_write_for(PROCESS_DETACH_LOCK_TIMEOUT) else {
        tracing::error!("Agent lock held on unload; interception left installed");
        return false;
    };
    let agent = slot.take();
    drop(slot);

    if agent.is_some() {
        tracing::warn!("Library unloading while attached; detaching");
    }
    teardown(agent)
}

fn teardown(agent: Option<Agent>) -> bool {
    let Some(agent) = agent else {
        return false;
    };

    let pending = agent.scheduler.pending_total();
    if pending > 0 {
        tracing::debug!("Dropping {} pending deferred actions", pending);
    }

    drop(agent);
    teardown_host();

    tracing::info!("Agent detached");
    true
}

pub fn is_attached() -> bool {
    AGENT.read().is_some()
}

/// Deferred scheduler of the attached agent
pub fn scheduler() -> Option<Arc<DeferredScheduler>> {
    AGENT.read().as_ref().map(|agent| Arc::clone(&agent.scheduler))
}

/// Entity table of the attached agent
pub fn entities() -> Option<Arc<EntityTable<usize>>> {
    AGENT.read().as_ref().map(|agent| Arc::clone(&agent.entities))
}

/// Run due deferred actions; called once per host simulation step
///
/// Returns `None` when the agent is not attached.
pub fn simulation_step() -> Option<AdvanceStats> {
    // Callbacks may schedule again, so the agent lock is not held while they run
    let scheduler = scheduler()?;
    let stats = scheduler.advance();
    if stats.fired > 0 || stats.dropped > 0 {
        tracing::trace!(
            "Simulation step: {} fired, {} dropped",
            stats.fired,
            stats.dropped
        );
    }
    Some(stats)
}
