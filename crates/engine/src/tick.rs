//! Host simulation clock
//!
//! The host advances a tick counter once per simulation step. The agent never
//! advances it; it only reads the current value.

use std::sync::atomic::{AtomicI32, Ordering};

/// One discrete unit of the host's simulation clock
///
/// Matches the host's `int` tick count. Overflow wraps and is not handled
/// specially.
pub type Tick = i32;

/// Source of the current host tick
pub trait TickSource: Send + Sync {
    /// Current tick count, monotonically non-decreasing
    fn current_tick(&self) -> Tick;
}

/// Host function returning the current tick count
pub type TickCountFn = unsafe extern "C" fn() -> Tick;

/// Tick source backed by a function exported by the host
pub struct HostTickFn {
    func: TickCountFn,
}

impl HostTickFn {
    /// Wrap a host tick function
    ///
    /// # Safety
    /// `func` must stay callable for the lifetime of this value and be safe
    /// to call from the simulation thread.
    pub unsafe fn new(func: TickCountFn) -> Self {
        Self { func }
    }
}

impl TickSource for HostTickFn {
    #[inline]
    fn current_tick(&self) -> Tick {
        // SAFETY: Guaranteed callable by the contract of `HostTickFn::new`
        unsafe { (self.func)() }
    }
}

/// Tick source advanced explicitly by its owner
///
/// Used when the host pushes ticks to the agent instead of exposing a
/// function, and by tests.
#[derive(Debug, Default)]
pub struct ManualTickSource {
    tick: AtomicI32,
}

impl ManualTickSource {
    pub const fn new(start: Tick) -> Self {
        Self {
            tick: AtomicI32::new(start),
        }
    }

    /// Set the current tick
    pub fn set(&self, tick: Tick) {
        self.tick.store(tick, Ordering::Release);
    }

    /// Advance by `ticks` and return the new value
    pub fn advance(&self, ticks: Tick) -> Tick {
        self.tick.fetch_add(ticks, Ordering::AcqRel).wrapping_add(ticks)
    }
}

impl TickSource for ManualTickSource {
    #[inline]
    fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::Acquire)
    }
}
