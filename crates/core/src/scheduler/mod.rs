//! Deferred actions driven by the host simulation clock
//!
//! The scheduler has no timer thread. The owner of the tick source calls
//! [`DeferredScheduler::advance`] once per simulation step and every action
//! whose deadline has been reached fires on that call.
//!
//! Three independent queues exist, one per payload shape:
//! - Plain actions take no arguments
//! - Entity-bound actions receive their [`EntityKey`] and are silently dropped
//!   if the entity is gone by the time they are due
//! - Position-bound actions receive the coordinate captured at scheduling
//!   time and always fire
//!
//! Within one `advance` call, due actions of a queue fire in the order they
//! were scheduled. Queues are processed plain, entity-bound, position-bound.
//!
//! # Example
//!
//! ```ignore
//! use overlayhook_core::scheduler::DeferredScheduler;
//!
//! let scheduler = DeferredScheduler::new(ticks, entities.clone());
//!
//! // Fire 30 ticks from now
//! scheduler.schedule(30, || tracing::info!("half a second later"));
//!
//! // Only fires if the hero still exists
//! scheduler.schedule_entity_bound(10, hero, |hero| highlight(hero));
//!
//! // Every simulation step:
//! scheduler.advance();
//! ```

mod action;

use std::collections::VecDeque;
use std::sync::Arc;

use overlayhook_engine::{Tick, TickSource};
use overlayhook_sdk::Vector3;
use parking_lot::Mutex;

use crate::entities::{EntityKey, EntityLookup};

pub use action::ActionKind;
use action::{ActionQueue, Deferred};

/// Outcome of one [`DeferredScheduler::advance`] call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceStats {
    /// Callbacks invoked
    pub fired: usize,
    /// Entity-bound actions dropped because their entity was gone
    pub dropped: usize,
}

/// Tick-based deferred action scheduler
pub struct DeferredScheduler {
    ticks: Arc<dyn TickSource>,
    entities: Arc<dyn EntityLookup>,
    plain: Mutex<ActionQueue<()>>,
    entity_bound: Mutex<ActionQueue<EntityKey>>,
    position_bound: Mutex<ActionQueue<Vector3>>,
}

impl DeferredScheduler {
    /// Create a scheduler reading deadlines from `ticks` and resolving
    /// entity-bound actions through `entities`
    pub fn new(ticks: Arc<dyn TickSource>, entities: Arc<dyn EntityLookup>) -> Self {
        Self {
            ticks,
            entities,
            plain: Mutex::new(ActionQueue::new()),
            entity_bound: Mutex::new(ActionQueue::new()),
            position_bound: Mutex::new(ActionQueue::new()),
        }
    }

    /// Current tick of the underlying source
    #[inline]
    pub fn current_tick(&self) -> Tick {
        self.ticks.current_tick()
    }

    /// Run `callback` once `delay` ticks have elapsed
    ///
    /// A delay of zero or less fires on the next [`advance`](Self::advance),
    /// never synchronously.
    pub fn schedule<F>(&self, delay: Tick, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let action = Deferred::new(self.current_tick(), delay, (), move |()| callback());
        self.plain.lock().push(action);
    }

    /// Run `callback` with `entity` once `delay` ticks have elapsed, if the
    /// entity still exists then
    pub fn schedule_entity_bound<F>(&self, delay: Tick, entity: EntityKey, callback: F)
    where
        F: FnOnce(EntityKey) + Send + 'static,
    {
        let action = Deferred::new(self.current_tick(), delay, entity, callback);
        self.entity_bound.lock().push(action);
    }

    /// Run `callback` with a copy of `position` once `delay` ticks have elapsed
    pub fn schedule_position_bound<F>(&self, delay: Tick, position: Vector3, callback: F)
    where
        F: FnOnce(Vector3) + Send + 'static,
    {
        let action = Deferred::new(self.current_tick(), delay, position, callback);
        self.position_bound.lock().push(action);
    }

    /// Fire every action whose deadline has been reached
    ///
    /// Each action is removed from the pending set before its callback runs,
    /// so a panicking callback is never invoked again. The panic propagates
    /// to the caller; due actions that had not fired yet stay pending.
    ///
    /// Actions scheduled from inside a callback fire on a later call.
    pub fn advance(&self) -> AdvanceStats {
        let now = self.current_tick();
        let mut stats = AdvanceStats::default();

        drain_due(&self.plain, now, |action| {
            action.fire();
            stats.fired += 1;
        });

        let entities = &self.entities;
        drain_due(&self.entity_bound, now, |action| {
            if entities.is_alive(action.payload) {
                action.fire();
                stats.fired += 1;
            } else {
                stats.dropped += 1;
            }
        });

        drain_due(&self.position_bound, now, |action| {
            action.fire();
            stats.fired += 1;
        });

        if stats.dropped > 0 {
            tracing::trace!(
                "Dropped {} entity-bound actions at tick {}",
                stats.dropped,
                now
            );
        }

        stats
    }

    /// Number of pending actions of `kind`
    pub fn pending(&self, kind: ActionKind) -> usize {
        match kind {
            ActionKind::Plain => self.plain.lock().len(),
            ActionKind::EntityBound => self.entity_bound.lock().len(),
            ActionKind::PositionBound => self.position_bound.lock().len(),
        }
    }

    /// Number of pending actions across all queues
    pub fn pending_total(&self) -> usize {
        self.pending(ActionKind::Plain)
            + self.pending(ActionKind::EntityBound)
            + self.pending(ActionKind::PositionBound)
    }
}

/// Due actions taken out of a queue but not yet handled
///
/// Returns leftovers to the queue if a callback unwinds.
struct TakenActions<'a, P> {
    queue: &'a Mutex<ActionQueue<P>>,
    due: VecDeque<Deferred<P>>,
}

impl<P> Drop for TakenActions<'_, P> {
    fn drop(&mut self) {
        if !self.due.is_empty() {
            let leftovers = std::mem::take(&mut self.due);
            self.queue.lock().restore_front(leftovers);
        }
    }
}

/// Take the due actions out of `queue` and hand them to `handle` in order,
/// with the queue lock released
fn drain_due<P>(
    queue: &Mutex<ActionQueue<P>>,
    now: Tick,
    mut handle: impl FnMut(Deferred<P>),
) {
    let due = queue.lock().take_due(now);
    let mut taken = TakenActions { queue, due };
    while let Some(action) = taken.due.pop_front() {
        handle(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityTable;
    use overlayhook_engine::ManualTickSource;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    struct Fixture {
        ticks: Arc<ManualTickSource>,
        entities: Arc<EntityTable<&'static str>>,
        scheduler: DeferredScheduler,
        log: Arc<Mutex<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let ticks = Arc::new(ManualTickSource::new(0));
        let entities = Arc::new(EntityTable::new());
        let scheduler = DeferredScheduler::new(ticks.clone(), entities.clone());
        Fixture {
            ticks,
            entities,
            scheduler,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    impl Fixture {
        fn record(&self, name: &str) -> impl FnOnce() + Send + 'static {
            let log = self.log.clone();
            let name = name.to_string();
            move || log.lock().push(name)
        }

        fn fired(&self) -> Vec<String> {
            self.log.lock().clone()
        }
    }

    #[test]
    fn test_zero_delay_fires_once_on_next_advance() {
        let f = fixture();
        f.scheduler.schedule(0, f.record("now"));
        assert!(f.fired().is_empty(), "must not fire synchronously");

        assert_eq!(f.scheduler.advance().fired, 1);
        assert_eq!(f.fired(), vec!["now"]);

        assert_eq!(f.scheduler.advance().fired, 0);
        assert_eq!(f.fired(), vec!["now"]);
        assert_eq!(f.scheduler.pending_total(), 0);
    }

    #[test]
    fn test_negative_delay_fires_on_next_advance() {
        let f = fixture();
        f.ticks.set(50);
        f.scheduler.schedule(-10, f.record("late"));
        f.scheduler.advance();
        assert_eq!(f.fired(), vec!["late"]);
    }

    #[test]
    fn test_earlier_deadline_fires_first_across_ticks() {
        let f = fixture();
        f.scheduler.schedule(5, f.record("A"));
        f.scheduler.schedule(3, f.record("B"));
        f.scheduler.schedule(5, f.record("C"));

        for tick in 0..=5 {
            f.ticks.set(tick);
            f.scheduler.advance();
        }

        assert_eq!(f.fired(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_single_advance_fires_in_scheduling_order() {
        let f = fixture();
        f.scheduler.schedule(5, f.record("A"));
        f.scheduler.schedule(3, f.record("B"));
        f.scheduler.schedule(5, f.record("C"));

        f.ticks.set(5);
        f.scheduler.advance();
        assert_eq!(f.fired(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_deadline_fixed_at_scheduling_time() {
        let f = fixture();
        f.ticks.set(100);
        f.scheduler.schedule(10, f.record("x"));

        f.ticks.set(109);
        f.scheduler.advance();
        assert!(f.fired().is_empty());

        f.ticks.set(110);
        f.scheduler.advance();
        assert_eq!(f.fired(), vec!["x"]);
    }

    #[test]
    fn test_not_due_action_stays_pending() {
        let f = fixture();
        f.scheduler.schedule(1_000, f.record("far"));
        for _ in 0..10 {
            f.ticks.advance(1);
            f.scheduler.advance();
        }
        assert_eq!(f.scheduler.pending(ActionKind::Plain), 1);
        assert!(f.fired().is_empty());
    }

    #[test]
    fn test_invalidated_entity_is_dropped_silently() {
        let f = fixture();
        let hero = f.entities.insert("hero");
        let calls = Arc::new(Mutex::new(0));

        let c = calls.clone();
        f.scheduler.schedule_entity_bound(4, hero, move |_| *c.lock() += 1);

        f.entities.remove(hero);
        f.ticks.set(3);
        assert_eq!(f.scheduler.advance(), AdvanceStats::default());
        assert_eq!(f.scheduler.pending(ActionKind::EntityBound), 1);

        f.ticks.set(4);
        let stats = f.scheduler.advance();
        assert_eq!(stats, AdvanceStats { fired: 0, dropped: 1 });
        assert_eq!(*calls.lock(), 0);
        assert_eq!(f.scheduler.pending(ActionKind::EntityBound), 0);
    }

    #[test]
    fn test_live_entity_receives_its_key() {
        let f = fixture();
        let hero = f.entities.insert("hero");
        let seen = Arc::new(Mutex::new(None));

        let s = seen.clone();
        let entities = f.entities.clone();
        f.scheduler.schedule_entity_bound(1, hero, move |key| {
            *s.lock() = entities.get(key);
        });

        f.ticks.set(1);
        f.scheduler.advance();
        assert_eq!(*seen.lock(), Some("hero"));
    }

    #[test]
    fn test_position_snapshot_always_fires() {
        let f = fixture();
        let seen = Arc::new(Mutex::new(None));

        let mut position = Vector3::new(1.0, 2.0, 3.0);
        let s = seen.clone();
        f.scheduler
            .schedule_position_bound(2, position, move |p| *s.lock() = Some(p));
        position.x = 99.0;

        f.ticks.set(2);
        assert_eq!(f.scheduler.advance().fired, 1);
        assert_eq!(*seen.lock(), Some(Vector3::new(1.0, 2.0, 3.0)));
        assert_ne!(position.x, 1.0);
    }

    #[test]
    fn test_queues_are_independent() {
        let f = fixture();
        let hero = f.entities.insert("hero");
        let log = f.log.clone();
        f.scheduler.schedule_position_bound(0, Vector3::ZERO, {
            let log = log.clone();
            move |_| log.lock().push("position".into())
        });
        f.scheduler.schedule_entity_bound(0, hero, {
            let log = log.clone();
            move |_| log.lock().push("entity".into())
        });
        f.scheduler.schedule(0, f.record("plain"));

        assert_eq!(f.scheduler.advance().fired, 3);
        let mut fired = f.fired();
        fired.sort();
        assert_eq!(fired, vec!["entity", "plain", "position"]);
    }

    #[test]
    fn test_panicking_callback_is_not_refired() {
        let f = fixture();
        f.scheduler.schedule(0, || panic!("callback failure"));
        f.scheduler.schedule(0, f.record("after"));

        let result = catch_unwind(AssertUnwindSafe(|| f.scheduler.advance()));
        assert!(result.is_err());
        assert!(f.fired().is_empty());
        assert_eq!(f.scheduler.pending(ActionKind::Plain), 1);

        assert_eq!(f.scheduler.advance().fired, 1);
        assert_eq!(f.fired(), vec!["after"]);
        assert_eq!(f.scheduler.advance().fired, 0);
    }

    #[test]
    fn test_schedule_from_callback_fires_next_advance() {
        let f = Arc::new(fixture());
        let inner = f.clone();
        f.scheduler.schedule(0, move || {
            let record = inner.record("nested");
            inner.scheduler.schedule(0, record);
        });

        assert_eq!(f.scheduler.advance().fired, 1);
        assert!(f.fired().is_empty());
        assert_eq!(f.scheduler.advance().fired, 1);
        assert_eq!(f.fired(), vec!["nested"]);
    }
}
