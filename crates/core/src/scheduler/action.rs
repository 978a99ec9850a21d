//! Deferred action storage

use std::collections::VecDeque;

use overlayhook_engine::Tick;

/// Queue a deferred action lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// No payload
    Plain,
    /// Bound to a weak entity reference; dropped if the entity is gone
    EntityBound,
    /// Bound to a coordinate snapshot; always fires
    PositionBound,
}

/// A callback waiting for its deadline
pub(crate) struct Deferred<P> {
    /// Absolute tick at or after which the callback fires
    pub deadline: Tick,
    /// Value captured when the action was scheduled
    pub payload: P,
    /// The callback to execute
    pub callback: Box<dyn FnOnce(P) + Send + 'static>,
}

impl<P> Deferred<P> {
    /// Create a deferred action, fixing its deadline from `now`
    pub fn new<F>(now: Tick, delay: Tick, payload: P, callback: F) -> Self
    where
        F: FnOnce(P) + Send + 'static,
    {
        Self {
            deadline: now.wrapping_add(delay),
            payload,
            callback: Box::new(callback),
        }
    }

    #[inline]
    pub fn is_due(&self, now: Tick) -> bool {
        now >= self.deadline
    }

    /// Consume the action and run its callback
    pub fn fire(self) {
        (self.callback)(self.payload)
    }
}

/// Pending actions of one kind, kept in scheduling order
pub(crate) struct ActionQueue<P> {
    pending: VecDeque<Deferred<P>>,
}

impl<P> ActionQueue<P> {
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    pub fn push(&mut self, action: Deferred<P>) {
        self.pending.push_back(action);
    }

    /// Remove and return every due action, preserving scheduling order for
    /// both the returned and the remaining actions
    pub fn take_due(&mut self, now: Tick) -> VecDeque<Deferred<P>> {
        if !self.pending.iter().any(|a| a.is_due(now)) {
            return VecDeque::new();
        }

        let (due, pending): (VecDeque<_>, VecDeque<_>) =
            self.pending.drain(..).partition(|a| a.is_due(now));
        self.pending = pending;
        due
    }

    /// Put back actions that were taken but not fired, ahead of the rest
    pub fn restore_front(&mut self, actions: VecDeque<Deferred<P>>) {
        for action in actions.into_iter().rev() {
            self.pending.push_front(action);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
