//! Capture lifecycle, per-frame and window message listeners
//!
//! Listeners follow the registry pattern used throughout the crate:
//! callbacks are stored in a slot map and removed by key. They run
//! synchronously on the host's render thread, so they must not block.
//!
//! Callbacks are invoked on a snapshot of the registry, so a listener may
//! register or remove listeners (itself included) while it runs.

use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use overlayhook_sdk::WindowMessage;

use super::device::CapturedDevice;

new_key_type! {
    /// Key for registered capture listeners, used for removal
    pub struct CaptureListenerKey;
}

/// Capture lifecycle notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// First successful capture
    Captured(CapturedDevice),
    /// The device became unusable; release everything created against it
    Lost {
        /// Generation of the capture that is no longer valid
        generation: u64,
    },
    /// A device was captured again after a loss
    Restored(CapturedDevice),
}

pub type CaptureCallback = Arc<dyn Fn(&CaptureEvent) + Send + Sync>;
pub type PresentCallback = Arc<dyn Fn(&CapturedDevice) + Send + Sync>;

/// Returns `Some(result)` to consume the message
pub type MessageCallback = Arc<dyn Fn(&WindowMessage) -> Option<isize> + Send + Sync>;

enum Listener {
    Capture(CaptureCallback),
    Present(PresentCallback),
    Message(MessageCallback),
}

/// Listener registry owned by one render hook
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: RwLock<SlotMap<CaptureListenerKey, Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_capture(&self, callback: CaptureCallback) -> CaptureListenerKey {
        self.listeners.write().insert(Listener::Capture(callback))
    }

    pub fn on_present(&self, callback: PresentCallback) -> CaptureListenerKey {
        self.listeners.write().insert(Listener::Present(callback))
    }

    pub fn on_message(&self, callback: MessageCallback) -> CaptureListenerKey {
        self.listeners.write().insert(Listener::Message(callback))
    }

    pub fn remove(&self, key: CaptureListenerKey) -> bool {
        self.listeners.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Fire all capture callbacks
    pub fn fire_capture(&self, event: &CaptureEvent) {
        let callbacks: Vec<CaptureCallback> = self
            .listeners
            .read()
            .values()
            .filter_map(|listener| match listener {
                Listener::Capture(callback) => Some(Arc::clone(callback)),
                _ => None,
            })
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    /// Fire all present callbacks
    pub fn fire_present(&self, device: &CapturedDevice) {
        let callbacks: Vec<PresentCallback> = self
            .listeners
            .read()
            .values()
            .filter_map(|listener| match listener {
                Listener::Present(callback) => Some(Arc::clone(callback)),
                _ => None,
            })
            .collect();

        for callback in callbacks {
            callback(device);
        }
    }

    /// Offer a window message to the message callbacks
    ///
    /// Stops at the first callback that consumes it and returns its result.
    pub fn fire_message(&self, message: &WindowMessage) -> Option<isize> {
        let callbacks: Vec<MessageCallback> = self
            .listeners
            .read()
            .values()
            .filter_map(|listener| match listener {
                Listener::Message(callback) => Some(Arc::clone(callback)),
                _ => None,
            })
            .collect();

        callbacks.into_iter().find_map(|callback| callback(message))
    }
}
