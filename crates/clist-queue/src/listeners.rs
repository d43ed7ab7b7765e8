#![forbid(unsafe_code)]

//! Explicit callback registry.
//!
//! Collaborators that want to know when a reconciliation cycle has been
//! applied register a callback and receive a [`ListenerId`] to unregister
//! with on teardown. This keeps lifetime ownership explicit: no notification
//! center, no weak-reference magic.
//!
//! # Invariants
//!
//! 1. Callbacks run in registration order.
//! 2. Unregistration takes effect before the next `emit`.
//! 3. Callbacks are invoked outside the registry lock, so a callback may
//!    register or unregister listeners without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle for unregistering a callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Thread-safe registry of `Fn(&T)` callbacks.
pub struct Listeners<T> {
    entries: Mutex<Vec<(ListenerId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Listeners<T> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback; returns the id to unregister with.
    pub fn register(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .expect("listener registry lock poisoned")
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Removing an unknown id is a no-op.
    pub fn unregister(&self, id: ListenerId) {
        self.entries
            .lock()
            .expect("listener registry lock poisoned")
            .retain(|(entry_id, _)| *entry_id != id);
    }

    /// Invoke every registered callback with `event`, in registration order.
    pub fn emit(&self, event: &T) {
        // Clone the callbacks out so a callback can mutate the registry.
        let callbacks: Vec<Callback<T>> = self
            .entries
            .lock()
            .expect("listener registry lock poisoned")
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("listener registry lock poisoned")
            .len()
    }

    /// Whether no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}
