//! Change listeners for the expense store
//!
//! A subscriber receives the full expense list once when it subscribes and
//! again after every successful write. Delivery stops when its
//! `Subscription` handle is dropped.
//!
//! Re-reading the list and delivering it happen under one publish lock, so
//! snapshots reach listeners in write order and the last one delivered is
//! always the latest. Callbacks therefore must not write to the store or
//! subscribe from inside the callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::models::Expense;

/// Callback invoked with a full snapshot of the expense list
pub type SnapshotCallback = Box<dyn Fn(&[Expense]) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, Arc<SnapshotCallback>>>,
    /// Held from reading a snapshot until it has been delivered
    publish: Mutex<()>,
}

impl Listeners {
    pub(crate) fn register(self: &Arc<Self>, callback: SnapshotCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, Arc::new(callback));

        Subscription {
            id,
            listeners: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id);
    }

    /// Serialize snapshot reads and deliveries
    pub(crate) fn publishing(&self) -> MutexGuard<'_, ()> {
        self.publish
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.callbacks
            .lock()
            .map(|callbacks| callbacks.is_empty())
            .unwrap_or(true)
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Deliver a snapshot to every listener
    ///
    /// Callbacks run outside the listener map lock so they may unsubscribe.
    pub(crate) fn notify(&self, snapshot: &[Expense]) {
        let callbacks: Vec<Arc<SnapshotCallback>> = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();

        for callback in callbacks {
            callback(snapshot);
        }
    }

    /// Deliver a snapshot to a single listener (initial delivery)
    pub(crate) fn notify_one(&self, id: u64, snapshot: &[Expense]) {
        let callback = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .cloned();

        if let Some(callback) = callback {
            callback(snapshot);
        }
    }
}

/// Handle for an active store subscription
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving snapshots
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
