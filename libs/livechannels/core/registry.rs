//! Subscription registry and derived channel set
//!
//! The registry is the single owner of all live subscriptions. The channel
//! set is derived state: it always equals the union of the channel lists of
//! the live subscriptions and is recomputed on every mutation.
//!
//! All mutations go through one `parking_lot::Mutex`, so a dispose is
//! visible to the very next dispatch that checks eligibility.

use crate::core::protocol::RawEvent;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Type-erased dispatcher stored per subscription
///
/// Built at subscribe time; decodes the raw payload into the subscription's
/// payload type and invokes the callback. Decode failures are handled inside
/// the dispatcher so one subscription can never suppress delivery to others.
pub type Dispatcher = Arc<dyn Fn(&RawEvent) + Send + Sync>;

struct Entry {
    channels: Vec<String>,
    dispatch: Dispatcher,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    // BTreeMap keyed by the monotonic id preserves registration order for fan-out
    entries: BTreeMap<u64, Entry>,
    active: BTreeSet<String>,
}

impl Inner {
    fn recompute_active(&mut self) {
        self.active = self
            .entries
            .values()
            .flat_map(|entry| entry.channels.iter().cloned())
            .collect();
    }
}

/// Registry of live subscriptions plus the derived channel set
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Inner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription; returns its fresh counter-based id
    pub fn insert(&self, channels: Vec<String>, dispatch: Dispatcher) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.active.extend(channels.iter().cloned());
        inner.entries.insert(id, Entry { channels, dispatch });
        id
    }

    /// Remove a subscription and drop any channel no longer referenced
    ///
    /// Idempotent: removing an unknown or already-removed id is a no-op and
    /// returns false.
    pub fn remove(&self, id: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.entries.remove(&id).is_none() {
            return false;
        }
        inner.recompute_active();
        true
    }

    /// Snapshot of the channel set, in stable (sorted) iteration order
    pub fn active_channels(&self) -> Vec<String> {
        self.inner.lock().active.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn channel_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Fan an event out to every subscription whose channel list intersects
    /// the event's channels; returns the number of subscriptions notified
    ///
    /// Events with no channels, or whose channels are all no longer active
    /// (stale events for already-unsubscribed channels), are dropped.
    ///
    /// Matching dispatchers are snapshotted under the lock and invoked after
    /// releasing it, in registration order, so callbacks are free to
    /// subscribe or dispose without deadlocking.
    pub fn dispatch(&self, event: &RawEvent) -> usize {
        if event.channels.is_empty() {
            return 0;
        }

        let targets: Vec<Dispatcher> = {
            let inner = self.inner.lock();
            if !event.channels.iter().any(|c| inner.active.contains(c)) {
                return 0;
            }
            inner
                .entries
                .values()
                .filter(|entry| {
                    event
                        .channels
                        .iter()
                        .any(|c| entry.channels.iter().any(|sc| sc == c))
                })
                .map(|entry| Arc::clone(&entry.dispatch))
                .collect()
        };

        for dispatch in &targets {
            dispatch(event);
        }
        targets.len()
    }
}
