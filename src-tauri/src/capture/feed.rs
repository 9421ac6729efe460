//! In-process delivery of finished capture areas.
//!
//! Listeners hold a [`Subscription`]; dropping it (or calling `cancel`)
//! removes the listener. A subscription that outlives the feed is harmless.

use super::geometry::CaptureArea;
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn(CaptureArea) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Clone, Default)]
pub struct AreaFeed {
    inner: Arc<Mutex<Listeners>>,
}

impl AreaFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(CaptureArea) + Send + Sync + 'static,
    {
        let mut listeners = crate::lock(&self.inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            feed: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `area` to every listener. Returns how many were called.
    pub fn publish(&self, area: CaptureArea) -> usize {
        // Snapshot so a listener may subscribe or cancel without deadlocking.
        let snapshot: Vec<Listener> = crate::lock(&self.inner)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in &snapshot {
            listener(area);
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        crate::lock(&self.inner).entries.len()
    }
}

/// Handle for one listener on an [`AreaFeed`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    feed: Weak<Mutex<Listeners>>,
    id: u64,
}

impl Subscription {
    pub fn cancel(self) {
        drop(self);
    }

    fn remove(&self) {
        if let Some(feed) = self.feed.upgrade() {
            crate::lock(&feed).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
