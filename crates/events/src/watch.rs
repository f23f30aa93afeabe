//! Callback subscriptions with explicit teardown.
//!
//! A [`WatchRegistry`] holds listeners keyed by a registration id. Registering
//! returns a [`WatchHandle`]; calling [`WatchHandle::unsubscribe`] (or dropping
//! the handle) removes the listener so it is never invoked again. Every
//! subscribe must be paired with the consumer's teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Registry of live listeners of type `L` (typically a boxed callback plus
/// whatever the publisher needs to evaluate it, e.g. a query).
pub struct WatchRegistry<L: ?Sized> {
    next_id: AtomicU64,
    entries: Arc<Mutex<Vec<(u64, Arc<L>)>>>,
}

impl<L: ?Sized> core::fmt::Debug for WatchRegistry<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let listeners = self.entries.lock().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("WatchRegistry").field("listeners", &listeners).finish()
    }
}

impl<L: ?Sized> Default for WatchRegistry<L> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<L: ?Sized + Send + Sync + 'static> WatchRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. The listener stays live until the handle is
    /// unsubscribed or dropped.
    pub fn register(&self, listener: Arc<L>) -> WatchHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((id, listener));
        }

        let weak: Weak<Mutex<Vec<(u64, Arc<L>)>>> = Arc::downgrade(&self.entries);
        WatchHandle {
            id,
            cancel: Some(Box::new(move || {
                if let Some(entries) = weak.upgrade() {
                    if let Ok(mut entries) = entries.lock() {
                        entries.retain(|(eid, _)| *eid != id);
                    }
                }
            })),
        }
    }

    /// Copy of the live listeners. Callers invoke them without holding the
    /// registry lock, so a listener may itself subscribe or unsubscribe.
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.entries
            .lock()
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Teardown handle returned by every subscribe call.
pub struct WatchHandle {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    /// A handle that owns no registration (used when nothing was subscribed).
    pub fn detached() -> Self {
        Self { id: 0, cancel: None }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// One handle owning both registrations; tearing it down releases both.
    pub fn combine(mut self, mut other: WatchHandle) -> WatchHandle {
        let first = self.cancel.take();
        let second = other.cancel.take();
        WatchHandle {
            id: self.id,
            cancel: Some(Box::new(move || {
                if let Some(cancel) = first {
                    cancel();
                }
                if let Some(cancel) = second {
                    cancel();
                }
            })),
        }
    }

    /// Stop receiving updates and release the registration.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl core::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Listener = dyn Fn(u32) + Send + Sync;

    #[test]
    fn unsubscribe_removes_listener() {
        let registry: WatchRegistry<Listener> = WatchRegistry::new();
        let handle = registry.register(Arc::new(|_n: u32| {}));
        assert_eq!(registry.len(), 1);

        handle.unsubscribe();
        assert!(registry.is_empty());
    }

    #[test]
    fn dropping_the_handle_also_tears_down() {
        let registry: WatchRegistry<Listener> = WatchRegistry::new();
        {
            let _handle = registry.register(Arc::new(|_n: u32| {}));
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn combined_handle_releases_both_registrations() {
        let left: WatchRegistry<Listener> = WatchRegistry::new();
        let right: WatchRegistry<Listener> = WatchRegistry::new();
        let handle = left
            .register(Arc::new(|_n: u32| {}))
            .combine(right.register(Arc::new(|_n: u32| {})));
        assert_eq!(left.len() + right.len(), 2);

        handle.unsubscribe();
        assert!(left.is_empty() && right.is_empty());
    }

    #[test]
    fn debug_reports_listener_count() {
        let registry: WatchRegistry<Listener> = WatchRegistry::new();
        let _handle = registry.register(Arc::new(|_n: u32| {}));
        assert_eq!(format!("{registry:?}"), "WatchRegistry { listeners: 1 }");
    }

    #[test]
    fn handle_outliving_registry_is_harmless() {
        let registry: WatchRegistry<Listener> = WatchRegistry::new();
        let handle = registry.register(Arc::new(|_n: u32| {}));
        drop(registry);
        handle.unsubscribe();
    }

    #[test]
    fn snapshot_invokes_outside_the_lock() {
        let registry: Arc<WatchRegistry<Listener>> = Arc::new(WatchRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let reg2 = registry.clone();
        let _h = registry.register(Arc::new(move |n: u32| {
            // Re-entrant read of the registry must not deadlock.
            let _ = reg2.len();
            seen2.lock().unwrap().push(n);
        }));

        for l in registry.snapshot() {
            l(7);
        }
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }
}
