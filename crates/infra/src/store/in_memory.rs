use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use brewstock_core::{ExpectedVersion, Versioned};
use brewstock_events::{WatchHandle, WatchRegistry};

use super::query::{Query, SortOrder};
use super::r#trait::{Document, DocumentStore, MAX_BATCH_WRITES, StoreError, WatchCallback};

#[derive(Debug, Clone)]
struct Slot<D> {
    doc: D,
    version: u64,
    /// Insertion order; breaks ties between equal creation timestamps.
    seq: u64,
}

struct Watcher<D> {
    query: Query<D>,
    callback: WatchCallback<D>,
}

/// In-memory document collection.
///
/// Intended for tests/dev. Writes take the collection lock; watchers are
/// notified after the lock is released.
pub struct InMemoryDocumentStore<D: Document> {
    docs: RwLock<HashMap<D::Id, Slot<D>>>,
    next_seq: AtomicU64,
    watchers: WatchRegistry<Watcher<D>>,
    largest_batch: AtomicUsize,
}

impl<D: Document> core::fmt::Debug for InMemoryDocumentStore<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("documents", &self.len())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl<D: Document> Default for InMemoryDocumentStore<D> {
    fn default() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            watchers: WatchRegistry::new(),
            largest_batch: AtomicUsize::new(0),
        }
    }
}

impl<D: Document> InMemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the largest write batch committed so far.
    pub fn largest_batch(&self) -> usize {
        self.largest_batch.load(Ordering::Relaxed)
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    fn record_batch(&self, size: usize) {
        self.largest_batch.fetch_max(size, Ordering::Relaxed);
    }

    fn select(docs: &HashMap<D::Id, Slot<D>>, query: &Query<D>) -> Vec<D> {
        let mut rows: Vec<&Slot<D>> = docs.values().filter(|s| query.matches(&s.doc)).collect();
        rows.sort_by_key(|s| (s.doc.created_at(), s.seq));
        if query.order() == SortOrder::NewestFirst {
            rows.reverse();
        }
        if let Some(limit) = query.max_rows() {
            rows.truncate(limit);
        }
        rows.into_iter().map(|s| s.doc.clone()).collect()
    }

    fn notify(&self) {
        for watcher in self.watchers.snapshot() {
            match self.query(&watcher.query) {
                Ok(rows) => (watcher.callback)(&rows),
                Err(err) => tracing::warn!(error = %err, "skipping watcher notification"),
            }
        }
    }
}

impl<D: Document> DocumentStore<D> for InMemoryDocumentStore<D> {
    fn get(&self, id: &D::Id) -> Result<Option<Versioned<D>>, StoreError> {
        let docs = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(docs.get(id).map(|s| Versioned::new(s.doc.clone(), s.version)))
    }

    fn insert(&self, doc: D) -> Result<Versioned<D>, StoreError> {
        let committed = {
            let mut docs = self.docs.write().map_err(|_| StoreError::Poisoned)?;
            let id = doc.id().clone();
            if docs.contains_key(&id) {
                return Err(StoreError::AlreadyExists);
            }
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            docs.insert(
                id,
                Slot {
                    doc: doc.clone(),
                    version: 1,
                    seq,
                },
            );
            Versioned::new(doc, 1)
        };
        self.record_batch(1);
        self.notify();
        Ok(committed)
    }

    fn replace(&self, doc: D, expected: ExpectedVersion) -> Result<Versioned<D>, StoreError> {
        let committed = {
            let mut docs = self.docs.write().map_err(|_| StoreError::Poisoned)?;
            let slot = docs.get_mut(doc.id()).ok_or(StoreError::NotFound)?;
            if !expected.matches(slot.version) {
                return Err(StoreError::Concurrency(format!(
                    "expected {expected:?}, found {}",
                    slot.version
                )));
            }
            slot.version += 1;
            slot.doc = doc.clone();
            Versioned::new(doc, slot.version)
        };
        self.record_batch(1);
        self.notify();
        Ok(committed)
    }

    fn delete(&self, id: &D::Id) -> Result<bool, StoreError> {
        let removed = {
            let mut docs = self.docs.write().map_err(|_| StoreError::Poisoned)?;
            docs.remove(id).is_some()
        };
        if removed {
            self.record_batch(1);
            self.notify();
        }
        Ok(removed)
    }

    fn delete_batch(&self, ids: &[D::Id]) -> Result<usize, StoreError> {
        if ids.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                size: ids.len(),
                max: MAX_BATCH_WRITES,
            });
        }
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = {
            let mut docs = self.docs.write().map_err(|_| StoreError::Poisoned)?;
            ids.iter().filter(|id| docs.remove(*id).is_some()).count()
        };
        self.record_batch(ids.len());
        if removed > 0 {
            self.notify();
        }
        Ok(removed)
    }

    fn query(&self, query: &Query<D>) -> Result<Vec<D>, StoreError> {
        let docs = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Self::select(&docs, query))
    }

    fn watch(&self, query: Query<D>, callback: WatchCallback<D>) -> Result<WatchHandle, StoreError> {
        // Registered before the initial read so no write can slip between them.
        let watcher = std::sync::Arc::new(Watcher { query, callback });
        let handle = self.watchers.register(watcher.clone());
        let initial = self.query(&watcher.query)?;
        (watcher.callback)(&initial);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};

    use brewstock_core::Entity;
    use chrono::{DateTime, TimeZone, Utc};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: u32,
        label: &'static str,
        at: DateTime<Utc>,
    }

    impl Entity for Row {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    fn test_row(id: u32, minute: u32) -> Row {
        Row {
            id,
            label: "row",
            at: Utc.with_ymd_and_hms(2025, 3, 1, 8, minute, 0).unwrap(),
        }
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let store = InMemoryDocumentStore::<Row>::new();
        store.insert(test_row(1, 0)).unwrap();
        assert_eq!(store.insert(test_row(1, 0)), Err(StoreError::AlreadyExists));
    }

    #[test]
    fn replace_is_compare_and_set() {
        let store = InMemoryDocumentStore::<Row>::new();
        let v1 = store.insert(test_row(1, 0)).unwrap();
        assert_eq!(v1.version, 1);

        let mut changed = v1.value.clone();
        changed.label = "changed";
        let v2 = store.replace(changed.clone(), v1.expected()).unwrap();
        assert_eq!(v2.version, 2);

        let stale = store.replace(changed, ExpectedVersion::Exact(1));
        assert!(matches!(stale, Err(StoreError::Concurrency(_))));
        assert_eq!(store.get(&1).unwrap().unwrap().value.label, "changed");
    }

    #[test]
    fn replace_of_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::<Row>::new();
        assert_eq!(
            store.replace(test_row(9, 0), ExpectedVersion::Any),
            Err(StoreError::NotFound)
        );
    }

    #[test]
    fn query_orders_by_creation_then_insertion() {
        let store = InMemoryDocumentStore::<Row>::new();
        store.insert(test_row(1, 5)).unwrap();
        store.insert(test_row(2, 1)).unwrap();
        store.insert(test_row(3, 5)).unwrap();

        let newest: Vec<u32> = store.query(&Query::all()).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(newest, vec![3, 1, 2]);

        let oldest: Vec<u32> = store
            .query(&Query::oldest_first().limit(2))
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(oldest, vec![2, 1]);
    }

    #[test]
    fn delete_batch_enforces_write_limit() {
        let store = InMemoryDocumentStore::<Row>::new();
        let ids: Vec<u32> = (0..=MAX_BATCH_WRITES as u32).collect();
        assert_eq!(
            store.delete_batch(&ids),
            Err(StoreError::BatchTooLarge {
                size: MAX_BATCH_WRITES + 1,
                max: MAX_BATCH_WRITES
            })
        );

        store.insert(test_row(1, 0)).unwrap();
        assert_eq!(store.delete_batch(&[1, 2]).unwrap(), 1);
        assert!(store.is_empty());
        assert_eq!(store.largest_batch(), 2);
    }

    #[test]
    fn watch_pushes_snapshots_until_unsubscribed() {
        let store = InMemoryDocumentStore::<Row>::new();
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let handle = store
            .watch(
                Query::all(),
                Box::new(move |rows: &[Row]| sink.lock().unwrap().push(rows.len())),
            )
            .unwrap();
        store.insert(test_row(1, 0)).unwrap();
        store.insert(test_row(2, 0)).unwrap();
        handle.unsubscribe();
        store.insert(test_row(3, 0)).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(store.watcher_count(), 0);
    }

    #[test]
    fn write_during_initial_push_is_delivered() {
        let store = Arc::new(InMemoryDocumentStore::<Row>::new());
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let writer = Arc::downgrade(&store);
        let wrote = AtomicBool::new(false);

        let _handle = store
            .watch(
                Query::all(),
                Box::new(move |rows: &[Row]| {
                    sink.lock().unwrap().push(rows.len());
                    if !wrote.swap(true, Ordering::SeqCst) {
                        if let Some(store) = writer.upgrade() {
                            store.insert(test_row(1, 0)).unwrap();
                        }
                    }
                }),
            )
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
        assert_eq!(store.watcher_count(), 1);
    }
}
