use std::sync::Arc;

use thiserror::Error;

use brewstock_core::{DomainError, Entity, ExpectedVersion, Versioned};
use brewstock_events::WatchHandle;

use super::query::Query;

/// Largest number of writes a single batch may carry.
pub const MAX_BATCH_WRITES: usize = 500;

/// Anything a [`DocumentStore`] can hold: an entity with an id and a creation
/// timestamp that can be cloned into snapshots and shared across threads.
pub trait Document: Entity<Id: Send + Sync + 'static> + Clone + Send + Sync + 'static {}

impl<T> Document for T where T: Entity<Id: Send + Sync + 'static> + Clone + Send + Sync + 'static {}

/// Callback invoked with the current matching set of a watched query.
pub type WatchCallback<D> = Box<dyn Fn(&[D]) + Send + Sync>;

/// Store operation error.
///
/// These are infrastructure errors (missing rows, lost races, batch limits) as
/// opposed to domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("document already exists")]
    AlreadyExists,

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("write batch of {size} exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => DomainError::NotFound,
            StoreError::Concurrency(msg) => DomainError::Conflict(msg),
            other => DomainError::Storage(other.to_string()),
        }
    }
}

/// Collection-scoped document store.
///
/// Implementations must:
/// - assign version 1 on insert and bump the version on every replace
/// - reject a replace whose `ExpectedVersion` does not match (compare-and-set)
/// - apply `delete_batch` atomically and reject batches above [`MAX_BATCH_WRITES`]
/// - notify every live watcher after each committed write, never while holding
///   internal locks
pub trait DocumentStore<D: Document>: Send + Sync {
    fn get(&self, id: &D::Id) -> Result<Option<Versioned<D>>, StoreError>;

    /// Insert a new document; fails with `AlreadyExists` if the id is taken.
    fn insert(&self, doc: D) -> Result<Versioned<D>, StoreError>;

    /// Compare-and-set write of an existing document.
    fn replace(&self, doc: D, expected: ExpectedVersion) -> Result<Versioned<D>, StoreError>;

    /// Returns whether a document was removed.
    fn delete(&self, id: &D::Id) -> Result<bool, StoreError>;

    /// Delete up to [`MAX_BATCH_WRITES`] documents in one atomic batch.
    /// Missing ids are skipped. Returns the number removed.
    fn delete_batch(&self, ids: &[D::Id]) -> Result<usize, StoreError>;

    fn query(&self, query: &Query<D>) -> Result<Vec<D>, StoreError>;

    /// Subscribe to a query. `callback` is invoked immediately with the
    /// current matching set and again after every write, until the handle is
    /// unsubscribed or dropped.
    fn watch(&self, query: Query<D>, callback: WatchCallback<D>) -> Result<WatchHandle, StoreError>;
}

impl<D, S> DocumentStore<D> for Arc<S>
where
    D: Document,
    S: DocumentStore<D> + ?Sized,
{
    fn get(&self, id: &D::Id) -> Result<Option<Versioned<D>>, StoreError> {
        (**self).get(id)
    }

    fn insert(&self, doc: D) -> Result<Versioned<D>, StoreError> {
        (**self).insert(doc)
    }

    fn replace(&self, doc: D, expected: ExpectedVersion) -> Result<Versioned<D>, StoreError> {
        (**self).replace(doc, expected)
    }

    fn delete(&self, id: &D::Id) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn delete_batch(&self, ids: &[D::Id]) -> Result<usize, StoreError> {
        (**self).delete_batch(ids)
    }

    fn query(&self, query: &Query<D>) -> Result<Vec<D>, StoreError> {
        (**self).query(query)
    }

    fn watch(&self, query: Query<D>, callback: WatchCallback<D>) -> Result<WatchHandle, StoreError> {
        (**self).watch(query, callback)
    }
}
