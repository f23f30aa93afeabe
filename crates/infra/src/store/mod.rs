//! Document store boundary.
//!
//! The services only need a generic persistent store with point reads,
//! compare-and-set writes, bounded write batches, ordered queries and change
//! subscriptions. This module defines that contract without making storage
//! assumptions, plus an in-memory implementation for tests/dev.

pub mod in_memory;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use query::{Query, SortOrder};
pub use r#trait::{Document, DocumentStore, MAX_BATCH_WRITES, StoreError, WatchCallback};
