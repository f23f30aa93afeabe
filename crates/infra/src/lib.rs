//! Infrastructure layer: document store, services, configuration.

pub mod catalog;
pub mod config;
pub mod ledger;
pub mod lot_aggregator;
pub mod progress;
pub mod service;
pub mod store;
pub mod transaction;


pub use catalog::Catalog;
pub use config::{InventoryConfig, MovementRetention};
pub use ledger::{Adjustment, BatchOutcome, HistoryCallback, Ledger, MovementStore, ProductStore, SharedClock};
pub use lot_aggregator::{IntakeReport, LotAggregator, LotItemStore, LotStore};
pub use progress::{CascadeProgress, IntakeProgress, PurgeProgress};
pub use service::{InventoryService, Stores};
pub use store::{Document, DocumentStore, InMemoryDocumentStore, MAX_BATCH_WRITES, Query, SortOrder, StoreError};
