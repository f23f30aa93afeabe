//! Lot Aggregator: group intake into the catalog plus the lot item log.
//!
//! None of the multi-step operations here are atomic. Each step re-reads
//! remaining state, so a failed or interrupted run can simply be retried.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use brewstock_core::{DomainError, DomainResult, LotId, ProductId};
use brewstock_events::WatchHandle;
use brewstock_lots::{ItemInput, Lot, LotHeader, LotItem, LotTarget};

use crate::catalog::Catalog;
use crate::config::InventoryConfig;
use crate::ledger::SharedClock;
use crate::progress::{CascadeProgress, IntakeProgress, PurgeProgress};
use crate::store::{DocumentStore, Query, WatchCallback};
use crate::transaction::run_transaction;

pub type LotStore = Arc<dyn DocumentStore<Lot>>;
pub type LotItemStore = Arc<dyn DocumentStore<LotItem>>;

/// Outcome of a fully successful bulk intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeReport {
    pub lot_id: LotId,
    /// Products created, in input order.
    pub created: Vec<ProductId>,
    pub progress: IntakeProgress,
}

pub struct LotAggregator {
    lots: LotStore,
    items: LotItemStore,
    catalog: Arc<Catalog>,
    clock: SharedClock,
    config: InventoryConfig,
}

impl core::fmt::Debug for LotAggregator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LotAggregator")
            .field("cascade_page_size", &self.config.cascade_page_size)
            .field("purge_batch_size", &self.config.purge_batch_size)
            .finish()
    }
}

impl LotAggregator {
    pub fn new(
        lots: LotStore,
        items: LotItemStore,
        catalog: Arc<Catalog>,
        clock: SharedClock,
        config: InventoryConfig,
    ) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            lots,
            items,
            catalog,
            clock,
            config,
        })
    }

    /// Insert a lot header with `items_count = 0`.
    pub fn create_lot(&self, header: LotHeader) -> DomainResult<LotId> {
        let lot = header.into_lot(LotId::new(), self.clock.now())?;
        let id = lot.id;
        self.lots.insert(lot)?;
        info!(lot_id = %id, "lot created");
        Ok(id)
    }

    /// Create one product per item and log them under a new or existing lot.
    ///
    /// Items inherit the lot's expiry date and lot number when they carry
    /// none. Every item is attempted even after a failure; the created ones
    /// are logged as lot items and `items_count` is refreshed before a
    /// `PartialBatchFailure` is reported.
    pub fn bulk_intake(&self, target: LotTarget, items: Vec<ItemInput>) -> DomainResult<IntakeReport> {
        if items.is_empty() {
            return Err(DomainError::invalid_input("bulk intake needs at least one item"));
        }
        let now = self.clock.now();
        let (lot, is_new) = match target {
            LotTarget::New { header } => (header.into_lot(LotId::new(), now)?, true),
            LotTarget::Existing { lot_id } => (self.get_header(lot_id)?, false),
        };

        let resolved: Vec<ItemInput> = items.iter().map(|item| item.with_lot_defaults(&lot)).collect();
        for (index, item) in resolved.iter().enumerate() {
            item.to_new_product(&lot)
                .into_product(ProductId::new(), now)
                .map_err(|err| DomainError::invalid_input(format!("item {index}: {err}")))?;
        }

        if is_new {
            self.lots.insert(lot.clone())?;
            info!(lot_id = %lot.id, lot_number = %lot.lot_number, "lot created");
        }

        let mut progress = IntakeProgress::default();
        let mut created = Vec::with_capacity(resolved.len());
        let mut failures: Vec<String> = Vec::new();
        for (index, item) in resolved.iter().enumerate() {
            progress.items_attempted += 1;
            match self.catalog.create(item.to_new_product(&lot)) {
                Ok(product_id) => {
                    progress.products_created += 1;
                    created.push(product_id);
                    let record = LotItem::record(lot.id, item, Some(product_id), self.clock.now());
                    match self.items.insert(record) {
                        Ok(_) => progress.lot_items_recorded += 1,
                        Err(err) => failures.push(format!("item {index} log: {err}")),
                    }
                }
                Err(err) => {
                    progress.items_failed += 1;
                    failures.push(format!("item {index}: {err}"));
                }
            }
            debug!(lot_id = %lot.id, ?progress, "intake progress");
        }

        let total = self.sync_items_count(lot.id)?;
        info!(lot_id = %lot.id, ?progress, items_count = total, "bulk intake finished");

        if failures.is_empty() {
            Ok(IntakeReport {
                lot_id: lot.id,
                created,
                progress,
            })
        } else {
            warn!(lot_id = %lot.id, ?progress, "bulk intake partially applied");
            Err(DomainError::partial(
                progress.products_created,
                failures.len(),
                format!("lot {}: {}", lot.id, failures.join("; ")),
            ))
        }
    }

    pub fn get_header(&self, lot_id: LotId) -> DomainResult<Lot> {
        self.lots
            .get(&lot_id)?
            .map(|v| v.into_inner())
            .ok_or(DomainError::NotFound)
    }

    /// Lot items in insertion order.
    pub fn items_of(&self, lot_id: LotId) -> DomainResult<Vec<LotItem>> {
        Ok(self.items.query(&Self::items_query(lot_id))?)
    }

    /// All lots, newest first, pushed on every lot change.
    pub fn subscribe_lots(&self, callback: WatchCallback<Lot>) -> DomainResult<WatchHandle> {
        Ok(self.lots.watch(Query::all(), callback)?)
    }

    pub fn subscribe_items(&self, lot_id: LotId, callback: WatchCallback<LotItem>) -> DomainResult<WatchHandle> {
        Ok(self.items.watch(Self::items_query(lot_id), callback)?)
    }

    /// Delete the lot's items in bounded pages, then its header.
    ///
    /// Retrying after a partial run continues where it stopped; a lot with no
    /// items left only loses its header, and an already deleted lot is a no-op.
    pub fn delete_lot_cascade(&self, lot_id: LotId) -> DomainResult<CascadeProgress> {
        let mut progress = CascadeProgress::start(lot_id);
        let page_query = Query::all()
            .filter(move |i: &LotItem| i.lot_id == lot_id)
            .limit(self.config.cascade_page_size);

        loop {
            let page = self
                .items
                .query(&page_query)
                .map_err(|err| Self::cascade_failure(&progress, err))?;
            if page.is_empty() {
                break;
            }
            let ids: Vec<_> = page.iter().map(|i| i.id).collect();
            let deleted = self
                .items
                .delete_batch(&ids)
                .map_err(|err| Self::cascade_failure(&progress, err))?;
            progress.pages_deleted += 1;
            progress.items_deleted += deleted;
            debug!(?progress, "lot items page deleted");
        }

        progress.header_deleted = self
            .lots
            .delete(&lot_id)
            .map_err(|err| Self::cascade_failure(&progress, err))?;
        info!(?progress, "lot deleted");
        Ok(progress)
    }

    /// Delete every lot created on or before the end of `cutoff` (UTC), oldest
    /// first, a small batch per round, until none remain.
    pub fn purge_lots_created_on_or_before(&self, cutoff: NaiveDate) -> DomainResult<PurgeProgress> {
        let until = end_of_day(cutoff)?;
        let mut progress = PurgeProgress::start(cutoff);

        loop {
            let batch = self
                .lots
                .query(&Query::oldest_first().created_until(until).limit(self.config.purge_batch_size))
                .map_err(|err| purge_failure(&progress, err.into()))?;
            if batch.is_empty() {
                break;
            }
            progress.rounds += 1;
            for lot in &batch {
                let cascade = self
                    .delete_lot_cascade(lot.id)
                    .map_err(|err| purge_failure(&progress, err))?;
                progress.absorb(&cascade);
            }
            info!(?progress, "purge round finished");
        }

        Ok(progress)
    }

    /// Set `items_count` to the number of items actually stored for the lot.
    fn sync_items_count(&self, lot_id: LotId) -> DomainResult<usize> {
        let total = self.items.query(&Self::items_query(lot_id))?.len();
        run_transaction(self.lots.as_ref(), &lot_id, self.config.adjust_max_retries, |lot: &Lot| {
            Ok(Lot {
                items_count: total,
                ..lot.clone()
            })
        })?;
        Ok(total)
    }

    fn items_query(lot_id: LotId) -> Query<LotItem> {
        Query::oldest_first().filter(move |i: &LotItem| i.lot_id == lot_id)
    }

    fn cascade_failure(progress: &CascadeProgress, err: impl core::fmt::Display) -> DomainError {
        warn!(?progress, error = %err, "lot cascade interrupted");
        DomainError::partial(
            progress.pages_deleted,
            1,
            format!("cascade of lot {} stopped: {err}", progress.lot_id),
        )
    }
}

fn purge_failure(progress: &PurgeProgress, err: DomainError) -> DomainError {
    warn!(?progress, error = %err, "lot purge interrupted");
    DomainError::partial(progress.lots_deleted, 1, format!("purge stopped: {err}"))
}

fn end_of_day(day: NaiveDate) -> DomainResult<DateTime<Utc>> {
    day.and_hms_nano_opt(23, 59, 59, 999_999_999)
        .map(|t| t.and_utc())
        .ok_or_else(|| DomainError::invalid_input(format!("invalid cutoff date {day}")))
}
