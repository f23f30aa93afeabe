//! Role-gated facade over the catalog, ledger, lot aggregator and reports.
//!
//! Every operation takes the caller explicitly; there is no ambient identity.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use brewstock_auth::{Caller, Permission, Section, authorize, visible_sections};
use brewstock_core::{Clock, DomainResult, LotId, ProductId};
use brewstock_events::WatchHandle;
use brewstock_inventory::{HistoryEntry, HistoryFilter, Movement, NewProduct, Product, ProductPatch, StockDirection};
use brewstock_lots::{ItemInput, Lot, LotHeader, LotItem, LotTarget};
use brewstock_reports::{NearExpiry, Report, ReportParams, ReportSummary, near_expiry, summary};

use crate::catalog::Catalog;
use crate::config::InventoryConfig;
use crate::ledger::{Adjustment, BatchOutcome, HistoryCallback, Ledger, MovementStore, ProductStore, SharedClock};
use crate::lot_aggregator::{IntakeReport, LotAggregator, LotItemStore, LotStore};
use crate::progress::{CascadeProgress, PurgeProgress};
use crate::store::{InMemoryDocumentStore, WatchCallback};

/// The four collections the services persist to.
#[derive(Clone)]
pub struct Stores {
    pub products: ProductStore,
    pub movements: MovementStore,
    pub lots: LotStore,
    pub lot_items: LotItemStore,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryDocumentStore::<Product>::new()),
            movements: Arc::new(InMemoryDocumentStore::<Movement>::new()),
            lots: Arc::new(InMemoryDocumentStore::<Lot>::new()),
            lot_items: Arc::new(InMemoryDocumentStore::<LotItem>::new()),
        }
    }
}

pub struct InventoryService {
    catalog: Arc<Catalog>,
    ledger: Arc<Ledger>,
    lots: LotAggregator,
    clock: SharedClock,
    config: InventoryConfig,
}

impl core::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryService").field("config", &self.config).finish()
    }
}

impl InventoryService {
    pub fn new(stores: Stores, clock: SharedClock, config: InventoryConfig) -> DomainResult<Self> {
        config.validate()?;
        let ledger = Arc::new(Ledger::new(
            stores.products.clone(),
            stores.movements,
            clock.clone(),
            config.clone(),
        )?);
        let catalog = Arc::new(Catalog::new(stores.products, ledger.clone(), clock.clone(), config.clone())?);
        let lots = LotAggregator::new(stores.lots, stores.lot_items, catalog.clone(), clock.clone(), config.clone())?;
        Ok(Self {
            catalog,
            ledger,
            lots,
            clock,
            config,
        })
    }

    pub fn in_memory(clock: SharedClock, config: InventoryConfig) -> DomainResult<Self> {
        Self::new(Stores::in_memory(), clock, config)
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Navigation entries the caller may open.
    pub fn sections(&self, caller: &Caller) -> Vec<Section> {
        visible_sections(caller)
    }

    // Catalog

    pub fn create_product(&self, caller: &Caller, input: NewProduct) -> DomainResult<ProductId> {
        authorize(caller, Permission::ProductsWrite)?;
        self.catalog.create(input)
    }

    pub fn update_product(&self, caller: &Caller, id: ProductId, patch: &ProductPatch) -> DomainResult<Product> {
        authorize(caller, Permission::ProductsWrite)?;
        self.catalog.update(id, patch)
    }

    pub fn delete_product(&self, caller: &Caller, id: ProductId) -> DomainResult<()> {
        authorize(caller, Permission::ProductsWrite)?;
        self.catalog.delete(id)
    }

    pub fn delete_products(&self, caller: &Caller, ids: &[ProductId]) -> DomainResult<usize> {
        authorize(caller, Permission::ProductsWrite)?;
        self.catalog.delete_many(ids)
    }

    pub fn product(&self, caller: &Caller, id: ProductId) -> DomainResult<Product> {
        authorize(caller, Permission::ProductsRead)?;
        self.catalog.get(id)
    }

    pub fn products(&self, caller: &Caller) -> DomainResult<Vec<Product>> {
        authorize(caller, Permission::ProductsRead)?;
        self.catalog.snapshot()
    }

    pub fn subscribe_products(&self, caller: &Caller, callback: WatchCallback<Product>) -> DomainResult<WatchHandle> {
        authorize(caller, Permission::ProductsRead)?;
        self.catalog.subscribe(callback)
    }

    // Ledger

    pub fn adjust_stock(
        &self,
        caller: &Caller,
        id: ProductId,
        direction: StockDirection,
        quantity: Decimal,
        note: Option<&str>,
    ) -> DomainResult<Adjustment> {
        authorize(caller, Permission::StockAdjust)?;
        self.ledger.adjust(id, direction, quantity, note)
    }

    pub fn adjust_stock_many(
        &self,
        caller: &Caller,
        ids: &[ProductId],
        direction: StockDirection,
        quantity: Decimal,
        note: Option<&str>,
    ) -> DomainResult<BatchOutcome> {
        authorize(caller, Permission::StockAdjust)?;
        self.ledger.adjust_many(ids, direction, quantity, note)
    }

    pub fn history(&self, caller: &Caller, filter: &HistoryFilter) -> DomainResult<Vec<HistoryEntry>> {
        self.ledger.history(caller, filter)
    }

    pub fn subscribe_history(
        &self,
        caller: &Caller,
        filter: HistoryFilter,
        callback: HistoryCallback,
    ) -> DomainResult<WatchHandle> {
        self.ledger.subscribe_history(caller, filter, callback)
    }

    // Lots

    pub fn create_lot(&self, caller: &Caller, header: LotHeader) -> DomainResult<LotId> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.create_lot(header)
    }

    pub fn bulk_intake(&self, caller: &Caller, target: LotTarget, items: Vec<ItemInput>) -> DomainResult<IntakeReport> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.bulk_intake(target, items)
    }

    pub fn lot_header(&self, caller: &Caller, lot_id: LotId) -> DomainResult<Lot> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.get_header(lot_id)
    }

    pub fn lot_items(&self, caller: &Caller, lot_id: LotId) -> DomainResult<Vec<LotItem>> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.items_of(lot_id)
    }

    pub fn subscribe_lots(&self, caller: &Caller, callback: WatchCallback<Lot>) -> DomainResult<WatchHandle> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.subscribe_lots(callback)
    }

    pub fn subscribe_lot_items(
        &self,
        caller: &Caller,
        lot_id: LotId,
        callback: WatchCallback<LotItem>,
    ) -> DomainResult<WatchHandle> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.subscribe_items(lot_id, callback)
    }

    pub fn delete_lot(&self, caller: &Caller, lot_id: LotId) -> DomainResult<CascadeProgress> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.delete_lot_cascade(lot_id)
    }

    pub fn purge_lots(&self, caller: &Caller, cutoff: NaiveDate) -> DomainResult<PurgeProgress> {
        authorize(caller, Permission::LotsManage)?;
        self.lots.purge_lots_created_on_or_before(cutoff)
    }

    // Reports

    /// Full report over the current catalog, restricted to `categories`
    /// (empty means all).
    pub fn report(&self, caller: &Caller, categories: &BTreeSet<String>) -> DomainResult<Report> {
        authorize(caller, Permission::ReportsRead)?;
        let snapshot = self.catalog.snapshot()?;
        Ok(Report::compute(&snapshot, self.clock.today(), &self.report_params(), categories))
    }

    pub fn report_summary(&self, caller: &Caller) -> DomainResult<ReportSummary> {
        authorize(caller, Permission::ReportsRead)?;
        let snapshot = self.catalog.snapshot()?;
        Ok(summary(
            &snapshot,
            self.clock.today(),
            self.config.low_stock_threshold,
            self.config.near_expiry_days,
        ))
    }

    /// Near-expiry list, capped at `limit` (configured default when `None`).
    pub fn near_expiry(&self, caller: &Caller, limit: Option<usize>) -> DomainResult<Vec<NearExpiry>> {
        authorize(caller, Permission::ReportsRead)?;
        let snapshot = self.catalog.snapshot()?;
        let mut rows = near_expiry(&snapshot, self.clock.today(), self.config.near_expiry_days);
        rows.truncate(limit.unwrap_or(self.config.near_expiry_list_limit));
        Ok(rows)
    }

    fn report_params(&self) -> ReportParams {
        ReportParams {
            low_stock_threshold: self.config.low_stock_threshold,
            near_expiry_days: self.config.near_expiry_days,
            near_expiry_limit: Some(self.config.near_expiry_list_limit),
        }
    }
}
