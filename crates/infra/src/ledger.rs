//! Movement Ledger: append-only stock movements and the stock transaction.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use brewstock_auth::{Caller, Permission, authorize};
use brewstock_core::{Clock, DomainError, DomainResult, ProductId, Quantity};
use brewstock_events::WatchHandle;
use brewstock_inventory::{
    HistoryEntry, HistoryFilter, Movement, Product, StockDirection, adjustment_quantity, apply_adjustment,
    normalize_note, project_history,
};

use crate::config::InventoryConfig;
use crate::store::{DocumentStore, Query};
use crate::transaction::run_transaction;

pub type ProductStore = Arc<dyn DocumentStore<Product>>;
pub type MovementStore = Arc<dyn DocumentStore<Movement>>;
pub type SharedClock = Arc<dyn Clock>;

/// Live history callback.
pub type HistoryCallback = Arc<dyn Fn(&[HistoryEntry]) + Send + Sync>;

/// Result of a committed stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub product_id: ProductId,
    pub stock: Quantity,
    pub movement: Movement,
}

/// Per-product results of [`Ledger::adjust_many`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub adjusted: Vec<Adjustment>,
}

pub struct Ledger {
    products: ProductStore,
    movements: MovementStore,
    clock: SharedClock,
    config: InventoryConfig,
}

impl core::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ledger").field("config", &self.config).finish()
    }
}

impl Ledger {
    /// Fails with `InvalidInput` when `config` does not validate.
    pub fn new(
        products: ProductStore,
        movements: MovementStore,
        clock: SharedClock,
        config: InventoryConfig,
    ) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            products,
            movements,
            clock,
            config,
        })
    }

    /// Append the `init` movement for a freshly created product. Does not
    /// touch the product's stock.
    pub fn record_initial(&self, product_id: ProductId, quantity: Quantity) -> DomainResult<Movement> {
        if !quantity.is_positive() {
            return Err(DomainError::invalid_input("initial movement quantity must be positive"));
        }
        let movement = Movement::initial(product_id, quantity, self.clock.now(), self.clock.today());
        self.movements.insert(movement.clone())?;
        debug!(%product_id, quantity = %quantity, "initial movement recorded");
        Ok(movement)
    }

    /// Atomically add to or remove from a product's stock, then append the
    /// audit movement.
    ///
    /// Input is validated before any read. The stock write is a
    /// compare-and-set transaction retried on lost races, so concurrent
    /// adjustments of one product serialize. A removal below zero aborts with
    /// `InvalidState` and no movement is written.
    pub fn adjust(
        &self,
        product_id: ProductId,
        direction: StockDirection,
        quantity: Decimal,
        note: Option<&str>,
    ) -> DomainResult<Adjustment> {
        let quantity = adjustment_quantity(quantity)?;
        let note = normalize_note(note)?;
        self.adjust_validated(product_id, direction, quantity, note)
    }

    /// Apply the same adjustment to each product independently.
    ///
    /// Every product is attempted; if any fails the call reports
    /// `PartialBatchFailure` and the successful adjustments stay applied.
    pub fn adjust_many(
        &self,
        product_ids: &[ProductId],
        direction: StockDirection,
        quantity: Decimal,
        note: Option<&str>,
    ) -> DomainResult<BatchOutcome> {
        if product_ids.is_empty() {
            return Err(DomainError::invalid_input("no products selected"));
        }
        let quantity = adjustment_quantity(quantity)?;
        let note = normalize_note(note)?;

        let mut outcome = BatchOutcome::default();
        let mut failures: Vec<String> = Vec::new();
        for &product_id in product_ids {
            match self.adjust_validated(product_id, direction, quantity, note.clone()) {
                Ok(adjusted) => outcome.adjusted.push(adjusted),
                Err(err) => failures.push(format!("{product_id}: {err}")),
            }
        }

        if failures.is_empty() {
            Ok(outcome)
        } else {
            warn!(
                completed = outcome.adjusted.len(),
                failed = failures.len(),
                "multi-product adjustment partially applied"
            );
            Err(DomainError::partial(outcome.adjusted.len(), failures.len(), failures.join("; ")))
        }
    }

    fn adjust_validated(
        &self,
        product_id: ProductId,
        direction: StockDirection,
        quantity: Quantity,
        note: Option<String>,
    ) -> DomainResult<Adjustment> {
        let now = self.clock.now();
        let committed = run_transaction(self.products.as_ref(), &product_id, self.config.adjust_max_retries, |p: &Product| {
            let stock = apply_adjustment(p.stock, direction, quantity)?;
            Ok(Product {
                stock,
                updated_at: now,
                ..p.clone()
            })
        })?;
        let stock = committed.value.stock;

        let movement = Movement::adjustment(product_id, direction, quantity, note, now, self.clock.today());
        if let Err(err) = self.movements.insert(movement.clone()) {
            warn!(%product_id, error = %err, "stock committed but movement append failed");
            return Err(err.into());
        }

        info!(
            %product_id,
            %direction,
            quantity = %quantity,
            stock = %stock,
            "stock adjusted"
        );
        Ok(Adjustment {
            product_id,
            stock,
            movement,
        })
    }

    /// Filtered movement history, newest first. Admin-only.
    ///
    /// At most `history_max_rows` newest movements are considered; those whose
    /// product no longer exists are left out.
    pub fn history(&self, caller: &Caller, filter: &HistoryFilter) -> DomainResult<Vec<HistoryEntry>> {
        authorize(caller, Permission::HistoryRead)?;
        let movements = self.movements.query(&self.history_query(filter))?;
        let catalog = catalog_index(&self.products.query(&Query::all())?);
        Ok(project_history(&movements, &catalog, filter))
    }

    /// Live [`history`](Self::history): `callback` receives the projected rows
    /// now and after every movement or product change. A caller without
    /// history access gets `PermissionDenied` and nothing is registered.
    pub fn subscribe_history(
        &self,
        caller: &Caller,
        filter: HistoryFilter,
        callback: HistoryCallback,
    ) -> DomainResult<WatchHandle> {
        authorize(caller, Permission::HistoryRead)?;

        let filter = Arc::new(filter);
        let on_movements = {
            let products = Arc::clone(&self.products);
            let filter = Arc::clone(&filter);
            let callback = Arc::clone(&callback);
            Box::new(move |movements: &[Movement]| match products.query(&Query::all()) {
                Ok(rows) => callback(&project_history(movements, &catalog_index(&rows), &filter)),
                Err(err) => warn!(error = %err, "history refresh skipped"),
            })
        };
        let on_products = {
            let movements = Arc::clone(&self.movements);
            let query = self.history_query(&filter);
            let filter = Arc::clone(&filter);
            Box::new(move |rows: &[Product]| match movements.query(&query) {
                Ok(log) => callback(&project_history(&log, &catalog_index(rows), &filter)),
                Err(err) => warn!(error = %err, "history refresh skipped"),
            })
        };

        let movement_watch = self.movements.watch(self.history_query(&filter), on_movements)?;
        let product_watch = self.products.watch(Query::all(), on_products)?;
        Ok(movement_watch.combine(product_watch))
    }

    /// Raw movement log of one product, newest first. Not role-gated.
    pub fn movements_of(&self, product_id: ProductId) -> DomainResult<Vec<Movement>> {
        Ok(self
            .movements
            .query(&Query::all().filter(move |m: &Movement| m.product_id == product_id))?)
    }

    /// Delete a product's movements in bounded pages. Returns how many went.
    pub fn delete_movements_of(&self, product_id: ProductId) -> DomainResult<usize> {
        let mut deleted = 0;
        loop {
            let page = self.movements.query(
                &Query::all()
                    .filter(move |m: &Movement| m.product_id == product_id)
                    .limit(self.config.cascade_page_size),
            )?;
            if page.is_empty() {
                break;
            }
            let ids: Vec<_> = page.iter().map(|m| m.id).collect();
            deleted += self.movements.delete_batch(&ids)?;
        }
        debug!(%product_id, deleted, "movements cascaded");
        Ok(deleted)
    }

    fn history_query(&self, filter: &HistoryFilter) -> Query<Movement> {
        let mut query = Query::all().limit(self.config.history_max_rows);
        if let Some(ids) = filter.product_ids.clone() {
            query = query.filter(move |m: &Movement| ids.contains(&m.product_id));
        }
        query
    }
}

fn catalog_index(products: &[Product]) -> HashMap<ProductId, Product> {
    products.iter().map(|p| (p.id, p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewstock_auth::Role;
    use brewstock_core::FixedClock;
    use brewstock_inventory::{MovementKind, NewProduct};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use crate::store::InMemoryDocumentStore;

    fn test_ledger() -> (Ledger, ProductStore) {
        let products: ProductStore = Arc::new(InMemoryDocumentStore::<Product>::new());
        let movements: MovementStore = Arc::new(InMemoryDocumentStore::<Movement>::new());
        let clock: SharedClock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()));
        let ledger = Ledger::new(products.clone(), movements, clock, InventoryConfig::default()).unwrap();
        (ledger, products)
    }

    fn test_product(products: &ProductStore, stock: u32) -> ProductId {
        let product = NewProduct::new("Milk", "MLK-1", "l", Quantity::from_units(stock))
            .into_product(ProductId::new(), Utc::now())
            .unwrap();
        let id = product.id;
        products.insert(product).unwrap();
        id
    }

    fn stock_of(products: &ProductStore, id: ProductId) -> Decimal {
        products.get(&id).unwrap().unwrap().value.stock.as_decimal()
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let products: ProductStore = Arc::new(InMemoryDocumentStore::<Product>::new());
        let movements: MovementStore = Arc::new(InMemoryDocumentStore::<Movement>::new());
        let clock: SharedClock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()));
        let config = InventoryConfig::default().with_cascade_page_size(0);
        assert!(matches!(
            Ledger::new(products, movements, clock, config),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_positive_quantity_is_rejected_before_any_write() {
        let (ledger, products) = test_ledger();
        let id = test_product(&products, 3);

        for bad in [Decimal::ZERO, Decimal::from(-2), Decimal::new(1, 6)] {
            let err = ledger.adjust(id, StockDirection::Add, bad, None).unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)));
        }
        assert_eq!(products.get(&id).unwrap().unwrap().version, 1);
        assert!(ledger.movements_of(id).unwrap().is_empty());
    }

    #[test]
    fn removal_below_zero_leaves_stock_and_log_untouched() {
        let (ledger, products) = test_ledger();
        let id = test_product(&products, 2);

        let err = ledger.adjust(id, StockDirection::Remove, Decimal::from(3), None).unwrap_err();
        assert_eq!(err, DomainError::invalid_state("stock cannot go negative"));
        assert_eq!(stock_of(&products, id), Decimal::from(2));
        assert!(ledger.movements_of(id).unwrap().is_empty());
    }

    #[test]
    fn adjustment_of_missing_product_is_not_found() {
        let (ledger, _products) = test_ledger();
        let err = ledger.adjust(ProductId::new(), StockDirection::Add, Decimal::ONE, None).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn adjustment_keeps_note_separate_from_stamp() {
        let (ledger, products) = test_ledger();
        let id = test_product(&products, 1);

        let adjusted = ledger
            .adjust(id, StockDirection::Remove, Decimal::ONE, Some("  spilled  "))
            .unwrap();
        assert_eq!(adjusted.movement.kind, MovementKind::Remove);
        assert_eq!(adjusted.movement.note.as_deref(), Some("spilled"));
        assert_eq!(adjusted.movement.display_note(), "01/06/2025 - cut stock • spilled");
        assert!(adjusted.stock.is_zero());
    }

    #[test]
    fn multi_product_cut_reports_partial_failure() {
        let (ledger, products) = test_ledger();
        let plenty = test_product(&products, 10);
        let scarce = test_product(&products, 1);

        let err = ledger
            .adjust_many(&[plenty, scarce], StockDirection::Remove, Decimal::from(2), None)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::PartialBatchFailure {
                completed: 1,
                failed: 1,
                ..
            }
        ));
        assert_eq!(stock_of(&products, plenty), Decimal::from(8));
        assert_eq!(stock_of(&products, scarce), Decimal::ONE);

        assert!(matches!(
            ledger.adjust_many(&[], StockDirection::Remove, Decimal::ONE, None),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn live_history_is_refused_for_non_admins() {
        let (ledger, _products) = test_ledger();
        let owner = Caller::with_role("owner@gmail.com", Role::Owner);
        let result = ledger.subscribe_history(&owner, HistoryFilter::all(), Arc::new(|_rows: &[HistoryEntry]| {}));
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }

    #[test]
    fn live_history_follows_new_movements() {
        let (ledger, products) = test_ledger();
        let id = test_product(&products, 5);
        let admin = Caller::with_role("admin@gmail.com", Role::Admin);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = ledger
            .subscribe_history(
                &admin,
                HistoryFilter::all(),
                Arc::new(move |rows: &[HistoryEntry]| sink.lock().unwrap().push(rows.len())),
            )
            .unwrap();
        ledger.adjust(id, StockDirection::Add, Decimal::ONE, None).unwrap();
        handle.unsubscribe();
        ledger.adjust(id, StockDirection::Add, Decimal::ONE, None).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&1));
        assert!(seen.iter().all(|n| *n <= 1));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: stock == initial + Σ adds − Σ accepted removes, never negative.
        #[test]
        fn stock_matches_the_accepted_movements(
            initial in 0u32..50,
            steps in prop::collection::vec((any::<bool>(), 1u32..20), 0..40),
        ) {
            let (ledger, products) = test_ledger();
            let id = test_product(&products, initial);
            let mut expected = Decimal::from(initial);

            for (add, qty) in steps {
                let qty = Decimal::from(qty);
                let direction = if add { StockDirection::Add } else { StockDirection::Remove };
                match ledger.adjust(id, direction, qty, None) {
                    Ok(adjusted) => {
                        expected += if add { qty } else { -qty };
                        prop_assert_eq!(adjusted.stock.as_decimal(), expected);
                    }
                    Err(err) => {
                        prop_assert!(!add);
                        prop_assert!(qty > expected);
                        prop_assert!(matches!(err, DomainError::InvalidState(_)));
                    }
                }
                prop_assert!(stock_of(&products, id) >= Decimal::ZERO);
            }

            prop_assert_eq!(stock_of(&products, id), expected);
            let logged: Decimal = ledger.movements_of(id).unwrap().iter().map(|m| m.signed_delta()).sum();
            prop_assert_eq!(Decimal::from(initial) + logged, expected);
        }
    }
}
