//! Product Catalog.

use std::sync::Arc;

use tracing::{debug, info, warn};

use brewstock_core::{DomainError, DomainResult, ProductId};
use brewstock_events::WatchHandle;
use brewstock_inventory::{NewProduct, Product, ProductPatch};

use crate::config::{InventoryConfig, MovementRetention};
use crate::ledger::{Ledger, ProductStore, SharedClock};
use crate::store::{Query, WatchCallback};
use crate::transaction::run_transaction;

/// Mutable product records. Stock is written here only at creation; every
/// later change goes through [`Ledger::adjust`].
pub struct Catalog {
    products: ProductStore,
    ledger: Arc<Ledger>,
    clock: SharedClock,
    config: InventoryConfig,
}

impl core::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Catalog")
            .field("retention", &self.config.movement_retention)
            .finish()
    }
}

impl Catalog {
    pub fn new(
        products: ProductStore,
        ledger: Arc<Ledger>,
        clock: SharedClock,
        config: InventoryConfig,
    ) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            products,
            ledger,
            clock,
            config,
        })
    }

    /// Validate, insert, then record the initial movement.
    pub fn create(&self, input: NewProduct) -> DomainResult<ProductId> {
        let product = input.into_product(ProductId::new(), self.clock.now())?;
        let id = product.id;
        let stock = product.stock;
        self.products.insert(product)?;

        // Zero opening stock has no movement to record.
        if stock.is_positive() {
            self.ledger.record_initial(id, stock)?;
        }
        info!(product_id = %id, stock = %stock, "product created");
        Ok(id)
    }

    /// Partial update of descriptive fields; stock is untouched.
    pub fn update(&self, id: ProductId, patch: &ProductPatch) -> DomainResult<Product> {
        let now = self.clock.now();
        let committed = run_transaction(self.products.as_ref(), &id, self.config.adjust_max_retries, |p: &Product| {
            patch.apply(p, now)
        })?;
        debug!(product_id = %id, "product updated");
        Ok(committed.into_inner())
    }

    /// Hard delete of the product row. Movements follow the configured
    /// [`MovementRetention`].
    pub fn delete(&self, id: ProductId) -> DomainResult<()> {
        if !self.products.delete(&id)? {
            return Err(DomainError::NotFound);
        }
        if self.config.movement_retention == MovementRetention::Cascade {
            self.ledger.delete_movements_of(id)?;
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Delete each product independently; missing ids are skipped. Returns the
    /// number actually deleted.
    pub fn delete_many(&self, ids: &[ProductId]) -> DomainResult<usize> {
        let mut deleted = 0;
        for &id in ids {
            match self.delete(id) {
                Ok(()) => deleted += 1,
                Err(DomainError::NotFound) => warn!(product_id = %id, "skipping missing product"),
                Err(err) => return Err(err),
            }
        }
        Ok(deleted)
    }

    pub fn get(&self, id: ProductId) -> DomainResult<Product> {
        self.products
            .get(&id)?
            .map(|v| v.into_inner())
            .ok_or(DomainError::NotFound)
    }

    /// Current snapshot, newest first.
    pub fn snapshot(&self) -> DomainResult<Vec<Product>> {
        Ok(self.products.query(&Query::all())?)
    }

    /// Push the full snapshot (newest first) now and after every product
    /// change, until the handle is released.
    pub fn subscribe(&self, callback: WatchCallback<Product>) -> DomainResult<WatchHandle> {
        Ok(self.products.watch(Query::all(), callback)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use brewstock_core::{Clock, FixedClock, Quantity};
    use brewstock_inventory::Movement;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::ledger::MovementStore;
    use crate::store::InMemoryDocumentStore;

    fn test_catalog(retention: MovementRetention) -> (Catalog, Arc<Ledger>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()));
        let products: ProductStore = Arc::new(InMemoryDocumentStore::<Product>::new());
        let movements: MovementStore = Arc::new(InMemoryDocumentStore::<Movement>::new());
        let config = InventoryConfig::default()
            .with_movement_retention(retention)
            .with_cascade_page_size(2);
        let ledger = Arc::new(Ledger::new(products.clone(), movements, clock.clone(), config.clone()).unwrap());
        let catalog = Catalog::new(products, ledger.clone(), clock.clone(), config).unwrap();
        (catalog, ledger, clock)
    }

    fn test_input(name: &str, stock: u32) -> NewProduct {
        NewProduct::new(name, format!("SKU-{name}"), "kg", Quantity::from_units(stock))
    }

    #[test]
    fn create_records_the_initial_movement() {
        let (catalog, ledger, _clock) = test_catalog(MovementRetention::Retain);
        let id = catalog.create(test_input("Beans", 10)).unwrap();

        assert_eq!(catalog.get(id).unwrap().stock, Quantity::from_units(10));
        let log = ledger.movements_of(id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].note.as_deref(), Some("Initial stock"));
    }

    #[test]
    fn create_validates_before_writing() {
        let (catalog, _ledger, _clock) = test_catalog(MovementRetention::Retain);
        let err = catalog.create(test_input("  ", 1)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(catalog.snapshot().unwrap().is_empty());
    }

    #[test]
    fn update_touches_fields_and_timestamp_but_not_stock() {
        let (catalog, _ledger, clock) = test_catalog(MovementRetention::Retain);
        let id = catalog.create(test_input("Beans", 4)).unwrap();
        clock.advance(Duration::minutes(5));

        let patch = ProductPatch {
            name: Some("Dark beans".to_string()),
            expiry_date: Some(NaiveDate::from_ymd_opt(2025, 9, 1)),
            ..ProductPatch::default()
        };
        let updated = catalog.update(id, &patch).unwrap();
        assert_eq!(updated.name, "Dark beans");
        assert_eq!(updated.stock, Quantity::from_units(4));
        assert_eq!(updated.updated_at, clock.now());
        assert!(updated.updated_at > updated.created_at);

        assert_eq!(catalog.update(ProductId::new(), &patch), Err(DomainError::NotFound));
    }

    #[test]
    fn retained_movements_survive_product_deletion() {
        let (catalog, ledger, _clock) = test_catalog(MovementRetention::Retain);
        let id = catalog.create(test_input("Beans", 4)).unwrap();
        catalog.delete(id).unwrap();

        assert_eq!(catalog.get(id), Err(DomainError::NotFound));
        assert_eq!(ledger.movements_of(id).unwrap().len(), 1);
        assert_eq!(catalog.delete(id), Err(DomainError::NotFound));
    }

    #[test]
    fn cascade_policy_deletes_movements_in_pages() {
        let (catalog, ledger, _clock) = test_catalog(MovementRetention::Cascade);
        let id = catalog.create(test_input("Beans", 4)).unwrap();
        for _ in 0..4 {
            ledger
                .adjust(id, brewstock_inventory::StockDirection::Add, rust_decimal::Decimal::ONE, None)
                .unwrap();
        }
        catalog.delete(id).unwrap();
        assert!(ledger.movements_of(id).unwrap().is_empty());
    }

    #[test]
    fn delete_many_skips_missing_ids() {
        let (catalog, _ledger, _clock) = test_catalog(MovementRetention::Retain);
        let a = catalog.create(test_input("A", 1)).unwrap();
        let b = catalog.create(test_input("B", 1)).unwrap();
        assert_eq!(catalog.delete_many(&[a, ProductId::new(), b]).unwrap(), 2);
        assert!(catalog.snapshot().unwrap().is_empty());
    }

    #[test]
    fn subscription_receives_newest_first_snapshots() {
        let (catalog, _ledger, clock) = test_catalog(MovementRetention::Retain);
        let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = catalog
            .subscribe(Box::new(move |rows: &[Product]| {
                sink.lock().unwrap().push(rows.iter().map(|p| p.name.clone()).collect());
            }))
            .unwrap();

        catalog.create(test_input("First", 1)).unwrap();
        clock.advance(Duration::seconds(1));
        catalog.create(test_input("Second", 1)).unwrap();
        handle.unsubscribe();
        catalog.create(test_input("Third", 1)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&Vec::<String>::new()));
        assert_eq!(seen.last(), Some(&vec!["Second".to_string(), "First".to_string()]));
    }
}
