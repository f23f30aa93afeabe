use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use brewstock_core::{DomainError, DomainResult, Entity, LotId, LotItemId, ProductId, Quantity};
use brewstock_inventory::{NewProduct, normalize_note};

/// Classification given to lots created by a fresh intake.
pub const NEW_LOT_CLASSIFICATION: &str = "new";

/// Group-intake header.
///
/// `items_count` caches the number of [`LotItem`] children; the writer keeps
/// it in sync, nothing enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    /// Not guaranteed unique across lots.
    pub lot_number: String,
    pub classification: String,
    pub expiry_date: Option<NaiveDate>,
    pub items_count: usize,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Caller-supplied lot header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LotHeader {
    pub lot_number: String,
    /// Free text such as a supplier name; defaults to `"new"`.
    pub classification: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub note: Option<String>,
}

impl LotHeader {
    pub fn new(lot_number: impl Into<String>) -> Self {
        Self {
            lot_number: lot_number.into(),
            ..Self::default()
        }
    }

    pub fn with_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    /// Validate and build a lot with `items_count = 0`.
    pub fn into_lot(self, id: LotId, now: DateTime<Utc>) -> DomainResult<Lot> {
        let lot_number = self.lot_number.trim();
        if lot_number.is_empty() {
            return Err(DomainError::invalid_input("lot_number cannot be empty"));
        }
        let classification = self
            .classification
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(NEW_LOT_CLASSIFICATION)
            .to_string();

        Ok(Lot {
            id,
            lot_number: lot_number.to_string(),
            classification,
            expiry_date: self.expiry_date,
            items_count: 0,
            note: normalize_note(self.note.as_deref())?,
            created_at: now,
        })
    }
}

/// Where a bulk intake goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LotTarget {
    New { header: LotHeader },
    Existing { lot_id: LotId },
}

/// One product row of a bulk intake.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemInput {
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub quantity: Quantity,
    pub expiry_date: Option<NaiveDate>,
    pub lot_number: Option<String>,
}

impl ItemInput {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, unit: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            unit: unit.into(),
            quantity,
            ..Self::default()
        }
    }

    /// Fill absent per-item expiry/lot number from the lot.
    pub fn with_lot_defaults(&self, lot: &Lot) -> ItemInput {
        let mut resolved = self.clone();
        if resolved.expiry_date.is_none() {
            resolved.expiry_date = lot.expiry_date;
        }
        let own_lot_number = resolved
            .lot_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        resolved.lot_number = own_lot_number.or_else(|| Some(lot.lot_number.clone()));
        resolved
    }

    /// Catalog input for an item already resolved against its lot.
    pub fn to_new_product(&self, lot: &Lot) -> NewProduct {
        NewProduct {
            name: self.name.clone(),
            sku: self.sku.clone(),
            unit: self.unit.clone(),
            category_id: Some(self.unit.clone()),
            supplier: Some(lot.classification.clone()),
            initial_stock: self.quantity,
            expiry_date: self.expiry_date,
            lot_number: self.lot_number.clone(),
            ..NewProduct::default()
        }
    }
}

/// Historical record of one product inserted through a lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotItem {
    pub id: LotItemId,
    pub lot_id: LotId,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub quantity: Quantity,
    pub expiry_date: Option<NaiveDate>,
    pub lot_number: Option<String>,
    /// Product created from this item.
    pub product_id: Option<ProductId>,
    pub created_at: DateTime<Utc>,
}

impl LotItem {
    pub fn record(lot_id: LotId, item: &ItemInput, product_id: Option<ProductId>, now: DateTime<Utc>) -> Self {
        Self {
            id: LotItemId::new(),
            lot_id,
            name: item.name.trim().to_string(),
            sku: item.sku.trim().to_string(),
            unit: item.unit.trim().to_string(),
            quantity: item.quantity,
            expiry_date: item.expiry_date,
            lot_number: item.lot_number.clone(),
            product_id,
            created_at: now,
        }
    }
}

impl Entity for LotItem {
    type Id = LotItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
