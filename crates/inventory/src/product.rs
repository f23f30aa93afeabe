use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brewstock_core::{DomainError, DomainResult, Entity, ProductId, Quantity};

/// Longest free-text note accepted on products and movements.
pub const MAX_NOTE_CHARS: usize = 500;

/// Catalog product.
///
/// `stock` is never negative; it only changes through the ledger's stock
/// transaction, never through [`ProductPatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub unit: String,
    /// Legacy grouping key; the fallback category when `unit` is blank.
    pub category_id: Option<String>,
    pub supplier: Option<String>,
    pub stock: Quantity,
    pub cost_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub lot_number: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input for creating a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub category_id: Option<String>,
    pub supplier: Option<String>,
    pub initial_stock: Quantity,
    pub cost_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub lot_number: Option<String>,
    pub note: Option<String>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, unit: impl Into<String>, initial_stock: Quantity) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            unit: unit.into(),
            initial_stock,
            ..Self::default()
        }
    }

    pub fn with_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    pub fn with_lot_number(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    /// Validate and build the stored record. Nothing is written here.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> DomainResult<Product> {
        let name = required("name", &self.name)?;
        let sku = required("sku", &self.sku)?;
        let unit = required("unit", &self.unit)?;
        non_negative_price("cost_price", self.cost_price)?;
        non_negative_price("sell_price", self.sell_price)?;

        Ok(Product {
            id,
            name,
            sku,
            unit,
            category_id: optional_text(self.category_id.as_deref()),
            supplier: optional_text(self.supplier.as_deref()),
            stock: self.initial_stock,
            cost_price: self.cost_price,
            sell_price: self.sell_price,
            expiry_date: self.expiry_date,
            lot_number: optional_text(self.lot_number.as_deref()),
            note: normalize_note(self.note.as_deref())?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a product's descriptive fields.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional one.
/// Stock is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub category_id: Option<Option<String>>,
    pub supplier: Option<Option<String>>,
    pub cost_price: Option<Option<Decimal>>,
    pub sell_price: Option<Option<Decimal>>,
    pub expiry_date: Option<Option<NaiveDate>>,
    pub lot_number: Option<Option<String>>,
    pub note: Option<Option<String>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply onto `product`, stamping `updated_at`. Validation happens before
    /// any field is changed.
    pub fn apply(&self, product: &Product, now: DateTime<Utc>) -> DomainResult<Product> {
        let mut next = product.clone();

        if let Some(name) = &self.name {
            next.name = required("name", name)?;
        }
        if let Some(sku) = &self.sku {
            next.sku = required("sku", sku)?;
        }
        if let Some(unit) = &self.unit {
            next.unit = required("unit", unit)?;
        }
        if let Some(category_id) = &self.category_id {
            next.category_id = optional_text(category_id.as_deref());
        }
        if let Some(supplier) = &self.supplier {
            next.supplier = optional_text(supplier.as_deref());
        }
        if let Some(cost) = self.cost_price {
            non_negative_price("cost_price", cost)?;
            next.cost_price = cost;
        }
        if let Some(sell) = self.sell_price {
            non_negative_price("sell_price", sell)?;
            next.sell_price = sell;
        }
        if let Some(expiry) = self.expiry_date {
            next.expiry_date = expiry;
        }
        if let Some(lot_number) = &self.lot_number {
            next.lot_number = optional_text(lot_number.as_deref());
        }
        if let Some(note) = &self.note {
            next.note = normalize_note(note.as_deref())?;
        }

        next.updated_at = now;
        Ok(next)
    }
}

/// Parse a `YYYY-MM-DD` expiry field. Blank means "no expiry".
pub fn parse_expiry(raw: &str) -> DomainResult<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| DomainError::invalid_input(format!("expiry_date '{raw}': {e}")))
}

/// Trim a free-text note; blank becomes `None`, overlong is rejected.
pub fn normalize_note(note: Option<&str>) -> DomainResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if note.chars().count() > MAX_NOTE_CHARS {
        return Err(DomainError::invalid_input(format!(
            "note cannot exceed {MAX_NOTE_CHARS} characters"
        )));
    }
    Ok(Some(note.to_string()))
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_input(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn non_negative_price(field: &str, value: Option<Decimal>) -> DomainResult<()> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => {
            Err(DomainError::invalid_input(format!("{field} cannot be negative")))
        }
        _ => Ok(()),
    }
}
