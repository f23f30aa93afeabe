//! Read-side projection of the movement log.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brewstock_core::ProductId;

use crate::movement::{Movement, MovementKind};
use crate::product::Product;

/// Inclusive range of whole calendar days (UTC day boundaries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub product_ids: Option<HashSet<ProductId>>,
    pub kind: Option<MovementKind>,
    pub date_range: Option<DateRange>,
    /// Case-insensitive substring of the product's name, SKU or lot number.
    pub text_query: Option<String>,
}

impl HistoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_products(ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            product_ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_query = Some(text.into());
        self
    }

    pub fn with_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_range = Some(DateRange { from, to });
        self
    }

    fn normalized_query(&self) -> Option<String> {
        self.text_query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty())
    }

    fn matches(&self, movement: &Movement, product: &Product, query: Option<&str>) -> bool {
        if let Some(ids) = &self.product_ids {
            if !ids.contains(&movement.product_id) {
                return false;
            }
        }
        if self.kind.is_some_and(|k| k != movement.kind) {
            return false;
        }
        if let Some(range) = &self.date_range {
            if !range.contains(movement.at.date_naive()) {
                return false;
            }
        }
        if let Some(q) = query {
            let haystack = format!(
                "{} {} {}",
                product.name,
                product.sku,
                product.lot_number.as_deref().unwrap_or("")
            )
            .to_lowercase();
            if !haystack.contains(q) {
                return false;
            }
        }
        true
    }
}

/// One history row, joined with its (still existing) product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub movement: Movement,
    pub product_name: String,
    pub product_sku: String,
    pub lot_number: Option<String>,
    pub signed_delta: Decimal,
}

/// Project `movements` (already newest first) through `filter`.
///
/// Movements whose product is no longer in `catalog` are dropped: deleting a
/// product leaves its movements behind, and the read side hides them.
pub fn project_history(
    movements: &[Movement],
    catalog: &HashMap<ProductId, Product>,
    filter: &HistoryFilter,
) -> Vec<HistoryEntry> {
    let query = filter.normalized_query();
    movements
        .iter()
        .filter_map(|m| catalog.get(&m.product_id).map(|p| (m, p)))
        .filter(|(m, p)| filter.matches(m, p, query.as_deref()))
        .map(|(m, p)| HistoryEntry {
            movement: m.clone(),
            product_name: p.name.clone(),
            product_sku: p.sku.clone(),
            lot_number: p.lot_number.clone(),
            signed_delta: m.signed_delta(),
        })
        .collect()
}
