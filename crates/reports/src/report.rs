//! Summary statistics derived from a catalog snapshot.
//!
//! Every function here is a pure function of its arguments: the same snapshot
//! and the same `today` always give identical output. "Today" is passed in
//! rather than read from a clock.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brewstock_inventory::Product;

/// Label used when a product has neither a unit nor a category id.
pub const FALLBACK_CATEGORY: &str = "other";

/// Category label: the unit if present, else the legacy category id, else
/// [`FALLBACK_CATEGORY`].
pub fn category_label(product: &Product) -> String {
    let unit = product.unit.trim();
    if !unit.is_empty() {
        return unit.to_string();
    }
    product
        .category_id
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string()
}

/// Whole days from `today` to `expiry`, ignoring time of day. Negative once expired.
pub fn days_remaining(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

/// Number of products with `stock <= threshold`.
pub fn low_stock(snapshot: &[Product], threshold: Decimal) -> usize {
    snapshot
        .iter()
        .filter(|p| p.stock.as_decimal() <= threshold)
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearExpiry {
    pub product: Product,
    pub days_remaining: i64,
}

/// Products expiring within `within_days` (inclusive, not yet expired),
/// soonest first. Products without an expiry date never appear.
pub fn near_expiry(snapshot: &[Product], today: NaiveDate, within_days: i64) -> Vec<NearExpiry> {
    let mut rows: Vec<NearExpiry> = snapshot
        .iter()
        .filter_map(|p| {
            let days = days_remaining(p.expiry_date?, today);
            (0..=within_days).contains(&days).then(|| NearExpiry {
                product: p.clone(),
                days_remaining: days,
            })
        })
        .collect();
    // Stable: ties keep snapshot order.
    rows.sort_by_key(|r| r.days_remaining);
    rows
}

/// Product count per category label, ordered by label.
pub fn category_breakdown(snapshot: &[Product]) -> BTreeMap<String, usize> {
    snapshot.iter().fold(BTreeMap::new(), |mut acc, p| {
        *acc.entry(category_label(p)).or_insert(0) += 1;
        acc
    })
}

/// Restrict a snapshot to the selected category labels. An empty selection
/// means no filtering.
pub fn filter_by_categories(snapshot: &[Product], selected: &BTreeSet<String>) -> Vec<Product> {
    if selected.is_empty() {
        return snapshot.to_vec();
    }
    snapshot
        .iter()
        .filter(|p| selected.contains(&category_label(p)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    pub product: Product,
    pub category: String,
    /// `YYYY-MM-DD`, or `-` when there is no expiry date.
    pub expiry_label: String,
}

/// Table rows sorted by product name (then SKU).
pub fn stock_table(snapshot: &[Product]) -> Vec<StockRow> {
    let mut rows: Vec<StockRow> = snapshot
        .iter()
        .map(|p| StockRow {
            product: p.clone(),
            category: category_label(p),
            expiry_label: p
                .expiry_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.product
            .name
            .cmp(&b.product.name)
            .then_with(|| a.product.sku.cmp(&b.product.sku))
    });
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_products: usize,
    pub low_stock: usize,
    pub near_expiry: usize,
}

pub fn summary(snapshot: &[Product], today: NaiveDate, low_threshold: Decimal, within_days: i64) -> ReportSummary {
    ReportSummary {
        total_products: snapshot.len(),
        low_stock: low_stock(snapshot, low_threshold),
        near_expiry: near_expiry(snapshot, today, within_days).len(),
    }
}

/// Thresholds applied by [`Report::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportParams {
    pub low_stock_threshold: Decimal,
    pub near_expiry_days: i64,
    /// Cap on the near-expiry list (the summary count is not capped).
    pub near_expiry_limit: Option<usize>,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            low_stock_threshold: Decimal::from(5),
            near_expiry_days: 30,
            near_expiry_limit: Some(8),
        }
    }
}

/// Everything the reports page shows, computed in one pass over a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub categories: BTreeMap<String, usize>,
    pub near_expiry: Vec<NearExpiry>,
    pub table: Vec<StockRow>,
}

impl Report {
    /// `categories` is computed over the whole snapshot so the filter choices
    /// stay visible; the rest honours `selected`.
    pub fn compute(
        snapshot: &[Product],
        today: NaiveDate,
        params: &ReportParams,
        selected: &BTreeSet<String>,
    ) -> Self {
        let filtered = filter_by_categories(snapshot, selected);
        let mut expiring = near_expiry(&filtered, today, params.near_expiry_days);
        let summary = ReportSummary {
            total_products: filtered.len(),
            low_stock: low_stock(&filtered, params.low_stock_threshold),
            near_expiry: expiring.len(),
        };
        if let Some(limit) = params.near_expiry_limit {
            expiring.truncate(limit);
        }

        Self {
            summary,
            categories: category_breakdown(snapshot),
            near_expiry: expiring,
            table: stock_table(&filtered),
        }
    }
}
