//! Report Engine: pure derivations over a catalog snapshot.

pub mod report;

pub use report::{
    FALLBACK_CATEGORY, NearExpiry, Report, ReportParams, ReportSummary, StockRow, category_breakdown,
    category_label, days_remaining, filter_by_categories, low_stock, near_expiry, stock_table, summary,
};
