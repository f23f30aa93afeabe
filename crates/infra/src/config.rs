//! Runtime configuration for the inventory services.

use std::str::FromStr;

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brewstock_core::{DomainError, DomainResult};

use crate::store::MAX_BATCH_WRITES;

/// What happens to a product's movements when the product is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementRetention {
    /// Keep them as an audit trail; history hides them.
    #[default]
    Retain,
    /// Delete them after the product row.
    Cascade,
}

impl FromStr for MovementRetention {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "cascade" => Ok(Self::Cascade),
            other => bail!("unknown movement retention policy '{other}' (expected retain or cascade)"),
        }
    }
}

/// Inventory service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Products with `stock <= threshold` count as low stock.
    pub low_stock_threshold: Decimal,
    /// Forward-looking near-expiry window, in days.
    pub near_expiry_days: i64,
    pub near_expiry_list_limit: usize,
    /// Newest movements considered by a history read.
    pub history_max_rows: usize,
    /// Lot items deleted per write batch.
    pub cascade_page_size: usize,
    /// Lots fetched per purge round.
    pub purge_batch_size: usize,
    /// Compare-and-set attempts per stock adjustment.
    pub adjust_max_retries: u32,
    pub movement_retention: MovementRetention,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: Decimal::from(5),
            near_expiry_days: 30,
            near_expiry_list_limit: 8,
            history_max_rows: 500,
            cascade_page_size: 400,
            purge_batch_size: 30,
            adjust_max_retries: 8,
            movement_retention: MovementRetention::Retain,
        }
    }
}

impl InventoryConfig {
    /// Defaults overridden by any `BREWSTOCK_*` variables that are set.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(v) = lookup("BREWSTOCK_LOW_STOCK_THRESHOLD") {
            config.low_stock_threshold = parse_var("BREWSTOCK_LOW_STOCK_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("BREWSTOCK_NEAR_EXPIRY_DAYS") {
            config.near_expiry_days = parse_var("BREWSTOCK_NEAR_EXPIRY_DAYS", &v)?;
        }
        if let Some(v) = lookup("BREWSTOCK_NEAR_EXPIRY_LIST_LIMIT") {
            config.near_expiry_list_limit = parse_var("BREWSTOCK_NEAR_EXPIRY_LIST_LIMIT", &v)?;
        }
        if let Some(v) = lookup("BREWSTOCK_HISTORY_MAX_ROWS") {
            config.history_max_rows = parse_var("BREWSTOCK_HISTORY_MAX_ROWS", &v)?;
        }
        if let Some(v) = lookup("BREWSTOCK_CASCADE_PAGE_SIZE") {
            config.cascade_page_size = parse_var("BREWSTOCK_CASCADE_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("BREWSTOCK_PURGE_BATCH_SIZE") {
            config.purge_batch_size = parse_var("BREWSTOCK_PURGE_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("BREWSTOCK_ADJUST_MAX_RETRIES") {
            config.adjust_max_retries = parse_var("BREWSTOCK_ADJUST_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("BREWSTOCK_MOVEMENT_RETENTION") {
            config.movement_retention = v
                .parse()
                .context("BREWSTOCK_MOVEMENT_RETENTION")?;
        }
        config
            .validate()
            .context("invalid inventory configuration")?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse inventory configuration")?;
        config
            .validate()
            .context("invalid inventory configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.cascade_page_size == 0 || self.cascade_page_size > MAX_BATCH_WRITES {
            return Err(DomainError::invalid_input(format!(
                "cascade_page_size must be between 1 and {MAX_BATCH_WRITES}"
            )));
        }
        if self.purge_batch_size == 0 {
            return Err(DomainError::invalid_input("purge_batch_size must be positive"));
        }
        if self.history_max_rows == 0 {
            return Err(DomainError::invalid_input("history_max_rows must be positive"));
        }
        if self.adjust_max_retries == 0 {
            return Err(DomainError::invalid_input("adjust_max_retries must be positive"));
        }
        if self.low_stock_threshold.is_sign_negative() || self.near_expiry_days < 0 {
            return Err(DomainError::invalid_input("report thresholds must not be negative"));
        }
        Ok(())
    }

    pub fn with_low_stock_threshold(mut self, threshold: Decimal) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn with_near_expiry_days(mut self, days: i64) -> Self {
        self.near_expiry_days = days;
        self
    }

    pub fn with_cascade_page_size(mut self, size: usize) -> Self {
        self.cascade_page_size = size;
        self
    }

    pub fn with_purge_batch_size(mut self, size: usize) -> Self {
        self.purge_batch_size = size;
        self
    }

    pub fn with_history_max_rows(mut self, rows: usize) -> Self {
        self.history_max_rows = rows;
        self
    }

    pub fn with_adjust_max_retries(mut self, retries: u32) -> Self {
        self.adjust_max_retries = retries;
        self
    }

    pub fn with_movement_retention(mut self, retention: MovementRetention) -> Self {
        self.movement_retention = retention;
        self
    }
}

fn parse_var<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key}: cannot parse '{raw}'"))
}
