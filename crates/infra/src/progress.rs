//! Progress cursors for the multi-step (non-atomic) lot operations.
//!
//! Each operation re-queries remaining state on every step, so re-running it
//! after an interruption is safe; the cursor records how far a run got and is
//! attached to log events and returned to callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use brewstock_core::LotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntakeProgress {
    pub items_attempted: usize,
    pub products_created: usize,
    pub items_failed: usize,
    pub lot_items_recorded: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeProgress {
    pub lot_id: LotId,
    pub pages_deleted: usize,
    pub items_deleted: usize,
    /// False when the header was already gone (a retried cascade).
    pub header_deleted: bool,
}

impl CascadeProgress {
    pub fn start(lot_id: LotId) -> Self {
        Self {
            lot_id,
            pages_deleted: 0,
            items_deleted: 0,
            header_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeProgress {
    pub cutoff: NaiveDate,
    pub rounds: usize,
    pub lots_deleted: usize,
    pub items_deleted: usize,
}

impl PurgeProgress {
    pub fn start(cutoff: NaiveDate) -> Self {
        Self {
            cutoff,
            rounds: 0,
            lots_deleted: 0,
            items_deleted: 0,
        }
    }

    pub fn absorb(&mut self, cascade: &CascadeProgress) {
        if cascade.header_deleted {
            self.lots_deleted += 1;
        }
        self.items_deleted += cascade.items_deleted;
    }
}
