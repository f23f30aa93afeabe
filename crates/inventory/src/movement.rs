use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brewstock_core::{Entity, MovementId, ProductId, Quantity};

/// What a movement did to stock. Quantities are always stored positive; the
/// kind carries the direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Init,
    Add,
    Remove,
}

impl MovementKind {
    /// Action wording used on the presentation stamp.
    pub fn action_label(&self) -> &'static str {
        match self {
            MovementKind::Init => "initial stock",
            MovementKind::Add => "add stock",
            MovementKind::Remove => "cut stock",
        }
    }
}

/// Direction of a stock adjustment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    Add,
    Remove,
}

impl StockDirection {
    pub fn kind(&self) -> MovementKind {
        match self {
            StockDirection::Add => MovementKind::Add,
            StockDirection::Remove => MovementKind::Remove,
        }
    }
}

impl core::fmt::Display for StockDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StockDirection::Add => f.write_str("add"),
            StockDirection::Remove => f.write_str("remove"),
        }
    }
}

/// Immutable audit record of one stock change.
///
/// The system stamp (action + local date) and the user's note are kept in
/// separate fields; [`Movement::display_note`] joins them for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub quantity: Quantity,
    pub note: Option<String>,
    pub stamped_on: NaiveDate,
    pub at: DateTime<Utc>,
}

pub const INITIAL_STOCK_NOTE: &str = "Initial stock";

impl Movement {
    pub fn initial(product_id: ProductId, quantity: Quantity, at: DateTime<Utc>, today: NaiveDate) -> Self {
        Self {
            id: MovementId::new(),
            product_id,
            kind: MovementKind::Init,
            quantity,
            note: Some(INITIAL_STOCK_NOTE.to_string()),
            stamped_on: today,
            at,
        }
    }

    pub fn adjustment(
        product_id: ProductId,
        direction: StockDirection,
        quantity: Quantity,
        note: Option<String>,
        at: DateTime<Utc>,
        today: NaiveDate,
    ) -> Self {
        Self {
            id: MovementId::new(),
            product_id,
            kind: direction.kind(),
            quantity,
            note,
            stamped_on: today,
            at,
        }
    }

    /// Positive for init/add, negative for remove.
    pub fn signed_delta(&self) -> Decimal {
        match self.kind {
            MovementKind::Remove => -self.quantity.as_decimal(),
            MovementKind::Init | MovementKind::Add => self.quantity.as_decimal(),
        }
    }

    /// `dd/mm/yyyy - <action>` followed by ` • <note>` when a note exists.
    pub fn display_note(&self) -> String {
        let stamp = format!(
            "{} - {}",
            self.stamped_on.format("%d/%m/%Y"),
            self.kind.action_label()
        );
        match &self.note {
            Some(note) => format!("{stamp} • {note}"),
            None => stamp,
        }
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
    }

    #[test]
    fn remove_has_negative_delta_but_positive_quantity() {
        let m = Movement::adjustment(
            ProductId::new(),
            StockDirection::Remove,
            Quantity::from_units(3),
            None,
            Utc::now(),
            day(),
        );
        assert_eq!(m.kind, MovementKind::Remove);
        assert_eq!(m.quantity, Quantity::from_units(3));
        assert_eq!(m.signed_delta(), Decimal::from(-3));
    }

    #[test]
    fn display_note_keeps_stamp_and_user_text_apart() {
        let mut m = Movement::adjustment(
            ProductId::new(),
            StockDirection::Remove,
            Quantity::from_units(1),
            Some("spilled".to_string()),
            Utc::now(),
            day(),
        );
        assert_eq!(m.display_note(), "01/12/2025 - cut stock • spilled");
        assert_eq!(m.note.as_deref(), Some("spilled"));

        m.note = None;
        assert_eq!(m.display_note(), "01/12/2025 - cut stock");
    }

    #[test]
    fn initial_movement_carries_default_note() {
        let m = Movement::initial(ProductId::new(), Quantity::from_units(10), Utc::now(), day());
        assert_eq!(m.kind, MovementKind::Init);
        assert_eq!(m.note.as_deref(), Some(INITIAL_STOCK_NOTE));
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MovementKind::Remove).unwrap(), "\"remove\"");
    }
}
