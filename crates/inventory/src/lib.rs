//! Inventory domain module: products, the movement log and stock arithmetic.
//!
//! Pure, deterministic domain logic (no IO, no storage).

pub mod history;
pub mod movement;
pub mod product;
pub mod stock;

pub use history::{DateRange, HistoryEntry, HistoryFilter, project_history};
pub use movement::{INITIAL_STOCK_NOTE, Movement, MovementKind, StockDirection};
pub use product::{MAX_NOTE_CHARS, NewProduct, Product, ProductPatch, normalize_note, parse_expiry};
pub use stock::{adjustment_quantity, apply_adjustment};
