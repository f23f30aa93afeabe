//! `brewstock-core`: identifiers, quantities, clocks and the shared error type.
//!
//! No storage or IO lives here.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod quantity;
pub mod value_object;
pub mod version;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{LotId, LotItemId, MovementId, ProductId};
pub use quantity::{QUANTITY_SCALE, Quantity};
pub use value_object::ValueObject;
pub use version::{ExpectedVersion, Versioned};
