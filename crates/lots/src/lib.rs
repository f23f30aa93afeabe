//! Lot domain module: group-intake headers and their item records.

pub mod lot;

pub use lot::{ItemInput, Lot, LotHeader, LotItem, LotTarget, NEW_LOT_CLASSIFICATION};
