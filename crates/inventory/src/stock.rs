//! Stock arithmetic shared by the ledger transaction.

use rust_decimal::Decimal;

use brewstock_core::{DomainError, DomainResult, Quantity};

use crate::movement::StockDirection;

/// Validate an adjustment amount before anything is read or written.
pub fn adjustment_quantity(quantity: Decimal) -> DomainResult<Quantity> {
    if quantity <= Decimal::ZERO {
        return Err(DomainError::invalid_input("quantity must be greater than zero"));
    }
    let quantity = Quantity::new(quantity)?;
    if quantity.is_zero() {
        // Positive but rounds away at four fractional digits.
        return Err(DomainError::invalid_input("quantity must be greater than zero"));
    }
    Ok(quantity)
}

/// Next stock level, or `InvalidState` if it would go negative.
pub fn apply_adjustment(current: Quantity, direction: StockDirection, quantity: Quantity) -> DomainResult<Quantity> {
    match direction {
        StockDirection::Add => current
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invalid_state("stock overflow")),
        StockDirection::Remove => current
            .checked_sub(quantity)
            .ok_or_else(|| DomainError::invalid_state("stock cannot go negative")),
    }
}
