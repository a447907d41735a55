//! Decimal amount helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every stored balance carries exactly two fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept on every stored amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Smallest difference treated as a real imbalance (0.01).
pub const BALANCE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds an amount to two decimal places using banker's rounding.
#[must_use]
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Returns true if two amounts differ by strictly less than one cent.
#[must_use]
pub fn amounts_match(left: Decimal, right: Decimal) -> bool {
    (left - right).abs() < BALANCE_EPSILON
}

/// Returns true if two amounts differ by at most `tolerance`.
#[must_use]
pub fn within_tolerance(left: Decimal, right: Decimal, tolerance: Decimal) -> bool {
    (left - right).abs() <= tolerance
}
