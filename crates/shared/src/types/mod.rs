//! Common types used across the application.

pub mod amount;
pub mod id;

pub use amount::{AMOUNT_SCALE, BALANCE_EPSILON, amounts_match, round_amount, within_tolerance};
pub use id::*;
