//! Utility functions.
//!
//! - [`conversion`] - Exact wei / oracle-rate to decimal conversions
//! - [`validation`] - Usable-price and record bounds

mod conversion;
mod validation;

// ============================================
// Re-exports
// ============================================

pub use conversion::{oracle_rate_to_price, u256_to_bigint, wei_to_decimal, ORACLE_RATE_DECIMALS};

pub use validation::{is_usable_price, is_valid_decimals, MAX_TOKEN_DECIMALS};
