//! Fixed-point conversions.
//!
//! Wei amounts and oracle rates are turned into `BigDecimal` by adjusting the
//! scale of the integer, which is exact. Nothing here goes through `f64`.

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};

/// Scale of the rates returned by the spot price oracle.
pub const ORACLE_RATE_DECIMALS: u8 = 18;

// ============================================
// U256 Conversions
// ============================================

/// Convert alloy U256 to an arbitrary-precision integer.
pub fn u256_to_bigint(value: U256) -> BigInt {
    // Little-endian bytes avoid a round trip through a decimal string
    let bytes: [u8; 32] = value.to_le_bytes();
    BigInt::from_bytes_le(Sign::Plus, &bytes)
}

/// Convert a wei amount to token units.
///
/// # Example
/// ```ignore
/// let one = wei_to_decimal(U256::from(1_000_000u64), 6); // USDC
/// assert_eq!(one, BigDecimal::from(1));
/// ```
pub fn wei_to_decimal(value: U256, decimals: u8) -> BigDecimal {
    BigDecimal::new(u256_to_bigint(value), i64::from(decimals))
}

/// Convert a spot price oracle rate into a USD price per whole token.
///
/// The oracle returns `rate = 1e18 * dst_wei / src_wei`, so the price per whole
/// source token is `rate * 10^src_decimals / 10^(18 + dst_decimals)`.
pub fn oracle_rate_to_price(rate: U256, src_decimals: u8, dst_decimals: u8) -> BigDecimal {
    let scale = i64::from(ORACLE_RATE_DECIMALS) + i64::from(dst_decimals) - i64::from(src_decimals);
    BigDecimal::new(u256_to_bigint(rate), scale)
}
