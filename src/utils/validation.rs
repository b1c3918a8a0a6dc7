//! Price and record validation.

use bigdecimal::BigDecimal;
use num_traits::Zero;

/// Upper bound on token decimals accepted from the chain data source.
/// ERC20 tokens in the wild use at most 24; anything far above is a broken contract.
pub const MAX_TOKEN_DECIMALS: u8 = 36;

/// A price is usable only when strictly positive. Zero is the oracle's "unset" sentinel.
#[inline]
pub fn is_usable_price(price: &BigDecimal) -> bool {
    *price > BigDecimal::zero()
}

#[inline]
pub fn is_valid_decimals(decimals: u8) -> bool {
    decimals <= MAX_TOKEN_DECIMALS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_usable_price() {
        assert!(is_usable_price(&BigDecimal::from_str("0.000001").unwrap()));
        assert!(!is_usable_price(&BigDecimal::zero()));
        assert!(!is_usable_price(&BigDecimal::from(-3)));
    }

    #[test]
    fn test_decimals_bound() {
        assert!(is_valid_decimals(18));
        assert!(is_valid_decimals(MAX_TOKEN_DECIMALS));
        assert!(!is_valid_decimals(MAX_TOKEN_DECIMALS + 1));
    }
}
