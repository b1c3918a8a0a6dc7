use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::TokenAddress;
use crate::utils::is_usable_price;

/// Where a price came from.
///
/// Declaration order is the fallback priority: the resolver sorts its sources
/// by this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceKind {
    Oracle,
    PrimaryApi,
    SecondaryApi,
}

impl PriceSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSourceKind::Oracle => "oracle",
            PriceSourceKind::PrimaryApi => "primary_api",
            PriceSourceKind::SecondaryApi => "secondary_api",
        }
    }
}

impl fmt::Display for PriceSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved USD price. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    token: TokenAddress,
    price_usd: BigDecimal,
    source: PriceSourceKind,
    observed_at: DateTime<Utc>,
}

impl PricePoint {
    /// Returns `None` unless the price is strictly positive.
    pub fn new(token: TokenAddress, price_usd: BigDecimal, source: PriceSourceKind) -> Option<Self> {
        Self::observed(token, price_usd, source, Utc::now())
    }

    pub fn observed(
        token: TokenAddress,
        price_usd: BigDecimal,
        source: PriceSourceKind,
        observed_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !is_usable_price(&price_usd) {
            return None;
        }

        Some(Self {
            token,
            price_usd,
            source,
            observed_at,
        })
    }

    pub fn token(&self) -> TokenAddress {
        self.token
    }

    pub fn price_usd(&self) -> &BigDecimal {
        &self.price_usd
    }

    pub fn source(&self) -> PriceSourceKind {
        self.source
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_non_positive_prices_are_rejected() {
        let zero = PricePoint::new(TokenAddress::ZERO, BigDecimal::from(0), PriceSourceKind::Oracle);
        let negative =
            PricePoint::new(TokenAddress::ZERO, BigDecimal::from(-1), PriceSourceKind::Oracle);

        assert!(zero.is_none());
        assert!(negative.is_none());
    }

    #[test]
    fn test_price_point_keeps_source() {
        let price = BigDecimal::from_str("1.50").unwrap();
        let point =
            PricePoint::new(TokenAddress::ZERO, price.clone(), PriceSourceKind::PrimaryApi).unwrap();

        assert_eq!(point.price_usd(), &price);
        assert_eq!(point.source(), PriceSourceKind::PrimaryApi);
    }

    #[test]
    fn test_priority_follows_declaration_order() {
        assert!(PriceSourceKind::Oracle < PriceSourceKind::PrimaryApi);
        assert!(PriceSourceKind::PrimaryApi < PriceSourceKind::SecondaryApi);
    }
}
