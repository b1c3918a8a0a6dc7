use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SugarError;
use crate::utils::MAX_TOKEN_DECIMALS;

/// Decimals assumed for tokens missing from the registry.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// 20-byte token address, the only key used for pricing and joins.
///
/// Parsing accepts any hex casing; display is always lowercase with a `0x`
/// prefix so two spellings of the same address never produce two cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TokenAddress(Address);

impl TokenAddress {
    pub const ZERO: TokenAddress = TokenAddress(Address::ZERO);

    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == Address::ZERO
    }
}

impl From<Address> for TokenAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<TokenAddress> for Address {
    fn from(token: TokenAddress) -> Self {
        token.0
    }
}

impl FromStr for TokenAddress {
    type Err = SugarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Address>()
            .map(Self)
            .map_err(|e| SugarError::invalid_record("token address", format!("{s:?}: {e}")))
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for TokenAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Token metadata as listed by the chain data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub address: TokenAddress,
    pub symbol: String,
    pub decimals: u8,
    pub listed: bool,
}

/// Token metadata indexed by address.
///
/// Used for every wei to token-unit conversion. Unknown tokens fall back to
/// [`DEFAULT_TOKEN_DECIMALS`]. A token whose record was rejected has no usable
/// decimals at all: amounts in it can't be converted.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: FxHashMap<TokenAddress, TokenRecord>,
    /// Declared decimals of rejected records.
    rejected: FxHashMap<TokenAddress, u8>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token. The first record for an address wins, rejected or not.
    pub fn insert(&mut self, record: TokenRecord) -> Result<(), SugarError> {
        if self.tokens.contains_key(&record.address) || self.rejected.contains_key(&record.address) {
            return Ok(());
        }

        if record.decimals > MAX_TOKEN_DECIMALS {
            self.rejected.insert(record.address, record.decimals);
            return Err(Self::rejection(record.address, record.decimals));
        }

        self.tokens.insert(record.address, record);
        Ok(())
    }

    fn rejection(address: TokenAddress, decimals: u8) -> SugarError {
        SugarError::invalid_record(
            format!("token {}", address),
            format!(
                "{} decimals exceeds maximum of {}",
                decimals, MAX_TOKEN_DECIMALS
            ),
        )
    }

    pub fn get(&self, token: &TokenAddress) -> Option<&TokenRecord> {
        self.tokens.get(token)
    }

    /// Decimals to scale `token` amounts by. `None` if its record was rejected.
    pub fn decimals_of(&self, token: &TokenAddress) -> Option<u8> {
        if self.rejected.contains_key(token) {
            return None;
        }

        Some(
            self.tokens
                .get(token)
                .map(|t| t.decimals)
                .unwrap_or(DEFAULT_TOKEN_DECIMALS),
        )
    }

    pub fn is_rejected(&self, token: &TokenAddress) -> bool {
        self.rejected.contains_key(token)
    }

    /// One [`SugarError::InvalidRecord`] per rejected token, ordered by address.
    pub fn rejection_errors(&self) -> Vec<SugarError> {
        let mut rejected: Vec<_> = self.rejected.iter().collect();
        rejected.sort_by_key(|(address, _)| **address);

        rejected
            .into_iter()
            .map(|(address, decimals)| Self::rejection(*address, *decimals))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    #[test]
    fn test_address_is_case_normalized() {
        let mixed: TokenAddress = USDC_BASE.parse().unwrap();
        let lower: TokenAddress = USDC_BASE.to_lowercase().parse().unwrap();

        assert_eq!(mixed, lower);
        assert_eq!(mixed.to_string(), USDC_BASE.to_lowercase());
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        assert!("0x1234".parse::<TokenAddress>().is_err());
        assert!("not an address".parse::<TokenAddress>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_hex() {
        let token: TokenAddress = USDC_BASE.parse().unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{}\"", USDC_BASE.to_lowercase()));

        let back: TokenAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn test_registry_defaults_unknown_decimals() {
        let usdc: TokenAddress = USDC_BASE.parse().unwrap();
        let mut registry = TokenRegistry::new();
        registry
            .insert(TokenRecord {
                address: usdc,
                symbol: "USDC".to_string(),
                decimals: 6,
                listed: true,
            })
            .unwrap();

        assert_eq!(registry.decimals_of(&usdc), Some(6));
        assert_eq!(registry.decimals_of(&TokenAddress::ZERO), Some(DEFAULT_TOKEN_DECIMALS));
    }

    #[test]
    fn test_registry_rejects_absurd_decimals() {
        let mut registry = TokenRegistry::new();
        let result = registry.insert(TokenRecord {
            address: TokenAddress::ZERO,
            symbol: "BAD".to_string(),
            decimals: 77,
            listed: false,
        });

        assert!(matches!(result, Err(SugarError::InvalidRecord { .. })));
        assert!(registry.is_empty());

        // The rejected token is not silently treated as 18-decimal
        assert!(registry.is_rejected(&TokenAddress::ZERO));
        assert_eq!(registry.decimals_of(&TokenAddress::ZERO), None);
        assert_eq!(registry.rejection_errors().len(), 1);
    }

    #[test]
    fn test_registry_first_record_wins() {
        let mut registry = TokenRegistry::new();
        let token = |decimals| TokenRecord {
            address: TokenAddress::ZERO,
            symbol: "T".to_string(),
            decimals,
            listed: true,
        };

        registry.insert(token(40)).unwrap_err();
        registry.insert(token(6)).unwrap();

        assert_eq!(registry.decimals_of(&TokenAddress::ZERO), None);
        assert!(registry.is_empty());
    }
}
