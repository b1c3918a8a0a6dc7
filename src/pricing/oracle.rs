use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use log::debug;
use rustc_hash::FxHashMap;

use super::decimals::DecimalsFetcher;
use super::source::{PriceMap, PriceSource};
use crate::abis::ISpotPriceOracle;
use crate::config::OracleSettings;
use crate::error::{SourceError, SugarError};
use crate::models::{PriceSourceKind, TokenAddress};
use crate::utils::{is_usable_price, oracle_rate_to_price};

/// On-chain spot price oracle source.
///
/// Prices a whole token set with a single `getManyRatesWithCustomConnectors`
/// call against the configured USD stablecoin. Rates are scaled with each
/// token's decimals; tokens whose decimals can't be read are left unpriced.
pub struct OracleSource {
    provider: DynProvider,
    oracle: Address,
    usd_token: TokenAddress,
    usd_decimals: u8,
    connectors: Vec<Address>,
    threshold: U256,
    use_wrappers: bool,
    decimals: DecimalsFetcher,
}

impl OracleSource {
    pub fn new(provider: DynProvider, settings: &OracleSettings) -> Result<Self, SugarError> {
        let oracle = settings
            .address
            .as_deref()
            .ok_or_else(|| config_error("oracle.address is not set"))?
            .parse::<Address>()
            .map_err(|e| config_error(format!("oracle.address: {e}")))?;

        let usd_token = settings
            .usd_token
            .parse::<TokenAddress>()
            .map_err(|e| config_error(format!("oracle.usd_token: {e}")))?;

        let connectors = settings
            .connectors
            .iter()
            .map(|c| c.parse::<Address>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| config_error(format!("oracle.connectors: {e}")))?;

        Ok(Self {
            decimals: DecimalsFetcher::new(provider.clone()),
            provider,
            oracle,
            usd_token,
            usd_decimals: settings.usd_token_decimals,
            connectors,
            threshold: U256::from(settings.threshold),
            use_wrappers: settings.use_wrappers,
        })
    }
}

fn config_error(message: impl Into<String>) -> SugarError {
    SugarError::Config(config::ConfigError::Message(message.into()))
}

#[async_trait]
impl PriceSource for OracleSource {
    fn kind(&self) -> PriceSourceKind {
        PriceSourceKind::Oracle
    }

    async fn fetch_prices(&self, tokens: &[TokenAddress]) -> Result<PriceMap, SourceError> {
        let mut prices = PriceMap::default();

        // The denomination token prices itself
        if tokens.contains(&self.usd_token) {
            prices.insert(self.usd_token, BigDecimal::from(1));
        }

        let decimals = self.decimals.get_decimals(tokens).await;
        let queried: Vec<TokenAddress> = tokens
            .iter()
            .filter(|t| **t != self.usd_token && decimals.contains_key(*t))
            .copied()
            .collect();

        if queried.is_empty() {
            return Ok(prices);
        }

        let oracle = ISpotPriceOracle::new(self.oracle, &self.provider);
        let rates = oracle
            .getManyRatesWithCustomConnectors(
                queried.iter().map(|t| t.address()).collect(),
                self.usd_token.address(),
                self.use_wrappers,
                self.connectors.clone(),
                self.threshold,
            )
            .call()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if rates.len() != queried.len() {
            return Err(SourceError::Rejected(format!(
                "oracle returned {} rates for {} tokens",
                rates.len(),
                queried.len()
            )));
        }

        let normalized = normalize_rates(&queried, &rates, &decimals, self.usd_decimals);
        debug!(
            "Oracle priced {}/{} tokens",
            normalized.len(),
            queried.len()
        );
        prices.extend(normalized);

        Ok(prices)
    }
}

/// Turn raw oracle rates into USD prices, dropping the zero "unpriced" sentinel.
pub fn normalize_rates(
    tokens: &[TokenAddress],
    rates: &[U256],
    decimals: &FxHashMap<TokenAddress, u8>,
    usd_decimals: u8,
) -> PriceMap {
    tokens
        .iter()
        .zip(rates)
        .filter_map(|(token, rate)| {
            let src_decimals = *decimals.get(token)?;
            let price = oracle_rate_to_price(*rate, src_decimals, usd_decimals);
            is_usable_price(&price).then_some((*token, price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8) -> TokenAddress {
        TokenAddress::new(Address::repeat_byte(byte))
    }

    #[test]
    fn test_normalize_rates_scales_by_decimals() {
        let weth = token(0x01);
        let wbtc = token(0x02);
        let decimals: FxHashMap<TokenAddress, u8> = [(weth, 18), (wbtc, 8)].into_iter().collect();

        // $2500 WETH and $60,000 WBTC against 6-decimal USDC
        let rates = [
            U256::from(2_500_000_000u64),
            U256::from(600_000_000_000_000_000_000u128),
        ];

        let prices = normalize_rates(&[weth, wbtc], &rates, &decimals, 6);

        assert_eq!(prices[&weth], BigDecimal::from(2500));
        assert_eq!(prices[&wbtc], BigDecimal::from(60_000));
    }

    #[test]
    fn test_normalize_rates_drops_zero_sentinel() {
        let priced = token(0x01);
        let unpriced = token(0x02);
        let decimals: FxHashMap<TokenAddress, u8> =
            [(priced, 18), (unpriced, 18)].into_iter().collect();

        let rates = [U256::from(1_000_000u64), U256::ZERO];
        let prices = normalize_rates(&[priced, unpriced], &rates, &decimals, 6);

        assert_eq!(prices.len(), 1);
        assert!(prices.contains_key(&priced));
        assert!(!prices.contains_key(&unpriced));
    }

    #[test]
    fn test_normalize_rates_skips_unknown_decimals() {
        let known = token(0x01);
        let unknown = token(0x02);
        let decimals: FxHashMap<TokenAddress, u8> = [(known, 18)].into_iter().collect();

        let rates = [U256::from(1_000_000u64), U256::from(1_000_000u64)];
        let prices = normalize_rates(&[known, unknown], &rates, &decimals, 6);

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&known], BigDecimal::from(1));
    }
}
