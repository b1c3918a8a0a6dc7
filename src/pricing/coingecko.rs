/// CoinGecko token price API (primary API source)
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use log::debug;
use serde::Deserialize;
use serde_json::value::RawValue;

use super::source::{PriceMap, PriceSource};
use crate::config::CoinGeckoSettings;
use crate::error::{SourceError, SugarError};
use crate::models::{PriceSourceKind, TokenAddress};
use crate::utils::is_usable_price;

/// CoinGecko asset platform id for a chain. Unknown chains fall back to "ethereum".
pub fn coingecko_platform(chain_id: u64) -> &'static str {
    match chain_id {
        10 => "optimistic-ethereum",
        8453 => "base",
        34443 => "mode-network",
        1135 => "lisk",
        252 => "fraxtal",
        42220 => "celo",
        _ => "ethereum",
    }
}

#[derive(Debug, Deserialize)]
struct CoinGeckoPrice {
    usd: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoError {
    error: Option<String>,
    status: Option<serde_json::Value>,
}

pub struct CoinGeckoSource {
    client: reqwest::Client,
    base_url: String,
    platform: &'static str,
    api_key: Option<String>,
}

impl CoinGeckoSource {
    pub fn new(
        chain_id: u64,
        settings: &CoinGeckoSettings,
        timeout: Duration,
    ) -> Result<Self, SugarError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SugarError::Rpc(format!("failed to build CoinGecko client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            platform: coingecko_platform(chain_id),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn kind(&self) -> PriceSourceKind {
        PriceSourceKind::PrimaryApi
    }

    async fn fetch_prices(&self, tokens: &[TokenAddress]) -> Result<PriceMap, SourceError> {
        if tokens.is_empty() {
            return Ok(PriceMap::default());
        }

        let url = format!("{}/simple/token_price/{}", self.base_url, self.platform);
        let addresses = tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut request = self
            .client
            .get(&url)
            .query(&[("contract_addresses", addresses.as_str()), ("vs_currencies", "usd")]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Rejected(format!("HTTP {status}: {body}")));
        }

        let prices = parse_coingecko_prices(&body)?;
        debug!("CoinGecko priced {}/{} tokens", prices.len(), tokens.len());
        Ok(prices)
    }
}

/// Parse a `/simple/token_price` body: `{"0xabc..": {"usd": 1.23}, ..}`.
///
/// Prices are read from the raw JSON number text so no precision is lost to f64.
pub fn parse_coingecko_prices(body: &str) -> Result<PriceMap, SourceError> {
    if let Ok(err) = serde_json::from_str::<CoinGeckoError>(body) {
        if let Some(message) = err.error {
            return Err(SourceError::Rejected(message));
        }
        if let Some(status) = err.status {
            return Err(SourceError::Rejected(status.to_string()));
        }
    }

    let raw: HashMap<String, CoinGeckoPrice> =
        serde_json::from_str(body).map_err(|e| SourceError::Rejected(e.to_string()))?;

    let prices = raw
        .into_iter()
        .filter_map(|(address, entry)| {
            let token = address.parse::<TokenAddress>().ok()?;
            let price = BigDecimal::from_str(entry.usd?.get()).ok()?;
            is_usable_price(&price).then_some((token, price))
        })
        .collect();

    Ok(prices)
}
