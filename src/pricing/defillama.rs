/// DefiLlama coins API (secondary API source)
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use log::debug;
use serde::Deserialize;
use serde_json::value::RawValue;

use super::source::{PriceMap, PriceSource};
use crate::config::DefiLlamaSettings;
use crate::error::{SourceError, SugarError};
use crate::models::{PriceSourceKind, TokenAddress};
use crate::utils::is_usable_price;

/// DefiLlama chain slug for a chain. Unknown chains fall back to "ethereum".
pub fn defillama_chain(chain_id: u64) -> &'static str {
    match chain_id {
        10 => "optimism",
        8453 => "base",
        34443 => "mode",
        1135 => "lisk",
        252 => "fraxtal",
        57073 => "ink",
        1868 => "soneium",
        1750 => "metal",
        42220 => "celo",
        5330 => "superseed",
        1923 => "swell",
        130 => "unichain",
        _ => "ethereum",
    }
}

#[derive(Debug, Deserialize)]
struct CoinsResponse {
    #[serde(default)]
    coins: HashMap<String, CoinPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    price: Option<Box<RawValue>>,
}

pub struct DefiLlamaSource {
    client: reqwest::Client,
    base_url: String,
    chain: &'static str,
}

impl DefiLlamaSource {
    pub fn new(
        chain_id: u64,
        settings: &DefiLlamaSettings,
        timeout: Duration,
    ) -> Result<Self, SugarError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SugarError::Rpc(format!("failed to build DefiLlama client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            chain: defillama_chain(chain_id),
        })
    }
}

#[async_trait]
impl PriceSource for DefiLlamaSource {
    fn kind(&self) -> PriceSourceKind {
        PriceSourceKind::SecondaryApi
    }

    async fn fetch_prices(&self, tokens: &[TokenAddress]) -> Result<PriceMap, SourceError> {
        if tokens.is_empty() {
            return Ok(PriceMap::default());
        }

        let coins = tokens
            .iter()
            .map(|t| format!("{}:{}", self.chain, t))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/prices/current/{}", self.base_url, coins);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Rejected(format!("HTTP {status}: {body}")));
        }

        let prices = parse_defillama_prices(&body)?;
        debug!("DefiLlama priced {}/{} tokens", prices.len(), tokens.len());
        Ok(prices)
    }
}

/// Parse a `/prices/current` body: `{"coins": {"base:0xabc..": {"price": 1.23, ..}}}`.
///
/// Prices keep every digit of the JSON number text.
pub fn parse_defillama_prices(body: &str) -> Result<PriceMap, SourceError> {
    let response: CoinsResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Rejected(e.to_string()))?;

    let prices = response
        .coins
        .into_iter()
        .filter_map(|(key, coin)| {
            let (_, address) = key.split_once(':')?;
            let token = address.parse::<TokenAddress>().ok()?;
            let price = BigDecimal::from_str(coin.price?.get()).ok()?;
            is_usable_price(&price).then_some((token, price))
        })
        .collect();

    Ok(prices)
}
