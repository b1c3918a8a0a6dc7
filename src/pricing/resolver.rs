use std::sync::Arc;
use std::time::Duration;

use alloy::providers::{DynProvider, ProviderBuilder};
use bigdecimal::BigDecimal;
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use url::Url;

use super::coingecko::CoinGeckoSource;
use super::defillama::DefiLlamaSource;
use super::oracle::OracleSource;
use super::source::{PriceMap, PriceSource};
use crate::cache::PriceCache;
use crate::config::Settings;
use crate::error::{SourceError, SugarError};
use crate::models::{PricePoint, TokenAddress};

/// Ordered-fallback USD price resolver.
///
/// Resolution order is fixed: cache, then every configured source by
/// [`PriceSourceKind`](crate::models::PriceSourceKind) priority. Each source is
/// asked only for the tokens every earlier source left unpriced, so one batch
/// costs at most one call per batching source. Source failures and timeouts are
/// logged and treated as "no price"; a token nobody could price resolves to `None`.
pub struct PriceResolver {
    sources: Vec<Arc<dyn PriceSource>>,
    cache: PriceCache,
    cache_ttl: Duration,
    source_timeout: Duration,
}

impl PriceResolver {
    pub fn new(cache: PriceCache, cache_ttl: Duration, source_timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            cache,
            cache_ttl,
            source_timeout,
        }
    }

    /// Register a source. Sources are kept in fallback order whatever the call order.
    pub fn with_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.sources.push(source);
        self.sources.sort_by_key(|s| s.kind());
        self
    }

    /// Build the resolver with every source enabled in `settings`.
    pub fn from_settings(settings: &Settings, cache: PriceCache) -> Result<Self, SugarError> {
        let pricing = &settings.pricing;
        let mut resolver = Self::new(cache, pricing.cache_ttl(), pricing.source_timeout());

        if settings.oracle.enabled {
            let url = Url::parse(&settings.chain.rpc_url)
                .map_err(|e| SugarError::Rpc(format!("invalid rpc_url: {e}")))?;
            let provider = DynProvider::new(ProviderBuilder::new().connect_http(url));

            resolver = resolver.with_source(Arc::new(OracleSource::new(provider, &settings.oracle)?));
        }

        if pricing.coingecko.enabled {
            resolver = resolver.with_source(Arc::new(CoinGeckoSource::new(
                settings.chain.chain_id,
                &pricing.coingecko,
                pricing.source_timeout(),
            )?));
        }

        if pricing.defillama.enabled {
            resolver = resolver.with_source(Arc::new(DefiLlamaSource::new(
                settings.chain.chain_id,
                &pricing.defillama,
                pricing.source_timeout(),
            )?));
        }

        info!(
            "Price resolver ready with {} source(s): {}",
            resolver.sources.len(),
            resolver
                .sources
                .iter()
                .map(|s| s.kind().as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(resolver)
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Resolve a single token through the batch path.
    pub async fn get_price(&self, token: TokenAddress) -> Option<PricePoint> {
        self.get_prices_batch(&[token]).await.remove(&token).flatten()
    }

    /// Resolve a set of tokens. Every distinct input token is a key in the result.
    pub async fn get_prices_batch(
        &self,
        tokens: &[TokenAddress],
    ) -> FxHashMap<TokenAddress, Option<PricePoint>> {
        let mut resolved = FxHashMap::default();
        let mut seen = FxHashSet::default();
        let mut pending = Vec::new();

        for token in tokens {
            if !seen.insert(*token) {
                continue;
            }
            match self.cache.get(token).await {
                Some(point) => {
                    resolved.insert(*token, Some(point));
                },
                None => pending.push(*token),
            }
        }

        let cached = resolved.len();

        for source in &self.sources {
            if pending.is_empty() {
                break;
            }

            let prices = self.query_source(source.as_ref(), &pending).await;
            let mut unpriced = Vec::with_capacity(pending.len());

            for token in pending {
                let point = prices
                    .get(&token)
                    .cloned()
                    .and_then(|price| PricePoint::new(token, price, source.kind()));

                match point {
                    Some(point) => {
                        self.cache.set(token, point.clone(), self.cache_ttl).await;
                        resolved.insert(token, Some(point));
                    },
                    None => unpriced.push(token),
                }
            }

            if !unpriced.is_empty() {
                debug!(
                    "{} left {} token(s) unpriced, falling through",
                    source.kind(),
                    unpriced.len()
                );
            }
            pending = unpriced;
        }

        if !pending.is_empty() {
            warn!("No price from any source for {} token(s)", pending.len());
        }
        for token in pending {
            resolved.insert(token, None);
        }

        debug!(
            "Resolved {} token(s), {} from cache",
            resolved.len(),
            cached
        );

        resolved
    }

    /// Caller-facing lookup: USD price per token, unresolvable tokens left out.
    pub async fn resolve_prices(&self, tokens: &[TokenAddress]) -> FxHashMap<TokenAddress, BigDecimal> {
        self.get_prices_batch(tokens)
            .await
            .into_iter()
            .filter_map(|(token, point)| Some((token, point?.price_usd().clone())))
            .collect()
    }

    async fn query_source(&self, source: &dyn PriceSource, tokens: &[TokenAddress]) -> PriceMap {
        if source.supports_batch() {
            return self.call_source(source, tokens).await;
        }

        let mut prices = PriceMap::default();
        for token in tokens {
            prices.extend(self.call_source(source, std::slice::from_ref(token)).await);
        }
        prices
    }

    async fn call_source(&self, source: &dyn PriceSource, tokens: &[TokenAddress]) -> PriceMap {
        let outcome = tokio::time::timeout(self.source_timeout, source.fetch_prices(tokens))
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::Unavailable(format!(
                    "timed out after {:?}",
                    self.source_timeout
                )))
            });

        match outcome {
            Ok(prices) => prices,
            Err(e) => {
                warn!("{} for {} token(s)", e.with_source(source.kind()), tokens.len());
                PriceMap::default()
            },
        }
    }
}
