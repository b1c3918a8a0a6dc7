use alloy::primitives::Address;
use log::{info, warn};

use super::pagination::{collect_paginated, PaginationOptions};
use super::ChainDataSource;
use crate::error::SugarError;
use crate::metrics::{AggregateOptions, AggregationReport, MetricsAggregator};
use crate::models::{EpochRecord, PoolRecord, TokenRegistry};

/// Everything one aggregation pass needs, read from a chain data source.
#[derive(Debug, Default)]
pub struct ChainSnapshot {
    pub pools: Vec<PoolRecord>,
    pub epochs: Vec<EpochRecord>,
    pub tokens: TokenRegistry,
    /// Token records rejected while building the registry.
    pub errors: Vec<SugarError>,
}

impl ChainSnapshot {
    /// Page through pools, latest epochs and tokens.
    ///
    /// A listing that cannot be read fails the whole load; a single malformed
    /// token only lands in `errors`.
    pub async fn load(
        source: &dyn ChainDataSource,
        options: &PaginationOptions,
    ) -> Result<Self, SugarError> {
        let pools = collect_paginated("fetch_pools", options, move |limit, offset| {
            source.fetch_pools(limit, offset)
        })
        .await?;

        let epochs = Self::load_epochs(source, None, options).await?;

        let token_records = collect_paginated("fetch_tokens", options, move |limit, offset| {
            source.fetch_tokens(limit, offset)
        })
        .await?;

        let mut tokens = TokenRegistry::new();
        let mut errors = Vec::new();
        for record in token_records {
            if let Err(e) = tokens.insert(record) {
                warn!("Skipping token: {}", e);
                errors.push(e);
            }
        }

        info!(
            "Loaded snapshot: {} pool(s), {} epoch(s), {} token(s)",
            pools.len(),
            epochs.len(),
            tokens.len()
        );

        Ok(Self {
            pools,
            epochs,
            tokens,
            errors,
        })
    }

    /// Epochs for one pool, or for all pools when `pool` is `None`.
    pub async fn load_epochs(
        source: &dyn ChainDataSource,
        pool: Option<Address>,
        options: &PaginationOptions,
    ) -> Result<Vec<EpochRecord>, SugarError> {
        collect_paginated("fetch_epochs", options, move |limit, offset| {
            source.fetch_epochs(pool, limit, offset)
        })
        .await
    }

    /// Run one aggregation pass over the snapshot.
    ///
    /// Token records rejected at load time are reported ahead of the pass's own
    /// errors. Amounts in those tokens stay unconverted.
    pub async fn aggregate(
        &self,
        aggregator: &MetricsAggregator,
        options: &AggregateOptions,
    ) -> Result<AggregationReport, SugarError> {
        let mut report = aggregator
            .aggregate(&self.pools, &self.epochs, &self.tokens, options)
            .await?;

        let mut errors = self.tokens.rejection_errors();
        errors.append(&mut report.errors);
        report.errors = errors;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use alloy::primitives::U256;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::cache::PriceCache;
    use crate::models::{TokenAddress, TokenRecord};
    use crate::pricing::PriceResolver;

    struct InMemorySource {
        pools: Vec<PoolRecord>,
        epochs: Vec<EpochRecord>,
        tokens: Vec<TokenRecord>,
        broken_epochs: bool,
        epoch_calls: AtomicUsize,
    }

    fn page<T: Clone>(items: &[T], limit: usize, offset: usize) -> Vec<T> {
        items.iter().skip(offset).take(limit).cloned().collect()
    }

    #[async_trait]
    impl ChainDataSource for InMemorySource {
        async fn fetch_pools(&self, limit: usize, offset: usize) -> Result<Vec<PoolRecord>> {
            Ok(page(&self.pools, limit, offset))
        }

        async fn fetch_epochs(
            &self,
            pool: Option<Address>,
            limit: usize,
            offset: usize,
        ) -> Result<Vec<EpochRecord>> {
            self.epoch_calls.fetch_add(1, Ordering::SeqCst);
            if self.broken_epochs {
                return Err(anyhow!("execution reverted"));
            }
            let matching: Vec<EpochRecord> = self
                .epochs
                .iter()
                .filter(|e| pool.map_or(true, |p| e.pool == p))
                .cloned()
                .collect();
            Ok(page(&matching, limit, offset))
        }

        async fn fetch_tokens(&self, limit: usize, offset: usize) -> Result<Vec<TokenRecord>> {
            Ok(page(&self.tokens, limit, offset))
        }
    }

    fn pool(byte: u8) -> PoolRecord {
        PoolRecord {
            address: Address::repeat_byte(byte),
            symbol: format!("sAMM-{byte}"),
            pool_type: -1,
            token0: TokenAddress::new(Address::repeat_byte(0xa0)),
            reserve0_wei: U256::from(10u64),
            token1: TokenAddress::new(Address::repeat_byte(0xb0)),
            reserve1_wei: U256::from(20u64),
            gauge: Address::ZERO,
            gauge_alive: false,
            emissions_token: TokenAddress::ZERO,
            pool_fee_bps: 5,
            created_at: 0,
        }
    }

    fn epoch(pool: u8, ts: u64) -> EpochRecord {
        EpochRecord {
            pool: Address::repeat_byte(pool),
            epoch_timestamp: ts,
            votes_wei: U256::ZERO,
            emissions_wei: U256::ZERO,
            fees_token0_wei: U256::ZERO,
            fees_token1_wei: U256::ZERO,
            incentives: vec![],
            gauge_fees: vec![],
        }
    }

    fn token(byte: u8, decimals: u8) -> TokenRecord {
        TokenRecord {
            address: TokenAddress::new(Address::repeat_byte(byte)),
            symbol: format!("T{byte}"),
            decimals,
            listed: true,
        }
    }

    fn source(broken_epochs: bool) -> InMemorySource {
        InMemorySource {
            pools: (1..=7).map(pool).collect(),
            epochs: vec![epoch(1, 100), epoch(2, 100), epoch(1, 200)],
            tokens: vec![token(0xa0, 18), token(0xb0, 6), token(0xc0, 99)],
            broken_epochs,
            epoch_calls: AtomicUsize::new(0),
        }
    }

    fn options() -> PaginationOptions {
        PaginationOptions {
            limit: 3,
            retry_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_snapshot() {
        let source = source(false);
        let snapshot = ChainSnapshot::load(&source, &options()).await.unwrap();

        assert_eq!(snapshot.pools.len(), 7);
        assert_eq!(snapshot.pools[6].address, Address::repeat_byte(7));
        assert_eq!(snapshot.epochs.len(), 3);
        assert_eq!(snapshot.tokens.len(), 2);
        assert_eq!(snapshot.tokens.decimals_of(&TokenAddress::new(Address::repeat_byte(0xb0))), Some(6));

        // The 99-decimal token is reported, not fatal
        assert_eq!(snapshot.errors.len(), 1);
        assert!(matches!(snapshot.errors[0], SugarError::InvalidRecord { .. }));
    }

    #[tokio::test]
    async fn test_load_epochs_for_one_pool() {
        let source = source(false);
        let epochs = ChainSnapshot::load_epochs(&source, Some(Address::repeat_byte(1)), &options())
            .await
            .unwrap();

        assert_eq!(
            epochs.iter().map(|e| e.epoch_timestamp).collect::<Vec<_>>(),
            vec![100, 200]
        );
    }

    #[tokio::test]
    async fn test_unreadable_listing_fails_load() {
        let source = source(true);
        let result = ChainSnapshot::load(&source, &options()).await;

        assert!(matches!(
            result,
            Err(SugarError::Pagination { ref method, offset: 0, .. }) if method == "fetch_epochs"
        ));
        assert_eq!(source.epoch_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_aggregate_reports_rejected_tokens() {
        let mut source = source(false);
        source.pools[1].token1 = TokenAddress::new(Address::repeat_byte(0xc0));
        let snapshot = ChainSnapshot::load(&source, &options()).await.unwrap();

        let resolver = PriceResolver::new(
            PriceCache::new(10),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );
        let aggregator = MetricsAggregator::new(Arc::new(resolver), Duration::from_secs(604_800));
        let report = snapshot
            .aggregate(&aggregator, &AggregateOptions::default())
            .await
            .unwrap();

        assert_eq!(report.records.len(), 7);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0],
            SugarError::InvalidRecord { ref record, .. } if record.contains("0xc0c0")
        ));

        // Pool 2 holds the 99-decimal token
        let record = &report.records[1];
        assert_eq!(record.reserve1, None);
        assert_eq!(record.tvl_usd, None);
        assert!(!record.pricing_complete);
        assert!(report.records[0].reserve1.is_some());
    }
}
