use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use chrono::Utc;
use log::{info, warn};
use num_traits::Zero;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;

use super::epoch::project_epoch_value;
use super::joiner::{EpochSelection, JoinedRecord, RecordJoiner};
use crate::error::SugarError;
use crate::models::{
    CombinedRecord, EpochRecord, PoolRecord, RewardAmount, RewardValue, TokenAddress, TokenRegistry,
};
use crate::pricing::PriceResolver;
use crate::utils::wei_to_decimal;

/// Voting weight is always 18-decimal.
const VOTES_DECIMALS: u8 = 18;

/// Options for one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub selection: EpochSelection,
    /// Drop pools that have no selected epoch.
    pub only_with_rewards: bool,
    /// Deadline for price resolution. Exceeding it cancels the pass.
    pub pass_timeout: Option<Duration>,
}

/// Rows built by an aggregation pass, plus the records that had to be skipped.
#[derive(Debug, Default)]
pub struct AggregationReport {
    pub records: Vec<CombinedRecord>,
    pub errors: Vec<SugarError>,
}

impl AggregationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Joins pools with epochs, prices every token involved in one batch and
/// derives the USD figures of each [`CombinedRecord`].
pub struct MetricsAggregator {
    resolver: Arc<PriceResolver>,
    epoch_duration: Duration,
}

impl MetricsAggregator {
    pub fn new(resolver: Arc<PriceResolver>, epoch_duration: Duration) -> Self {
        Self {
            resolver,
            epoch_duration,
        }
    }

    pub async fn aggregate(
        &self,
        pools: &[PoolRecord],
        epochs: &[EpochRecord],
        tokens: &TokenRegistry,
        options: &AggregateOptions,
    ) -> Result<AggregationReport, SugarError> {
        self.aggregate_with_cancel(pools, epochs, tokens, options, CancellationToken::new())
            .await
    }

    /// Like [`aggregate`](Self::aggregate), but stops as soon as `cancel` fires.
    ///
    /// A cancelled or timed-out pass returns [`SugarError::Cancelled`] and
    /// discards whatever was resolved so far. Prices already cached stay cached.
    pub async fn aggregate_with_cancel(
        &self,
        pools: &[PoolRecord],
        epochs: &[EpochRecord],
        tokens: &TokenRegistry,
        options: &AggregateOptions,
        cancel: CancellationToken,
    ) -> Result<AggregationReport, SugarError> {
        let joined = RecordJoiner::new(options.selection)
            .only_with_rewards(options.only_with_rewards)
            .join(pools, epochs);

        let required = required_tokens(&joined.records);

        let deadline = async {
            match options.pass_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let prices = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("MetricsAggregator: Pass cancelled while resolving {} token(s)", required.len());
                return Err(SugarError::Cancelled);
            }
            _ = deadline => {
                warn!("MetricsAggregator: Pass exceeded its deadline while resolving {} token(s)", required.len());
                return Err(SugarError::Cancelled);
            }
            prices = self.resolver.resolve_prices(&required) => prices,
        };

        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let records = self.combine(&joined.records, &prices, tokens, now);

        let complete = records.iter().filter(|r| r.pricing_complete).count();
        info!(
            "MetricsAggregator: Built {} record(s) from {} pool(s), {}/{} tokens priced, {} fully priced, {} skipped",
            records.len(),
            pools.len(),
            prices.len(),
            required.len(),
            complete,
            joined.errors.len()
        );

        Ok(AggregationReport {
            records,
            errors: joined.errors,
        })
    }

    /// Derive combined rows from already-resolved prices. Output order follows `joined`.
    pub fn combine(
        &self,
        joined: &[JoinedRecord<'_>],
        prices: &FxHashMap<TokenAddress, BigDecimal>,
        tokens: &TokenRegistry,
        now: u64,
    ) -> Vec<CombinedRecord> {
        joined
            .iter()
            .map(|record| combine_record(record, prices, tokens, now, self.epoch_duration))
            .collect()
    }
}

/// Every token whose price some derived field of `joined` depends on, in first-use order.
pub fn required_tokens(joined: &[JoinedRecord<'_>]) -> Vec<TokenAddress> {
    let mut seen = FxHashSet::default();
    let mut required = Vec::new();
    let mut push = |token: TokenAddress| {
        if seen.insert(token) {
            required.push(token);
        }
    };

    for record in joined {
        push(record.pool.token0);
        push(record.pool.token1);

        if let Some(epoch) = record.epoch {
            if !epoch.emissions_wei.is_zero() {
                push(record.pool.emissions_token);
            }
            for reward in epoch.incentives.iter().chain(&epoch.gauge_fees) {
                if !reward.amount_wei.is_zero() {
                    push(reward.token);
                }
            }
        }
    }

    required
}

fn combine_record(
    joined: &JoinedRecord<'_>,
    prices: &FxHashMap<TokenAddress, BigDecimal>,
    tokens: &TokenRegistry,
    now: u64,
    epoch_duration: Duration,
) -> CombinedRecord {
    let pool = joined.pool;
    let price0 = prices.get(&pool.token0).cloned();
    let price1 = prices.get(&pool.token1).cloned();

    let decimals0 = tokens.decimals_of(&pool.token0);
    let decimals1 = tokens.decimals_of(&pool.token1);
    let reserve0 = to_units(pool.reserve0_wei, decimals0);
    let reserve1 = to_units(pool.reserve1_wei, decimals1);

    let tvl_usd = pair_value(
        reserve0.as_ref(),
        price0.as_ref(),
        reserve1.as_ref(),
        price1.as_ref(),
    );

    let mut record = CombinedRecord {
        pool: pool.clone(),
        epoch: joined.epoch.cloned(),
        reserve0,
        reserve1,
        votes: None,
        emissions: None,
        token0_price_usd: price0.clone(),
        token1_price_usd: price1.clone(),
        pricing_complete: tvl_usd.is_some(),
        tvl_usd,
        pool_fees_usd: None,
        projected_pool_fees_usd: None,
        incentives_usd: None,
        gauge_fees_usd: None,
        emissions_usd: None,
        incentive_breakdown: Vec::new(),
        gauge_fee_breakdown: Vec::new(),
    };

    let Some(epoch) = joined.epoch else {
        return record;
    };

    let fees0 = to_units(epoch.fees_token0_wei, decimals0);
    let fees1 = to_units(epoch.fees_token1_wei, decimals1);
    let pool_fees_usd = pair_value(
        fees0.as_ref(),
        price0.as_ref(),
        fees1.as_ref(),
        price1.as_ref(),
    );
    record.projected_pool_fees_usd = pool_fees_usd
        .as_ref()
        .and_then(|fees| project_epoch_value(fees, epoch.epoch_timestamp, now, epoch_duration));
    record.pool_fees_usd = pool_fees_usd;

    let emissions = to_units(
        epoch.emissions_wei,
        tokens.decimals_of(&pool.emissions_token),
    );
    record.emissions_usd = value_of(emissions.as_ref(), prices.get(&pool.emissions_token));
    record.emissions = emissions;
    record.votes = Some(wei_to_decimal(epoch.votes_wei, VOTES_DECIMALS));

    record.incentive_breakdown = value_rewards(&epoch.incentives, prices, tokens);
    record.incentives_usd = total_value(&record.incentive_breakdown);
    record.gauge_fee_breakdown = value_rewards(&epoch.gauge_fees, prices, tokens);
    record.gauge_fees_usd = total_value(&record.gauge_fee_breakdown);

    record.pricing_complete = record.pricing_complete
        && record.pool_fees_usd.is_some()
        && record.emissions_usd.is_some()
        && record.incentives_usd.is_some()
        && record.gauge_fees_usd.is_some();

    record
}

/// Token units of a wei amount. Zero needs no decimals; otherwise `None`
/// when the token's decimals were rejected.
fn to_units(wei: U256, decimals: Option<u8>) -> Option<BigDecimal> {
    if wei.is_zero() {
        return Some(BigDecimal::zero());
    }
    decimals.map(|d| wei_to_decimal(wei, d))
}

/// `amount0 * price0 + amount1 * price1`, `None` if any input is missing.
fn pair_value(
    amount0: Option<&BigDecimal>,
    price0: Option<&BigDecimal>,
    amount1: Option<&BigDecimal>,
    price1: Option<&BigDecimal>,
) -> Option<BigDecimal> {
    Some(amount0? * price0? + amount1? * price1?)
}

/// A zero amount is worth zero whether or not its token has a price.
fn value_of(amount: Option<&BigDecimal>, price: Option<&BigDecimal>) -> Option<BigDecimal> {
    let amount = amount?;
    if amount.is_zero() {
        return Some(BigDecimal::zero());
    }
    price.map(|p| amount * p)
}

fn value_rewards(
    rewards: &[RewardAmount],
    prices: &FxHashMap<TokenAddress, BigDecimal>,
    tokens: &TokenRegistry,
) -> Vec<RewardValue> {
    rewards
        .iter()
        .map(|reward| {
            let amount = to_units(reward.amount_wei, tokens.decimals_of(&reward.token));
            let price_usd = prices.get(&reward.token).cloned();
            let value_usd = value_of(amount.as_ref(), price_usd.as_ref());
            RewardValue {
                token: reward.token,
                amount,
                price_usd,
                value_usd,
            }
        })
        .collect()
}

fn total_value(values: &[RewardValue]) -> Option<BigDecimal> {
    values
        .iter()
        .try_fold(BigDecimal::zero(), |total, v| Some(total + v.value_usd.as_ref()?))
}
