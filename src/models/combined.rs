use bigdecimal::BigDecimal;
use serde::Serialize;

use super::{EpochRecord, PoolRecord, TokenAddress};

/// One priced reward line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardValue {
    pub token: TokenAddress,
    /// `None` when the token's decimals are unusable.
    pub amount: Option<BigDecimal>,
    pub price_usd: Option<BigDecimal>,
    pub value_usd: Option<BigDecimal>,
}

/// Pool and epoch data joined with derived USD figures.
///
/// Every `*_usd` field is `None` when one of the prices it depends on could not
/// be resolved, or when a token amount could not be scaled because the token's
/// decimals were rejected; `pricing_complete` is then `false`. Pool and epoch
/// fields are always set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRecord {
    #[serde(flatten)]
    pub pool: PoolRecord,
    #[serde(flatten)]
    pub epoch: Option<EpochRecord>,

    // Token-unit amounts
    pub reserve0: Option<BigDecimal>,
    pub reserve1: Option<BigDecimal>,
    pub votes: Option<BigDecimal>,
    pub emissions: Option<BigDecimal>,

    // Prices
    pub token0_price_usd: Option<BigDecimal>,
    pub token1_price_usd: Option<BigDecimal>,

    // Derived USD figures
    pub tvl_usd: Option<BigDecimal>,
    pub pool_fees_usd: Option<BigDecimal>,
    pub projected_pool_fees_usd: Option<BigDecimal>,
    pub incentives_usd: Option<BigDecimal>,
    pub gauge_fees_usd: Option<BigDecimal>,
    pub emissions_usd: Option<BigDecimal>,

    pub incentive_breakdown: Vec<RewardValue>,
    pub gauge_fee_breakdown: Vec<RewardValue>,

    pub pricing_complete: bool,
}
