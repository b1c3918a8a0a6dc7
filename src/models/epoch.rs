use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::TokenAddress;

/// A reward amount denominated in a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAmount {
    pub token: TokenAddress,
    pub amount_wei: U256,
}

/// Per-pool rewards for one epoch. Keyed by `(pool, epoch_timestamp)`.
///
/// `votes_wei` is veNFT voting weight (18 decimals). `emissions_wei` is
/// denominated in the pool's emissions token. `incentives` are the voting
/// incentives deposited for the epoch, `gauge_fees` the fees routed to the gauge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub pool: Address,
    pub epoch_timestamp: u64,
    pub votes_wei: U256,
    pub emissions_wei: U256,
    pub fees_token0_wei: U256,
    pub fees_token1_wei: U256,
    pub incentives: Vec<RewardAmount>,
    pub gauge_fees: Vec<RewardAmount>,
}

impl EpochRecord {
    pub fn key(&self) -> (Address, u64) {
        (self.pool, self.epoch_timestamp)
    }
}
