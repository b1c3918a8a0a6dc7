use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::TokenAddress;

/// Liquidity pool state as reported by the chain data source. Read-only here.
///
/// `pool_type` follows the on-chain convention: `-1` stable, `0` volatile,
/// a positive value is the tick spacing of a concentrated liquidity pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub address: Address,
    pub symbol: String,
    pub pool_type: i32,
    pub token0: TokenAddress,
    pub reserve0_wei: U256,
    pub token1: TokenAddress,
    pub reserve1_wei: U256,
    pub gauge: Address,
    pub gauge_alive: bool,
    pub emissions_token: TokenAddress,
    /// Swap fee in basis points.
    pub pool_fee_bps: u32,
    pub created_at: u64,
}
