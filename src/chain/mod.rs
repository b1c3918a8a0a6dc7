//! Read side of the chain data source.
//!
//! The core only consumes already-finalized state, through offset/limit listings.

pub mod pagination;
pub mod snapshot;

use alloy::primitives::Address;
use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EpochRecord, PoolRecord, TokenRecord};

pub use pagination::{collect_paginated, PaginationOptions};
pub use snapshot::ChainSnapshot;

/// Paginated listings of pools, epochs and tokens. An empty page ends a listing.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    async fn fetch_pools(&self, limit: usize, offset: usize) -> Result<Vec<PoolRecord>>;

    /// Latest epochs of every pool, or every epoch of `pool` when given.
    async fn fetch_epochs(
        &self,
        pool: Option<Address>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EpochRecord>>;

    async fn fetch_tokens(&self, limit: usize, offset: usize) -> Result<Vec<TokenRecord>>;
}
