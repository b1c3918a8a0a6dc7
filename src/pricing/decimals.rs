use std::time::Duration;

use alloy::providers::{DynProvider, MULTICALL3_ADDRESS};
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use log::debug;
use moka::future::Cache;
use rustc_hash::FxHashMap;

use crate::abis::{Call3, IMulticall3, IERC20};
use crate::models::TokenAddress;
use crate::utils::is_valid_decimals;

/// Maximum retries for multicall
const MAX_RETRIES: u32 = 3;

/// Delay between retries (exponential backoff base)
const RETRY_DELAY_MS: u64 = 100;

/// Timeout for individual RPC calls
const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Token decimals reader used to scale oracle rates.
///
/// Decimals never change, so successful reads are cached without expiry.
/// Tokens that fail to answer `decimals()` are remembered for an hour so every
/// pass doesn't retry them.
#[derive(Clone)]
pub struct DecimalsFetcher {
    provider: DynProvider,
    known: Cache<TokenAddress, u8>,
    invalid_tokens: Cache<TokenAddress, ()>,
}

impl DecimalsFetcher {
    /// Batch size for multicall requests to avoid RPC congestion/timeouts
    const MULTICALL_BATCH_SIZE: usize = 100;

    pub fn new(provider: DynProvider) -> Self {
        let known = Cache::builder().max_capacity(100_000).build();

        let invalid_tokens = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Self {
            provider,
            known,
            invalid_tokens,
        }
    }

    /// Decimals for every token that could be read. Unreadable tokens are absent.
    pub async fn get_decimals(&self, tokens: &[TokenAddress]) -> FxHashMap<TokenAddress, u8> {
        let mut result = FxHashMap::default();
        let mut missing = Vec::new();

        for token in tokens {
            if let Some(decimals) = self.known.get(token).await {
                result.insert(*token, decimals);
            } else if !self.invalid_tokens.contains_key(token) {
                missing.push(*token);
            }
        }

        if missing.is_empty() {
            return result;
        }

        let mut fetched = Vec::with_capacity(missing.len());
        for chunk in missing.chunks(Self::MULTICALL_BATCH_SIZE) {
            fetched.extend(self.fetch_chunk_with_retry(chunk).await);
        }

        // Zip the requested tokens with the fetched results
        for (token, maybe_decimals) in missing.iter().zip(fetched) {
            match maybe_decimals {
                Some(decimals) => {
                    self.known.insert(*token, decimals).await;
                    result.insert(*token, decimals);
                },
                None => {
                    debug!("No decimals for {}, oracle will skip it", token);
                    self.invalid_tokens.insert(*token, ()).await;
                },
            }
        }

        result
    }

    async fn fetch_chunk_with_retry(&self, tokens: &[TokenAddress]) -> Vec<Option<u8>> {
        for attempt in 0..MAX_RETRIES {
            match self.fetch_chunk(tokens).await {
                Ok(decimals) => return decimals,
                Err(e) => {
                    debug!("Decimals multicall attempt {} failed: {:#}", attempt + 1, e);
                    if attempt < MAX_RETRIES - 1 {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(attempt));
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        // All retries failed - try individual reads as fallback
        self.fetch_individually(tokens).await
    }

    async fn fetch_individually(&self, tokens: &[TokenAddress]) -> Vec<Option<u8>> {
        let tasks = tokens.iter().map(|token| self.fetch_single(*token));
        futures::future::join_all(tasks).await
    }

    async fn fetch_single(&self, token: TokenAddress) -> Option<u8> {
        let contract = IERC20::new(token.address(), &self.provider);

        match tokio::time::timeout(RPC_CALL_TIMEOUT, contract.decimals().call()).await {
            Ok(Ok(d)) if is_valid_decimals(d) => Some(d),
            _ => None,
        }
    }

    async fn fetch_chunk(&self, tokens: &[TokenAddress]) -> Result<Vec<Option<u8>>> {
        let multicall = IMulticall3::new(MULTICALL3_ADDRESS, &self.provider);

        let calls: Vec<Call3> = tokens
            .iter()
            .map(|token| Call3 {
                target: token.address(),
                allowFailure: true,
                callData: IERC20::decimalsCall {}.abi_encode().into(),
            })
            .collect();

        let results = tokio::time::timeout(RPC_CALL_TIMEOUT, multicall.aggregate3(calls).call())
            .await
            .context("Multicall timeout")?
            .context("Multicall aggregate3 failed")?;

        // Keep index alignment with the input tokens
        let decimals = (0..tokens.len())
            .map(|i| {
                let res = results.get(i)?;
                if !res.success {
                    return None;
                }
                IERC20::decimalsCall::abi_decode_returns(&res.returnData)
                    .ok()
                    .filter(|d| is_valid_decimals(*d))
            })
            .collect();

        Ok(decimals)
    }
}
