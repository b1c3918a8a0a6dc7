use async_trait::async_trait;
use bigdecimal::BigDecimal;
use rustc_hash::FxHashMap;

use crate::error::SourceError;
use crate::models::{PriceSourceKind, TokenAddress};

/// Prices returned by one source call. Tokens the source could not price are absent.
pub type PriceMap = FxHashMap<TokenAddress, BigDecimal>;

/// A single independently queryable USD price source.
///
/// `Err` means the whole call failed (transport, timeout, error payload).
/// A successful call may still leave some tokens out or report them at zero;
/// the resolver treats both as "no usable price from this source".
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn kind(&self) -> PriceSourceKind;

    /// Whether one call may carry many tokens. Otherwise the resolver loops.
    fn supports_batch(&self) -> bool {
        true
    }

    async fn fetch_prices(&self, tokens: &[TokenAddress]) -> Result<PriceMap, SourceError>;
}
