mod price_cache;

pub use price_cache::{CacheEntry, PriceCache};
