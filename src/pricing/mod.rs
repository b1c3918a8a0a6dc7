pub mod coingecko;
pub mod decimals;
pub mod defillama;
pub mod oracle;
pub mod resolver;
pub mod source;

pub use coingecko::{coingecko_platform, parse_coingecko_prices, CoinGeckoSource};
pub use decimals::DecimalsFetcher;
pub use defillama::{defillama_chain, parse_defillama_prices, DefiLlamaSource};
pub use oracle::{normalize_rates, OracleSource};
pub use resolver::PriceResolver;
pub use source::{PriceMap, PriceSource};
