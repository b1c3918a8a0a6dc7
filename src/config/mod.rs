#[allow(clippy::module_inception)]
mod config;

pub use config::{
    ChainSettings, CoinGeckoSettings, DefiLlamaSettings, MetricsSettings, OracleSettings,
    PaginationSettings, PricingSettings, Settings,
};
