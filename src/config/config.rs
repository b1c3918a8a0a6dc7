use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use log::LevelFilter;
use serde::Deserialize;

/// Chain the resolver prices tokens on.
#[derive(Debug, Deserialize, Clone)]
pub struct ChainSettings {
    pub chain_id: u64,
    pub rpc_url: String,
}

/// On-chain Spot Price Aggregator configuration.
///
/// Rates are requested against `usd_token` (a USD stablecoin), routed through
/// `connectors`, and filtered by the oracle's liquidity `threshold`.
#[derive(Debug, Deserialize, Clone)]
pub struct OracleSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub address: Option<String>,
    pub usd_token: String,
    #[serde(default = "default_usd_token_decimals")]
    pub usd_token_decimals: u8,
    #[serde(default)]
    pub connectors: Vec<String>,
    #[serde(default = "default_oracle_threshold")]
    pub threshold: u64,
    #[serde(default)]
    pub use_wrappers: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_usd_token_decimals() -> u8 {
    6
}

fn default_oracle_threshold() -> u64 {
    10
}

/// CoinGecko (primary API) configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct CoinGeckoSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_coingecko_url")]
    pub base_url: String,
    /// Demo/pro API key, sent as `x-cg-demo-api-key`
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CoinGeckoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_coingecko_url(),
            api_key: None,
        }
    }
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

/// DefiLlama (secondary API) configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DefiLlamaSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_defillama_url")]
    pub base_url: String,
}

impl Default for DefiLlamaSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_defillama_url(),
        }
    }
}

fn default_defillama_url() -> String {
    "https://coins.llama.fi".to_string()
}

/// Price resolution configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct PricingSettings {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Bound on every single price source call
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
    #[serde(default)]
    pub coingecko: CoinGeckoSettings,
    #[serde(default)]
    pub defillama: DefiLlamaSettings,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            source_timeout_secs: default_source_timeout_secs(),
            coingecko: CoinGeckoSettings::default(),
            defillama: DefiLlamaSettings::default(),
        }
    }
}

impl PricingSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_source_timeout_secs() -> u64 {
    10
}

/// Metrics derivation configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MetricsSettings {
    #[serde(default = "default_epoch_duration_secs")]
    pub epoch_duration_secs: u64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            epoch_duration_secs: default_epoch_duration_secs(),
        }
    }
}

impl MetricsSettings {
    pub fn epoch_duration(&self) -> Duration {
        Duration::from_secs(self.epoch_duration_secs)
    }
}

fn default_epoch_duration_secs() -> u64 {
    7 * 24 * 60 * 60 // weekly epochs
}

/// Offset pagination against the chain data source.
#[derive(Debug, Deserialize, Clone)]
pub struct PaginationSettings {
    #[serde(default = "default_page_limit")]
    pub limit: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            limit: default_page_limit(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_page_limit() -> usize {
    500
}

fn default_max_retries() -> u32 {
    3
}

/// Root application configuration.
///
/// Loaded from `config.yaml` (or any extension the `config` crate understands)
/// at startup, then overridden by `SUGAR__SECTION__KEY` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub chain: ChainSettings,
    pub oracle: OracleSettings,
    #[serde(default)]
    pub pricing: PricingSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    /// Tokens the binary resolves on startup
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("config"))
                .add_source(Environment::with_prefix("SUGAR").separator("__"))
                .build()?,
        )
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;

        if settings.oracle.enabled && settings.oracle.address.is_none() {
            return Err(ConfigError::Message(
                "oracle.address is required when the oracle is enabled".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const MINIMAL: &str = r#"
chain:
  chain_id: 8453
  rpc_url: "https://mainnet.base.org"
oracle:
  address: "0xee717411f6E44F9feE011835C8E6FAaC5dEfF166"
  usd_token: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
"#;

    fn load(yaml: &str) -> Result<Settings, ConfigError> {
        Settings::from_config(
            Config::builder()
                .add_source(File::from_str(yaml, FileFormat::Yaml))
                .build()?,
        )
    }

    #[test]
    fn test_defaults() {
        let settings = load(MINIMAL).unwrap();

        assert_eq!(settings.pricing.cache_ttl(), Duration::from_secs(60));
        assert_eq!(settings.pricing.source_timeout(), Duration::from_secs(10));
        assert_eq!(settings.metrics.epoch_duration(), Duration::from_secs(604_800));
        assert_eq!(settings.oracle.usd_token_decimals, 6);
        assert_eq!(settings.pagination.limit, 500);
        assert!(settings.pricing.coingecko.enabled);
        assert!(settings.pricing.defillama.enabled);
        assert_eq!(settings.log_level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_oracle_address_required_when_enabled() {
        let yaml = r#"
chain:
  chain_id: 10
  rpc_url: "https://mainnet.optimism.io"
oracle:
  usd_token: "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"
"#;
        assert!(load(yaml).is_err());

        let disabled = format!("{yaml}  enabled: false\n");
        assert!(load(&disabled).is_ok());
    }

    #[test]
    fn test_overrides() {
        let yaml = format!(
            "{MINIMAL}pricing:\n  cache_ttl_secs: 5\n  coingecko:\n    enabled: false\nmetrics:\n  epoch_duration_secs: 3600\nlog_level: debug\n"
        );
        let settings = load(&yaml).unwrap();

        assert_eq!(settings.pricing.cache_ttl(), Duration::from_secs(5));
        assert!(!settings.pricing.coingecko.enabled);
        assert_eq!(settings.metrics.epoch_duration(), Duration::from_secs(3600));
        assert_eq!(settings.log_level_filter(), LevelFilter::Debug);
    }
}
