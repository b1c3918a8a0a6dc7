use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, warn};
use simple_logger::SimpleLogger;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use sugar::{PriceCache, PriceResolver, Settings, TokenAddress};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    SimpleLogger::new()
        .with_level(settings.log_level_filter())
        .init()
        .context("Failed to install logger")?;

    let tokens = settings
        .tokens
        .iter()
        .map(|t| t.parse::<TokenAddress>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid address in `tokens`")?;

    if tokens.is_empty() {
        warn!("No tokens configured, nothing to resolve");
        return Ok(());
    }

    let cache = PriceCache::new(settings.pricing.cache_capacity);
    let resolver =
        PriceResolver::from_settings(&settings, cache).context("Failed to build price resolver")?;

    info!(
        "Resolving {} token(s) on chain {}. Press Ctrl+C to stop.",
        tokens.len(),
        settings.chain.chain_id
    );

    tokio::select! {
        prices = resolver.get_prices_batch(&tokens) => {
            for token in &tokens {
                match prices.get(token).cloned().flatten() {
                    Some(point) => info!("  - {} ${} ({})", token, point.price_usd(), point.source()),
                    None => warn!("  - {} no price from any source", token),
                }
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C), exiting...");
        },
    }

    Ok(())
}
