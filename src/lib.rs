pub mod abis;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod utils;

pub use cache::PriceCache;
pub use chain::{ChainDataSource, ChainSnapshot, PaginationOptions};
pub use config::Settings;
pub use error::{SourceError, SugarError};
pub use metrics::{AggregateOptions, AggregationReport, EpochSelection, MetricsAggregator, RecordJoiner};
pub use models::{CombinedRecord, EpochRecord, PoolRecord, PricePoint, PriceSourceKind, TokenAddress};
pub use pricing::{PriceResolver, PriceSource};
