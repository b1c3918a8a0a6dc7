//! Pool metrics derivation.
//!
//! - [`joiner`] - Pool / epoch matching and epoch selection
//! - [`epoch`] - Elapsed fraction and full-epoch projection
//! - [`aggregator`] - Price resolution and USD field derivation

pub mod aggregator;
pub mod epoch;
pub mod joiner;

pub use aggregator::{required_tokens, AggregateOptions, AggregationReport, MetricsAggregator};
pub use epoch::{elapsed_fraction, elapsed_seconds, project_epoch_value};
pub use joiner::{EpochSelection, JoinOutput, JoinedRecord, RecordJoiner};
