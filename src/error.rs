//! Error taxonomy for price resolution and aggregation.
//!
//! Source failures ([`SourceError`]) never leave the resolver: they trigger the
//! next source in the fallback chain. Record-level problems ([`SugarError::JoinConflict`],
//! [`SugarError::InvalidRecord`]) are reported next to whatever rows could still be built.

use alloy::primitives::Address;
use thiserror::Error;

use crate::models::PriceSourceKind;

/// Outcome of a failed call against a single price source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Transport error or timeout.
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The source answered with an error payload or a body we could not decode.
    #[error("source rejected request: {0}")]
    Rejected(String),
}

impl SourceError {
    /// Attach the source kind, lifting this into the crate-wide taxonomy.
    pub fn with_source(self, kind: PriceSourceKind) -> SugarError {
        match self {
            SourceError::Unavailable(reason) => SugarError::SourceUnavailable { kind, reason },
            SourceError::Rejected(reason) => SugarError::SourceRejected { kind, reason },
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() || e.is_status() {
            SourceError::Rejected(e.to_string())
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SugarError {
    #[error("{kind} unavailable: {reason}")]
    SourceUnavailable {
        kind: PriceSourceKind,
        reason: String,
    },

    #[error("{kind} rejected request: {reason}")]
    SourceRejected {
        kind: PriceSourceKind,
        reason: String,
    },

    #[error("duplicate epoch {epoch_timestamp} for pool {pool}")]
    JoinConflict { pool: Address, epoch_timestamp: u64 },

    #[error("invalid {record}: {reason}")]
    InvalidRecord { record: String, reason: String },

    #[error("pagination error in {method} at offset {offset}: {reason}")]
    Pagination {
        method: String,
        offset: usize,
        reason: String,
    },

    #[error("aggregation pass cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl SugarError {
    pub fn invalid_record(record: impl Into<String>, reason: impl Into<String>) -> Self {
        SugarError::InvalidRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }
}
