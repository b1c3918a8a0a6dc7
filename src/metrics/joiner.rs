use alloy::primitives::Address;
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::SugarError;
use crate::models::{EpochRecord, PoolRecord};

/// Which epochs are paired with each pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpochSelection {
    /// Only the epoch with the highest timestamp per pool.
    #[default]
    Latest,
    /// Every epoch with `from <= epoch_timestamp <= to`, oldest first.
    Window { from: u64, to: u64 },
}

impl EpochSelection {
    fn contains(&self, timestamp: u64) -> bool {
        match self {
            EpochSelection::Latest => true,
            EpochSelection::Window { from, to } => (*from..=*to).contains(&timestamp),
        }
    }
}

/// A pool paired with one of its selected epochs, or with none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedRecord<'a> {
    pub pool: &'a PoolRecord,
    pub epoch: Option<&'a EpochRecord>,
}

#[derive(Debug, Default)]
pub struct JoinOutput<'a> {
    /// In input pool order; a pool's epochs are oldest first.
    pub records: Vec<JoinedRecord<'a>>,
    pub errors: Vec<SugarError>,
}

/// Matches pools with their epoch rewards by pool address.
///
/// Bad input never aborts the join. Epochs sharing a `(pool, timestamp)` key
/// are all dropped and reported once as [`SugarError::JoinConflict`]; malformed
/// records are dropped and reported as [`SugarError::InvalidRecord`].
///
/// With [`EpochSelection::Latest`], a pool whose newest timestamp is one of the
/// conflicting keys has no usable latest epoch and is joined with none.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordJoiner {
    selection: EpochSelection,
    only_with_rewards: bool,
}

impl RecordJoiner {
    pub fn new(selection: EpochSelection) -> Self {
        Self {
            selection,
            only_with_rewards: false,
        }
    }

    /// Omit pools that end up with no epoch instead of emitting them with empty epoch fields.
    pub fn only_with_rewards(mut self, only_with_rewards: bool) -> Self {
        self.only_with_rewards = only_with_rewards;
        self
    }

    pub fn join<'a>(&self, pools: &'a [PoolRecord], epochs: &'a [EpochRecord]) -> JoinOutput<'a> {
        let mut errors = Vec::new();
        let by_pool = self.select_epochs(epochs, &mut errors);

        let mut records = Vec::with_capacity(pools.len());
        let mut seen = FxHashSet::default();

        for pool in pools {
            if !seen.insert(pool.address) {
                errors.push(SugarError::invalid_record(
                    format!("pool {}", pool.address),
                    "duplicate pool address, keeping the first occurrence",
                ));
                continue;
            }

            if pool.token0 == pool.token1 {
                errors.push(SugarError::invalid_record(
                    format!("pool {}", pool.address),
                    format!("token0 and token1 are both {}", pool.token0),
                ));
                continue;
            }

            match by_pool.get(&pool.address) {
                Some(selected) => records.extend(selected.iter().map(|epoch| JoinedRecord {
                    pool,
                    epoch: Some(*epoch),
                })),
                None if self.only_with_rewards => {},
                None => records.push(JoinedRecord { pool, epoch: None }),
            }
        }

        for error in &errors {
            warn!("Skipping record: {}", error);
        }

        JoinOutput { records, errors }
    }

    /// Validate epochs, drop conflicting keys, then apply the selection per pool.
    fn select_epochs<'a>(
        &self,
        epochs: &'a [EpochRecord],
        errors: &mut Vec<SugarError>,
    ) -> FxHashMap<Address, Vec<&'a EpochRecord>> {
        let mut key_counts: FxHashMap<(Address, u64), usize> = FxHashMap::default();
        for epoch in epochs {
            *key_counts.entry(epoch.key()).or_default() += 1;
        }

        let mut reported = FxHashSet::default();
        let mut newest_conflict: FxHashMap<Address, u64> = FxHashMap::default();
        let mut by_pool: FxHashMap<Address, Vec<&'a EpochRecord>> = FxHashMap::default();

        for epoch in epochs {
            if epoch.epoch_timestamp == 0 {
                errors.push(SugarError::invalid_record(
                    format!("epoch for pool {}", epoch.pool),
                    "epoch timestamp is zero",
                ));
                continue;
            }

            if key_counts[&epoch.key()] > 1 {
                if reported.insert(epoch.key()) {
                    errors.push(SugarError::JoinConflict {
                        pool: epoch.pool,
                        epoch_timestamp: epoch.epoch_timestamp,
                    });
                }
                let newest = newest_conflict.entry(epoch.pool).or_default();
                *newest = (*newest).max(epoch.epoch_timestamp);
                continue;
            }

            if self.selection.contains(epoch.epoch_timestamp) {
                by_pool.entry(epoch.pool).or_default().push(epoch);
            }
        }

        for selected in by_pool.values_mut() {
            selected.sort_by_key(|e| e.epoch_timestamp);
            if self.selection == EpochSelection::Latest {
                if let Some(latest) = selected.pop() {
                    *selected = vec![latest];
                }
            }
        }

        if self.selection == EpochSelection::Latest {
            // An older epoch must not stand in for a newest one that conflicted
            by_pool.retain(|pool, selected| match newest_conflict.get(pool) {
                Some(conflict) => selected.iter().all(|e| e.epoch_timestamp > *conflict),
                None => true,
            });
        }

        by_pool
    }
}
