//! Epoch progress and run-rate projection.

use std::time::Duration;

use bigdecimal::BigDecimal;

/// Seconds of the epoch that have passed, clamped to `[0, epoch_duration]`.
///
/// A `now` before the epoch start counts as zero elapsed time.
pub fn elapsed_seconds(epoch_start: u64, now: u64, epoch_duration: Duration) -> u64 {
    now.saturating_sub(epoch_start).min(epoch_duration.as_secs())
}

/// `min(1, (now - epoch_start) / epoch_duration)`, zero for a zero-length epoch.
pub fn elapsed_fraction(epoch_start: u64, now: u64, epoch_duration: Duration) -> BigDecimal {
    let duration = epoch_duration.as_secs();
    if duration == 0 {
        return BigDecimal::from(0);
    }

    BigDecimal::from(elapsed_seconds(epoch_start, now, epoch_duration)) / BigDecimal::from(duration)
}

/// Extrapolate a value accrued so far to the full epoch.
///
/// Computed as `value * duration / elapsed`, which equals `value / fraction`
/// without rounding the fraction first. `None` when no time has elapsed.
pub fn project_epoch_value(
    value: &BigDecimal,
    epoch_start: u64,
    now: u64,
    epoch_duration: Duration,
) -> Option<BigDecimal> {
    let elapsed = elapsed_seconds(epoch_start, now, epoch_duration);
    if elapsed == 0 {
        return None;
    }

    Some(value * BigDecimal::from(epoch_duration.as_secs()) / BigDecimal::from(elapsed))
}
