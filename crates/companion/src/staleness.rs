//! Time gate in front of location processing.
//!
//! A new observation is only processed once enough wall-clock time has
//! passed since the last accepted one.

use chrono::{DateTime, Utc};

/// Whole hours, minutes and seconds of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hms {
    hours: u64,
    minutes: u64,
    seconds: u64,
}

impl Hms {
    fn from_secs(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

/// Decides whether an observation made at `now` should be processed.
///
/// * never accepted before: accept
/// * `threshold_secs == 0`: settings not synced yet, reject
/// * otherwise compare the (h, m, s) parts of the elapsed time against the
///   threshold's: accept if the hours exceed it, or if the seconds exceed
///   it while the minutes are at least equal.
///
/// The minutes are never compared on their own, so a threshold of 90 s
/// rejects an elapsed 125 s (seconds 5 < 30).
pub fn should_accept(
    last_accepted_at: Option<DateTime<Utc>>,
    threshold_secs: u64,
    now: DateTime<Utc>,
) -> bool {
    let Some(last) = last_accepted_at else {
        return true;
    };
    if threshold_secs == 0 {
        return false;
    }

    let elapsed_secs = u64::try_from((now - last).num_seconds()).unwrap_or(0);
    let elapsed = Hms::from_secs(elapsed_secs);
    let threshold = Hms::from_secs(threshold_secs);

    elapsed.hours > threshold.hours
        || (elapsed.seconds > threshold.seconds && elapsed.minutes >= threshold.minutes)
}

/// Process-local gate state; not persisted.
#[derive(Debug, Clone, Default)]
pub struct StalenessGate {
    last_accepted_at: Option<DateTime<Utc>>,
}

impl StalenessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies [`should_accept`] without recording anything.
    pub fn is_open(&self, threshold_secs: u64, now: DateTime<Utc>) -> bool {
        should_accept(self.last_accepted_at, threshold_secs, now)
    }

    /// Marks an observation taken at `now` as accepted.
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.last_accepted_at = Some(now);
    }

    /// Forgets the last acceptance so the next observation passes.
    pub fn reset(&mut self) {
        self.last_accepted_at = None;
    }

    pub fn last_accepted_at(&self) -> Option<DateTime<Utc>> {
        self.last_accepted_at
    }
}
