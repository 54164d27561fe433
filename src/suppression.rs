//! Per-target error log suppression.
//!
//! A target that stays unreachable would otherwise produce one error line per
//! scrape. The tracker counts consecutive failures per [`TargetKey`] and lets
//! the caller log only the first [`ERROR_LOG_THRESHOLD`] of them, plus a
//! single notice when logging is paused. The first success removes the entry.
//!
//! Entries live until their target succeeds again; there is no expiry. A large
//! set of permanently dead targets therefore grows the map without bound,
//! which is only acceptable for an operator-controlled target list.

use ahash::RandomState;
use dashmap::DashMap;

use crate::target::TargetKey;

/// Number of failures logged per target between successful probes.
pub const ERROR_LOG_THRESHOLD: u32 = 10;

/// Outcome of recording one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureVerdict {
    /// The failure should be written to the log.
    pub should_log: bool,
    /// This failure reached the threshold; emit the "pausing" notice once.
    pub just_suppressed: bool,
    /// Consecutive failures counted so far, capped at the threshold.
    pub consecutive_failures: u32,
}

/// Consecutive-failure counters keyed by target.
///
/// Lookup, increment and removal for one key happen under that key's shard
/// lock, so concurrent probes of the same target cannot lose updates or emit
/// the pause notice twice.
pub struct ErrorSuppression {
    entries: DashMap<TargetKey, u32, RandomState>,
    threshold: u32,
}

impl Default for ErrorSuppression {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSuppression {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            threshold: ERROR_LOG_THRESHOLD,
        }
    }

    /// Records a failed probe for `key`.
    pub fn record_failure(&self, key: &TargetKey) -> FailureVerdict {
        let mut count = self.entries.entry(key.clone()).or_insert(0);

        if *count >= self.threshold {
            return FailureVerdict {
                should_log: false,
                just_suppressed: false,
                consecutive_failures: *count,
            };
        }

        *count += 1;
        FailureVerdict {
            should_log: true,
            just_suppressed: *count == self.threshold,
            consecutive_failures: *count,
        }
    }

    /// Records a successful probe, returning the failure count that was cleared.
    pub fn record_success(&self, key: &TargetKey) -> Option<u32> {
        self.entries.remove(key).map(|(_, count)| count)
    }

    /// Current consecutive failure count for `key`, if it is failing.
    pub fn failures(&self, key: &TargetKey) -> Option<u32> {
        self.entries.get(key).map(|count| *count)
    }

    pub fn is_suppressed(&self, key: &TargetKey) -> bool {
        self.failures(key).is_some_and(|count| count >= self.threshold)
    }

    /// Number of targets with at least one unrecovered failure.
    pub fn failing_targets(&self) -> usize {
        self.entries.len()
    }

    /// Number of targets whose error logging is currently paused.
    pub fn suppressed_targets(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| *entry.value() >= self.threshold)
            .count()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
