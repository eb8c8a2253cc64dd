//! Speculative execution policies.
//!
//! The original attempt always launches immediately. While it is still
//! outstanding, the policy says how long to wait before racing another
//! attempt against a different host, and when to stop adding attempts.

use std::fmt;
use std::time::Duration;

/// Scheduling decision for the next speculative attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeculativeDecision {
    LaunchNow,
    LaunchAfter(Duration),
    NoMoreAttempts,
}

pub trait SpeculativePolicy: fmt::Debug + Send + Sync {
    /// Delay before launching attempt `attempt_index + 1`, where
    /// `attempt_index` additional attempts have already been launched (0 means
    /// only the original is running). `None` once the parallel limit is hit.
    fn next_delay(&self, attempt_index: u32) -> Option<Duration>;

    /// Folds the time already spent since the previous launch into the delay.
    fn decision(&self, attempt_index: u32, since_last_launch: Duration) -> SpeculativeDecision {
        match self.next_delay(attempt_index) {
            None => SpeculativeDecision::NoMoreAttempts,
            Some(delay) => match delay.checked_sub(since_last_launch) {
                Some(remaining) if !remaining.is_zero() => {
                    SpeculativeDecision::LaunchAfter(remaining)
                }
                _ => SpeculativeDecision::LaunchNow,
            },
        }
    }
}

/// At most `max_attempts` parallel attempts, spaced by a fixed `delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimpleSpeculative {
    max_attempts: u32,
    delay: Duration,
}

impl SimpleSpeculative {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl SpeculativePolicy for SimpleSpeculative {
    fn next_delay(&self, attempt_index: u32) -> Option<Duration> {
        if attempt_index.saturating_add(1) < self.max_attempts {
            Some(self.delay)
        } else {
            None
        }
    }
}

/// Never launches speculative attempts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoSpeculation;

impl SpeculativePolicy for NoSpeculation {
    fn next_delay(&self, _attempt_index: u32) -> Option<Duration> {
        None
    }
}
