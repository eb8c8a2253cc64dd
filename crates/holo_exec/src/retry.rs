//! Retry policies consulted by the driver after a failed attempt.
//!
//! Policies are pure functions of the number of attempts launched so far for
//! a logical query; every attempt error counts as retryable.

use std::fmt;

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up; the query fails once no sibling attempt is still running.
    Stop,
    /// Resend to the host that just failed.
    SameHost,
    /// Resend to the next host in the query plan.
    NextHost,
}

pub trait RetryPolicy: fmt::Debug + Send + Sync {
    /// `attempts_so_far` is at least 1: the first attempt always runs first.
    fn decide(&self, attempts_so_far: u32) -> RetryDecision;
}

/// Allows up to `max_attempts` total attempts, all on the same host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedBudgetRetry {
    max_attempts: u32,
}

impl FixedBudgetRetry {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl RetryPolicy for FixedBudgetRetry {
    fn decide(&self, attempts_so_far: u32) -> RetryDecision {
        if attempts_so_far < self.max_attempts {
            RetryDecision::SameHost
        } else {
            RetryDecision::Stop
        }
    }
}

/// Same budget as [`FixedBudgetRetry`] but moves to the next host on every retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotatingRetry {
    max_attempts: u32,
}

impl RotatingRetry {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl RetryPolicy for RotatingRetry {
    fn decide(&self, attempts_so_far: u32) -> RetryDecision {
        if attempts_so_far < self.max_attempts {
            RetryDecision::NextHost
        } else {
            RetryDecision::Stop
        }
    }
}

/// Never retries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn decide(&self, _attempts_so_far: u32) -> RetryDecision {
        RetryDecision::Stop
    }
}
