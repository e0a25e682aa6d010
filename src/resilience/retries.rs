//! Retry logic.
//!
//! # Responsibilities
//! - Bound the number of attempts per request
//! - Track which targets already failed for this request so a retry lands
//!   elsewhere when an alternative exists
//!
//! # Design Decisions
//! - Retries are an explicit loop over typed outcomes, not error unwinding
//! - No sleep between attempts; the per-attempt deadline bounds total latency
//! - Both timeouts and connection failures are retryable

use crate::health::Outcome;
use crate::load_balancer::target::TargetId;

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts allowed for one request.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Start tracking a single request.
    pub fn start(&self) -> RetryState {
        RetryState {
            max_attempts: self.max_attempts(),
            attempts: 0,
            failures: 0,
            failed: Vec::new(),
            last_failure: None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Per-request retry bookkeeping.
#[derive(Debug)]
pub struct RetryState {
    max_attempts: u32,
    attempts: u32,
    failures: u32,
    failed: Vec<TargetId>,
    last_failure: Option<Outcome>,
}

impl RetryState {
    /// Claim the next attempt, or `None` once the budget is spent.
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.attempts)
    }

    /// Remember a failed attempt against `target`.
    pub fn record_failure(&mut self, target: &TargetId, outcome: Outcome) {
        self.failures += 1;
        if !self.failed.contains(target) {
            self.failed.push(target.clone());
        }
        self.last_failure = Some(outcome);
    }

    /// Targets that already failed for this request.
    pub fn excluded(&self) -> &[TargetId] {
        &self.failed
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempts that reached a target and failed.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn last_failure(&self) -> Option<Outcome> {
        self.last_failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_budget() {
        let mut state = RetryPolicy::new(2).start();
        assert_eq!(state.next_attempt(), Some(1));
        assert_eq!(state.next_attempt(), Some(2));
        assert_eq!(state.next_attempt(), Some(3));
        assert_eq!(state.next_attempt(), None);
        assert_eq!(state.attempts(), 3);
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let mut state = RetryPolicy::new(0).start();
        assert_eq!(state.next_attempt(), Some(1));
        assert_eq!(state.next_attempt(), None);
    }

    #[test]
    fn test_failures_are_excluded_once() {
        let mut state = RetryPolicy::default().start();
        let id = TargetId::new("127.0.0.1:8001");
        state.record_failure(&id, Outcome::Timeout);
        state.record_failure(&id, Outcome::ConnectionFailure);
        assert_eq!(state.excluded(), &[id]);
        assert_eq!(state.failures(), 2);
        assert_eq!(state.last_failure(), Some(Outcome::ConnectionFailure));
    }
}
