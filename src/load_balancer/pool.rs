//! Target pool management.
//!
//! # Responsibilities
//! - Own the statically configured targets in configuration order
//! - Apply the load balancing algorithm to pick a target per request
//! - Expose read-only snapshots for operators

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::validation::parse_target;
use crate::config::PoolConfig;
use crate::health::QuarantinePolicy;
use crate::load_balancer::round_robin::RoundRobin;
use crate::load_balancer::target::{Target, TargetId, TargetSnapshot};
use crate::load_balancer::LoadBalancer;

/// Errors raised by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every target is quarantined.
    #[error("no healthy targets available")]
    NoHealthyTargets,

    #[error("target pool is empty")]
    Empty,

    #[error("invalid target address `{0}`")]
    InvalidTarget(String),

    #[error("duplicate target `{0}`")]
    DuplicateTarget(String),
}

/// The registry of backend targets plus the selection policy.
#[derive(Debug)]
pub struct TargetPool {
    targets: Vec<Arc<Target>>,
    balancer: Box<dyn LoadBalancer>,
}

impl TargetPool {
    /// Build a round-robin pool from target addresses.
    pub fn new<S: AsRef<str>>(addresses: &[S], policy: &QuarantinePolicy) -> Result<Self, PoolError> {
        Self::with_balancer(addresses, policy, Box::new(RoundRobin::new()))
    }

    pub fn with_balancer<S: AsRef<str>>(
        addresses: &[S],
        policy: &QuarantinePolicy,
        balancer: Box<dyn LoadBalancer>,
    ) -> Result<Self, PoolError> {
        if addresses.is_empty() {
            return Err(PoolError::Empty);
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(addresses.len());
        for address in addresses {
            let address = address.as_ref();
            let authority =
                parse_target(address).ok_or_else(|| PoolError::InvalidTarget(address.to_string()))?;
            if !seen.insert(authority.as_str().to_ascii_lowercase()) {
                return Err(PoolError::DuplicateTarget(address.to_string()));
            }
            targets.push(Arc::new(Target::new(authority, policy)));
        }

        tracing::info!(
            targets = targets.len(),
            failure_threshold = policy.failure_threshold,
            quarantine_ms = policy.quarantine_period.as_millis() as u64,
            "Target pool created"
        );

        Ok(Self { targets, balancer })
    }

    /// Create a pool from configuration.
    pub fn from_config(config: &PoolConfig, policy: &QuarantinePolicy) -> Result<Self, PoolError> {
        Self::new(config.targets.as_slice(), policy)
    }

    /// Select a target for the next request.
    pub fn select(&self) -> Result<Arc<Target>, PoolError> {
        self.select_at(Instant::now(), &[])
    }

    /// Select a target, avoiding `exclude` when any other target is eligible.
    pub fn select_excluding(&self, exclude: &[TargetId]) -> Result<Arc<Target>, PoolError> {
        self.select_at(Instant::now(), exclude)
    }

    pub fn select_at(&self, now: Instant, exclude: &[TargetId]) -> Result<Arc<Target>, PoolError> {
        match self.balancer.next_target(&self.targets, now, exclude) {
            Some(target) => {
                target.mark_selected();
                Ok(target)
            }
            None => {
                tracing::debug!(targets = self.targets.len(), "No healthy targets in pool");
                Err(PoolError::NoHealthyTargets)
            }
        }
    }

    /// Targets in configuration order.
    pub fn targets(&self) -> &[Arc<Target>] {
        &self.targets
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Target>> {
        self.targets.iter().find(|t| t.id().as_str() == id)
    }

    /// Number of targets currently in an eligible state. Does not promote.
    pub fn eligible_count(&self) -> usize {
        self.targets.iter().filter(|t| t.state().is_eligible()).count()
    }

    /// Shortest remaining quarantine across the pool.
    pub fn next_release(&self, now: Instant) -> Option<Duration> {
        self.targets
            .iter()
            .filter_map(|t| t.snapshot_health().quarantine_remaining(now))
            .min()
    }

    /// Per-target state and counters, in configuration order.
    pub fn snapshot(&self) -> Vec<TargetSnapshot> {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> Vec<TargetSnapshot> {
        self.targets.iter().map(|t| t.snapshot(now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthMonitor, HealthState, Outcome};
    use std::collections::HashMap;

    const ADDRS: [&str; 3] = ["127.0.0.1:9001", "127.0.0.1:9002", "127.0.0.1:9003"];

    fn policy() -> QuarantinePolicy {
        QuarantinePolicy {
            failure_threshold: 3,
            quarantine_period: Duration::from_secs(5),
            max_quarantine_period: Duration::from_secs(60),
        }
    }

    fn quarantine(monitor: &HealthMonitor, target: &Target, now: Instant) {
        for _ in 0..monitor.policy().failure_threshold {
            monitor.record_at(target, Outcome::Timeout, now);
        }
        assert_eq!(target.state(), HealthState::Quarantined);
    }

    #[test]
    fn test_rejects_bad_construction() {
        let empty: [&str; 0] = [];
        assert_eq!(TargetPool::new(&empty, &policy()).unwrap_err(), PoolError::Empty);
        assert_eq!(
            TargetPool::new(&["127.0.0.1"], &policy()).unwrap_err(),
            PoolError::InvalidTarget("127.0.0.1".into())
        );
        assert_eq!(
            TargetPool::new(&["a:1", "A:1"], &policy()).unwrap_err(),
            PoolError::DuplicateTarget("A:1".into())
        );
    }

    #[test]
    fn test_fair_distribution() {
        let pool = TargetPool::new(&ADDRS, &policy()).unwrap();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..300 {
            let t = pool.select().unwrap();
            *counts.entry(t.id().to_string()).or_default() += 1;
        }
        for addr in ADDRS {
            assert_eq!(counts[addr], 100);
        }
        assert!(pool.snapshot().iter().all(|s| s.selections == 100));
    }

    #[test]
    fn test_never_returns_quarantined() {
        let monitor = HealthMonitor::new(policy());
        let pool = TargetPool::new(&ADDRS, monitor.policy()).unwrap();
        let now = Instant::now();
        quarantine(&monitor, &pool.targets()[0], now);

        for _ in 0..50 {
            let t = pool.select_at(now, &[]).unwrap();
            assert_ne!(t.id().as_str(), ADDRS[0]);
            assert!(t.state().is_eligible());
        }
    }

    #[test]
    fn test_all_quarantined_fails() {
        let monitor = HealthMonitor::new(policy());
        let pool = TargetPool::new(&ADDRS, monitor.policy()).unwrap();
        let now = Instant::now();
        for t in pool.targets() {
            quarantine(&monitor, t, now);
        }
        assert_eq!(pool.select_at(now, &[]).unwrap_err(), PoolError::NoHealthyTargets);
        assert_eq!(pool.eligible_count(), 0);
        assert_eq!(pool.next_release(now), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_lazy_promotion_boundary() {
        let monitor = HealthMonitor::new(policy());
        let pool = TargetPool::new(&ADDRS[..1], monitor.policy()).unwrap();
        let start = Instant::now();
        quarantine(&monitor, &pool.targets()[0], start);

        let before = start + Duration::from_millis(4_999);
        assert_eq!(pool.select_at(before, &[]).unwrap_err(), PoolError::NoHealthyTargets);

        let at = start + Duration::from_secs(5);
        let t = pool.select_at(at, &[]).unwrap();
        assert_eq!(t.state(), HealthState::Probing);
    }

    #[test]
    fn test_selection_does_not_change_state() {
        let pool = TargetPool::new(&ADDRS, &policy()).unwrap();
        for _ in 0..10 {
            pool.select().unwrap();
        }
        assert!(pool.snapshot().iter().all(|s| s.state == HealthState::Healthy
            && s.consecutive_failures == 0
            && s.successes == 0));
    }

    #[test]
    fn test_concurrent_selection_stays_fair() {
        let pool = Arc::new(TargetPool::new(&ADDRS, &policy()).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..300 {
                        pool.select().unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for snap in pool.snapshot() {
            assert_eq!(snap.selections, 800);
        }
    }

    #[test]
    fn test_get_by_id() {
        let pool = TargetPool::new(&ADDRS, &policy()).unwrap();
        assert!(pool.get("127.0.0.1:9002").is_some());
        assert!(pool.get("127.0.0.1:9999").is_none());
    }
}
