//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::time::Instant;

use crate::load_balancer::target::{Target, TargetId};
use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
///
/// The cursor only moves past the target actually chosen, so quarantined
/// targets do not hand their turns to the neighbour that follows them.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan forward from the cursor for the first target `accept`s and that is
    /// eligible, then advance the cursor just past it.
    fn scan(
        &self,
        targets: &[Arc<Target>],
        now: Instant,
        accept: impl Fn(&Arc<Target>) -> bool,
    ) -> Option<Arc<Target>> {
        let len = targets.len();
        if len == 0 {
            return None;
        }

        let mut cursor = self.cursor.load(Ordering::Relaxed);
        loop {
            let start = cursor % len;
            let (offset, target) = (0..len)
                .map(|i| (i, &targets[(start + i) % len]))
                .find(|&(_, t)| accept(t) && t.try_select(now))?;

            // Another caller may have moved the cursor during the scan.
            match self.cursor.compare_exchange_weak(
                cursor,
                cursor.wrapping_add(offset + 1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(target.clone()),
                Err(actual) => cursor = actual,
            }
        }
    }
}

impl LoadBalancer for RoundRobin {
    fn next_target(
        &self,
        targets: &[Arc<Target>],
        now: Instant,
        exclude: &[TargetId],
    ) -> Option<Arc<Target>> {
        if exclude.is_empty() {
            return self.scan(targets, now, |_| true);
        }
        // Prefer targets that have not failed this request; fall back to any.
        self.scan(targets, now, |t| !exclude.contains(t.id()))
            .or_else(|| self.scan(targets, now, |_| true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthState, QuarantinePolicy};

    fn targets(n: u16) -> Vec<Arc<Target>> {
        (0..n)
            .map(|i| {
                let addr = format!("127.0.0.1:{}", 8080 + i);
                Arc::new(Target::new(addr.parse().unwrap(), &QuarantinePolicy::default()))
            })
            .collect()
    }

    fn quarantine(t: &Target, at: Instant) {
        let policy = QuarantinePolicy { failure_threshold: 1, ..Default::default() };
        t.with_health(|h| h.on_failure(at, &policy));
        assert_eq!(t.state(), HealthState::Quarantined);
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = targets(2);
        let now = Instant::now();

        let s1 = lb.next_target(&backends, now, &[]).unwrap();
        assert_eq!(s1.id(), backends[0].id());

        let s2 = lb.next_target(&backends, now, &[]).unwrap();
        assert_eq!(s2.id(), backends[1].id());

        let s3 = lb.next_target(&backends, now, &[]).unwrap();
        assert_eq!(s3.id(), backends[0].id());
    }

    #[test]
    fn test_skips_quarantined_without_double_turns() {
        let lb = RoundRobin::new();
        let backends = targets(3);
        let now = Instant::now();
        quarantine(&backends[1], now);

        let picks: Vec<_> = (0..6)
            .map(|_| lb.next_target(&backends, now, &[]).unwrap().id().to_string())
            .collect();
        assert_eq!(
            picks,
            vec![
                "127.0.0.1:8080", "127.0.0.1:8082",
                "127.0.0.1:8080", "127.0.0.1:8082",
                "127.0.0.1:8080", "127.0.0.1:8082",
            ]
        );
    }

    #[test]
    fn test_none_when_all_quarantined() {
        let lb = RoundRobin::new();
        let backends = targets(2);
        let now = Instant::now();
        for b in &backends {
            quarantine(b, now);
        }
        assert!(lb.next_target(&backends, now, &[]).is_none());
        assert!(lb.next_target(&[], now, &[]).is_none());
    }

    #[test]
    fn test_exclusion_prefers_untried_targets() {
        let lb = RoundRobin::new();
        let backends = targets(3);
        let now = Instant::now();
        let excluded = [backends[0].id().clone()];

        let pick = lb.next_target(&backends, now, &excluded).unwrap();
        assert_eq!(pick.id(), backends[1].id());
    }

    #[test]
    fn test_exclusion_falls_back_when_nothing_else_eligible() {
        let lb = RoundRobin::new();
        let backends = targets(2);
        let now = Instant::now();
        quarantine(&backends[1], now);
        let excluded = [backends[0].id().clone()];

        let pick = lb.next_target(&backends, now, &excluded).unwrap();
        assert_eq!(pick.id(), backends[0].id());
    }
}
