//! Exponential backoff for repeated failed probes.

use std::time::Duration;

/// Quarantine period after `failed_probes` consecutive failed probes.
///
/// Doubles the base period per failed probe and never exceeds `max`.
pub fn quarantine_backoff(failed_probes: u32, base: Duration, max: Duration) -> Duration {
    if failed_probes == 0 {
        return base.min(max);
    }

    let factor = 2u32.saturating_pow(failed_probes);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(60);

        assert_eq!(quarantine_backoff(0, base, max), Duration::from_secs(5));
        assert_eq!(quarantine_backoff(1, base, max), Duration::from_secs(10));
        assert_eq!(quarantine_backoff(2, base, max), Duration::from_secs(20));
        assert_eq!(quarantine_backoff(3, base, max), Duration::from_secs(40));
        assert_eq!(quarantine_backoff(4, base, max), max);
    }

    #[test]
    fn test_backoff_never_overflows() {
        let max = Duration::from_secs(60);
        assert_eq!(quarantine_backoff(u32::MAX, Duration::from_secs(5), max), max);
    }

    #[test]
    fn test_cap_equal_to_base_disables_growth() {
        let base = Duration::from_secs(5);
        assert_eq!(quarantine_backoff(3, base, base), base);
    }
}
