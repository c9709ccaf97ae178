// Per-user sliding-window message counter.
//
// Every observation appends "now", drops timestamps that fell out of the window
// and compares what is left to the threshold. Blocked messages still count, so
// a user who keeps hammering stays blocked until they slow down.

use super::moderation_models::{RateLimitDecision, RateLimitPolicy};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

pub struct RateLimiter {
    policy: RateLimitPolicy,
    window: chrono::Duration,
    // User ID -> send times, oldest first
    history: DashMap<u64, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        let window = chrono::Duration::from_std(policy.window)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));
        Self {
            policy,
            window,
            history: DashMap::new(),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Record a message sent at `now` and decide whether it goes through.
    pub fn observe(&self, user_id: u64, now: DateTime<Utc>) -> RateLimitDecision {
        let cutoff = self.cutoff(now);

        // The entry guard holds the shard lock, so append + prune + count is atomic.
        let mut timestamps = self.history.entry(user_id).or_default();
        timestamps.push_back(now);
        while timestamps.front().is_some_and(|&t| t < cutoff) {
            timestamps.pop_front();
        }

        if timestamps.len() > self.policy.threshold {
            RateLimitDecision::Block
        } else {
            RateLimitDecision::Allow
        }
    }

    /// Forget users whose whole history is older than the window.
    /// Returns how many were dropped.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let before = self.history.len();
        self.history
            .retain(|_, timestamps| timestamps.back().is_some_and(|&t| t >= cutoff));
        before - self.history.len()
    }

    /// Oldest send time still inside the window. Saturates instead of overflowing.
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    #[cfg(test)]
    pub fn tracked_users(&self) -> usize {
        self.history.len()
    }

    #[cfg(test)]
    pub fn history_len(&self, user_id: u64) -> usize {
        self.history.get(&user_id).map(|h| h.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn ms(millis: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::milliseconds(millis)
    }

    #[test]
    fn test_sixth_message_in_window_is_blocked() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());

        for i in 0..5 {
            assert_eq!(
                limiter.observe(1, ms(i * 500)),
                RateLimitDecision::Allow,
                "message {} should pass",
                i + 1
            );
        }
        assert_eq!(limiter.observe(1, ms(2600)), RateLimitDecision::Block);
        assert_eq!(limiter.observe(1, ms(2700)), RateLimitDecision::Block);
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        for i in 0..5 {
            limiter.observe(1, ms(i * 100));
        }

        // Well after the window the old messages no longer count.
        assert_eq!(limiter.observe(1, ms(6000)), RateLimitDecision::Allow);
        assert_eq!(limiter.history_len(1), 1);
    }

    #[test]
    fn test_message_exactly_at_window_edge_still_counts() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        for _ in 0..5 {
            limiter.observe(1, ms(0));
        }
        // 0 is exactly `window` before 5000, so it is still inside.
        assert_eq!(limiter.observe(1, ms(5000)), RateLimitDecision::Block);
    }

    #[test]
    fn test_users_are_counted_separately() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        for _ in 0..5 {
            limiter.observe(1, ms(0));
        }
        assert_eq!(limiter.observe(2, ms(0)), RateLimitDecision::Allow);
        assert_eq!(limiter.observe(1, ms(0)), RateLimitDecision::Block);
    }

    #[test]
    fn test_custom_policy() {
        let limiter = RateLimiter::new(RateLimitPolicy {
            window: std::time::Duration::from_secs(1),
            threshold: 2,
        });
        assert_eq!(limiter.observe(1, ms(0)), RateLimitDecision::Allow);
        assert_eq!(limiter.observe(1, ms(100)), RateLimitDecision::Allow);
        assert_eq!(limiter.observe(1, ms(200)), RateLimitDecision::Block);
        assert_eq!(limiter.observe(1, ms(1500)), RateLimitDecision::Allow);
    }

    #[test]
    fn test_prune_idle_drops_quiet_users() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        limiter.observe(1, ms(0));
        limiter.observe(2, ms(4000));

        assert_eq!(limiter.prune_idle(ms(6000)), 1);
        assert_eq!(limiter.tracked_users(), 1);
        assert_eq!(limiter.history_len(2), 1);
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let limiter = RateLimiter::new(RateLimitPolicy {
            window: std::time::Duration::from_secs(9_000_000_000_000),
            threshold: 1,
        });
        assert_eq!(limiter.observe(1, ms(0)), RateLimitDecision::Allow);
        assert_eq!(limiter.observe(1, ms(1)), RateLimitDecision::Block);
        assert_eq!(limiter.prune_idle(ms(2)), 0);
        assert_eq!(limiter.tracked_users(), 1);
    }
}
