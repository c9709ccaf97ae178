// Anti-spam service - core business logic for rate limiting.
//
// This service handles:
// - Sliding-window rate limiting per user
// - The channel whitelist (exempt from rate limiting)
//
// NO Discord dependencies here - just pure domain logic.

use super::moderation_models::{RateLimitDecision, RateLimitPolicy, SpamError, WhitelistEntry};
use super::rate_limiter::RateLimiter;
use crate::core::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting the whitelist.
///
/// Rate-limit history is deliberately not persisted: it only spans a few seconds.
#[async_trait]
pub trait WhitelistStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<WhitelistEntry>, SpamError>;

    async fn add(&self, entry: WhitelistEntry) -> Result<(), SpamError>;

    async fn remove(&self, channel_id: u64) -> Result<(), SpamError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct AntiSpamService<S: WhitelistStore> {
    store: S,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    // Channel ID -> Guild ID
    whitelist: DashMap<u64, u64>,
}

impl<S: WhitelistStore> AntiSpamService<S> {
    /// Create the service and warm the whitelist from the store.
    pub async fn load(
        store: S,
        policy: RateLimitPolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SpamError> {
        let whitelist = DashMap::new();
        for entry in store.load_all().await? {
            whitelist.insert(entry.channel_id, entry.guild_id);
        }
        tracing::info!(channels = whitelist.len(), "Loaded anti-spam whitelist");

        Ok(Self {
            store,
            clock,
            limiter: RateLimiter::new(policy),
            whitelist,
        })
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.limiter.policy()
    }

    /// Decide on a message sent by `user_id` in `channel_id` at `now`.
    ///
    /// Whitelisted channels and exempt users are allowed without touching the
    /// user's history.
    pub fn observe(
        &self,
        user_id: u64,
        channel_id: u64,
        exempt: bool,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        if exempt || self.is_whitelisted(channel_id) {
            return RateLimitDecision::Allow;
        }

        let decision = self.limiter.observe(user_id, now);
        if decision.is_blocked() {
            tracing::debug!(user_id, channel_id, "Rate limit exceeded");
        }
        decision
    }

    /// `observe` at the current time.
    pub fn check_message(&self, user_id: u64, channel_id: u64, exempt: bool) -> RateLimitDecision {
        self.observe(user_id, channel_id, exempt, self.clock.now())
    }

    pub fn is_whitelisted(&self, channel_id: u64) -> bool {
        self.whitelist.contains_key(&channel_id)
    }

    /// Exempt a channel. Returns `false` if it already was.
    pub async fn add_to_whitelist(&self, guild_id: u64, channel_id: u64) -> Result<bool, SpamError> {
        if self.is_whitelisted(channel_id) {
            return Ok(false);
        }

        self.store
            .add(WhitelistEntry {
                channel_id,
                guild_id,
            })
            .await?;
        self.whitelist.insert(channel_id, guild_id);
        tracing::info!(guild_id, channel_id, "Channel added to anti-spam whitelist");
        Ok(true)
    }

    /// Stop exempting a channel. Returns `false` if it was not whitelisted.
    pub async fn remove_from_whitelist(&self, channel_id: u64) -> Result<bool, SpamError> {
        if !self.is_whitelisted(channel_id) {
            return Ok(false);
        }

        self.store.remove(channel_id).await?;
        self.whitelist.remove(&channel_id);
        tracing::info!(channel_id, "Channel removed from anti-spam whitelist");
        Ok(true)
    }

    /// Whitelisted channels of one guild, sorted by id.
    pub fn whitelisted_channels(&self, guild_id: u64) -> Vec<u64> {
        let mut channels: Vec<u64> = self
            .whitelist
            .iter()
            .filter(|entry| *entry.value() == guild_id)
            .map(|entry| *entry.key())
            .collect();
        channels.sort_unstable();
        channels
    }

    /// Drop rate-limit history of users who went quiet (called periodically).
    pub fn prune_idle(&self) -> usize {
        self.limiter.prune_idle(self.clock.now())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use std::sync::Mutex;

    /// In-memory store for testing
    #[derive(Clone, Default)]
    struct MockWhitelistStore {
        entries: Arc<Mutex<Vec<WhitelistEntry>>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl WhitelistStore for MockWhitelistStore {
        async fn load_all(&self) -> Result<Vec<WhitelistEntry>, SpamError> {
            Ok(self.entries.lock().unwrap().clone())
        }

        async fn add(&self, entry: WhitelistEntry) -> Result<(), SpamError> {
            if self.fail_writes {
                return Err(SpamError::StorageError("read-only".to_string()));
            }
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        async fn remove(&self, channel_id: u64) -> Result<(), SpamError> {
            if self.fail_writes {
                return Err(SpamError::StorageError("read-only".to_string()));
            }
            self.entries
                .lock()
                .unwrap()
                .retain(|e| e.channel_id != channel_id);
            Ok(())
        }
    }

    async fn service(
        store: MockWhitelistStore,
    ) -> (AntiSpamService<MockWhitelistStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let service = AntiSpamService::load(store, RateLimitPolicy::default(), clock.clone())
            .await
            .unwrap();
        (service, clock)
    }

    #[tokio::test]
    async fn test_rate_limit_detection() {
        let (service, _) = service(MockWhitelistStore::default()).await;

        for i in 0..5 {
            assert_eq!(
                service.check_message(123, 456, false),
                RateLimitDecision::Allow,
                "Message {} should not be blocked",
                i
            );
        }

        assert_eq!(service.check_message(123, 456, false), RateLimitDecision::Block);
        assert_eq!(service.check_message(123, 456, false), RateLimitDecision::Block);
    }

    #[tokio::test]
    async fn test_whitelisted_channel_never_blocks() {
        let (service, _) = service(MockWhitelistStore::default()).await;
        assert!(service.add_to_whitelist(1, 456).await.unwrap());

        for _ in 0..50 {
            assert_eq!(service.check_message(123, 456, false), RateLimitDecision::Allow);
        }

        // The whitelisted flood did not count against the user elsewhere.
        assert_eq!(service.check_message(123, 789, false), RateLimitDecision::Allow);
    }

    #[tokio::test]
    async fn test_exempt_user_never_blocks() {
        let (service, _) = service(MockWhitelistStore::default()).await;
        for _ in 0..20 {
            assert_eq!(service.check_message(1, 2, true), RateLimitDecision::Allow);
        }
    }

    #[tokio::test]
    async fn test_block_lifts_after_window() {
        let (service, clock) = service(MockWhitelistStore::default()).await;
        for _ in 0..6 {
            service.check_message(1, 2, false);
        }
        assert_eq!(service.check_message(1, 2, false), RateLimitDecision::Block);

        clock.advance_secs(6);
        assert_eq!(service.check_message(1, 2, false), RateLimitDecision::Allow);
    }

    #[tokio::test]
    async fn test_whitelist_is_persisted_and_reloaded() {
        let store = MockWhitelistStore::default();
        let (spam, _) = service(store.clone()).await;

        assert!(spam.add_to_whitelist(1, 10).await.unwrap());
        assert!(!spam.add_to_whitelist(1, 10).await.unwrap());
        assert!(spam.add_to_whitelist(1, 11).await.unwrap());
        assert!(spam.add_to_whitelist(2, 20).await.unwrap());
        assert!(spam.remove_from_whitelist(11).await.unwrap());
        assert!(!spam.remove_from_whitelist(11).await.unwrap());

        let (reloaded, _) = service(store).await;
        assert!(reloaded.is_whitelisted(10));
        assert!(!reloaded.is_whitelisted(11));
        assert_eq!(reloaded.whitelisted_channels(1), vec![10]);
        assert_eq!(reloaded.whitelisted_channels(2), vec![20]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_whitelist_unchanged() {
        let store = MockWhitelistStore {
            fail_writes: true,
            ..Default::default()
        };
        let (service, _) = service(store).await;

        assert!(service.add_to_whitelist(1, 10).await.is_err());
        assert!(!service.is_whitelisted(10));
    }

    #[tokio::test]
    async fn test_prune_idle() {
        let (service, clock) = service(MockWhitelistStore::default()).await;
        service.check_message(1, 2, false);
        clock.advance_secs(10);
        assert_eq!(service.prune_idle(), 1);
    }
}
