// Moderation domain models - data structures for the anti-spam system.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer turns a `Block` into "delete + self-deleting warning".

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Decision for one observed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allow,
    Block,
}

impl RateLimitDecision {
    pub fn is_blocked(self) -> bool {
        self == RateLimitDecision::Block
    }
}

/// Sliding-window limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Trailing window the messages are counted in.
    pub window: Duration,
    /// Messages allowed inside one window; the next one is blocked.
    pub threshold: usize,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5), // 5 messages...
            threshold: 5,                   // ...in 5 seconds
        }
    }
}

/// A channel exempt from rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub channel_id: u64,
    pub guild_id: u64,
}

#[derive(Debug, Error)]
pub enum SpamError {
    #[error("Storage error: {0}")]
    StorageError(String),
}
