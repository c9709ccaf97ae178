// Giveaway domain models - pure data, no Discord types.
//
// IDs are plain u64 snowflakes. The giveaway id is the id of the announcement
// message that carries the join button, so the Discord layer can map a button
// click straight back to a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One running giveaway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Giveaway {
    /// Announcement message id.
    pub id: u64,
    /// Community the manual winners are validated against.
    pub guild_id: u64,
    /// Where the result gets announced.
    pub channel_id: u64,
    pub prize: String,
    pub host_id: u64,
    /// Set once at creation, never extended.
    pub end_time: DateTime<Utc>,
    /// Participants in join order, no duplicates.
    pub entries: Vec<u64>,
    /// Administrator override, in assignment order. Empty means "draw at random".
    pub manual_winners: Vec<u64>,
    /// Set by the sweeper right before announcing. A record that still carries
    /// it on the next sweep was already announced and only needs removing.
    pub finalizing: bool,
}

impl Giveaway {
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}

/// Everything needed to open a giveaway before it has an id.
#[derive(Debug, Clone)]
pub struct NewGiveaway {
    pub guild_id: u64,
    pub channel_id: u64,
    pub host_id: u64,
    pub prize: String,
    pub duration: Duration,
}

/// What the messenger needs to post the announcement.
#[derive(Debug, Clone)]
pub struct GiveawayDraft {
    pub guild_id: u64,
    pub channel_id: u64,
    pub host_id: u64,
    pub prize: String,
    pub end_time: DateTime<Utc>,
}

/// Result of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
    /// Unknown id, or the giveaway is already being finalized.
    NotFound,
}

/// Result of an administrator winner override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetWinnersOutcome {
    Ok,
    NotFound,
    /// No winners supplied; nothing was changed.
    Empty,
}

// ============================================================================
// ERRORS
// ============================================================================

/// Failures of the platform collaborators (messaging, membership lookup).
///
/// These are always treated as transient: the caller logs them and either
/// retries once or leaves the work for the next sweep.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Membership lookup error: {0}")]
    Membership(String),
}

#[derive(Debug, Error)]
pub enum GiveawayError {
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Prize must not be empty")]
    InvalidPrize,

    #[error("Giveaway id {0} is already in use or was used before")]
    DuplicateId(u64),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl GiveawayError {
    /// Errors that are the invoking user's fault and deserve a usage hint.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            GiveawayError::InvalidDuration(_) | GiveawayError::InvalidPrize
        )
    }
}
