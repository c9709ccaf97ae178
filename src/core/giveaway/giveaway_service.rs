// Giveaway registry - owns the lifecycle of every giveaway.
//
// Create -> join / override winners -> expire -> (sweeper) finalize -> remove.
//
// NO Discord dependencies here. Posting the announcement and checking guild
// membership go through the ports below; the Discord layer implements them.

use super::giveaway_models::{
    Giveaway, GiveawayDraft, GiveawayError, JoinOutcome, NewGiveaway, PlatformError,
    SetWinnersOutcome,
};
use crate::core::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting giveaways and their entries.
///
/// Implementations must make `add_entry` atomic (check-then-append cannot be
/// split by another writer) and must remember removed ids so they are never
/// handed out again.
#[async_trait]
pub trait GiveawayStore: Send + Sync {
    /// Persist a new record. Fails with `DuplicateId` for live or retired ids.
    async fn insert(&self, giveaway: Giveaway) -> Result<(), GiveawayError>;

    async fn get(&self, id: u64) -> Result<Option<Giveaway>, GiveawayError>;

    /// Add a participant if the giveaway is live and the user is not in yet.
    async fn add_entry(&self, id: u64, user_id: u64) -> Result<JoinOutcome, GiveawayError>;

    /// Replace the manual winners. Returns `false` if there is no live record.
    async fn set_manual_winners(&self, id: u64, winners: &[u64]) -> Result<bool, GiveawayError>;

    /// All records with `end_time <= now`, finalizing or not.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Giveaway>, GiveawayError>;

    /// Live (non-finalizing) giveaways of one guild, soonest first.
    async fn list_active(&self, guild_id: u64) -> Result<Vec<Giveaway>, GiveawayError>;

    /// Set the finalizing marker. Returns `false` if missing or already marked.
    async fn mark_finalizing(&self, id: u64) -> Result<bool, GiveawayError>;

    /// Undo `mark_finalizing` so the giveaway is live again. Returns `false`
    /// if missing or not marked.
    async fn clear_finalizing(&self, id: u64) -> Result<bool, GiveawayError>;

    /// Delete the record and retire its id. Returns `false` if it was already gone.
    async fn remove(&self, id: u64) -> Result<bool, GiveawayError>;
}

/// Lets the backend be chosen at runtime (`Box<dyn GiveawayStore>`).
#[async_trait]
impl<T: GiveawayStore + ?Sized> GiveawayStore for Box<T> {
    async fn insert(&self, giveaway: Giveaway) -> Result<(), GiveawayError> {
        (**self).insert(giveaway).await
    }

    async fn get(&self, id: u64) -> Result<Option<Giveaway>, GiveawayError> {
        (**self).get(id).await
    }

    async fn add_entry(&self, id: u64, user_id: u64) -> Result<JoinOutcome, GiveawayError> {
        (**self).add_entry(id, user_id).await
    }

    async fn set_manual_winners(&self, id: u64, winners: &[u64]) -> Result<bool, GiveawayError> {
        (**self).set_manual_winners(id, winners).await
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Giveaway>, GiveawayError> {
        (**self).list_expired(now).await
    }

    async fn list_active(&self, guild_id: u64) -> Result<Vec<Giveaway>, GiveawayError> {
        (**self).list_active(guild_id).await
    }

    async fn mark_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        (**self).mark_finalizing(id).await
    }

    async fn clear_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        (**self).clear_finalizing(id).await
    }

    async fn remove(&self, id: u64) -> Result<bool, GiveawayError> {
        (**self).remove(id).await
    }
}

// ============================================================================
// PLATFORM PORTS
// ============================================================================

/// Outbound messaging needed by the giveaway lifecycle.
#[async_trait]
pub trait GiveawayMessenger: Send + Sync {
    /// Post the announcement with its join control. Returns the message id,
    /// which becomes the giveaway id.
    async fn post_giveaway(&self, draft: &GiveawayDraft) -> Result<u64, PlatformError>;

    /// Take a posted announcement back down (used when persisting fails).
    async fn retract_giveaway(&self, channel_id: u64, message_id: u64)
        -> Result<(), PlatformError>;

    /// Announce the result. An empty `winners` slice means nobody won.
    async fn announce_result(&self, giveaway: &Giveaway, winners: &[u64])
        -> Result<(), PlatformError>;
}

/// Is this user still part of the community?
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    async fn is_member(&self, guild_id: u64, user_id: u64) -> Result<bool, PlatformError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct GiveawayService<S: GiveawayStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: GiveawayStore> GiveawayService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Open a new giveaway.
    ///
    /// Validates the request, posts the announcement (whose message id becomes
    /// the giveaway id) and persists the record before returning it. If the
    /// record cannot be stored, the announcement is taken back down so nobody
    /// can join a giveaway that will never be drawn.
    pub async fn create<M: GiveawayMessenger + ?Sized>(
        &self,
        messenger: &M,
        request: NewGiveaway,
    ) -> Result<Giveaway, GiveawayError> {
        if request.duration.is_zero() {
            return Err(GiveawayError::InvalidDuration(
                "duration must be longer than zero".to_string(),
            ));
        }

        let prize = request.prize.trim();
        if prize.is_empty() {
            return Err(GiveawayError::InvalidPrize);
        }

        let span = chrono::Duration::from_std(request.duration)
            .map_err(|_| GiveawayError::InvalidDuration("duration is too long".to_string()))?;
        let end_time = self
            .clock
            .now()
            .checked_add_signed(span)
            .ok_or_else(|| GiveawayError::InvalidDuration("duration is too long".to_string()))?;

        let draft = GiveawayDraft {
            guild_id: request.guild_id,
            channel_id: request.channel_id,
            host_id: request.host_id,
            prize: prize.to_string(),
            end_time,
        };

        let id = messenger.post_giveaway(&draft).await?;

        let giveaway = Giveaway {
            id,
            guild_id: draft.guild_id,
            channel_id: draft.channel_id,
            prize: draft.prize,
            host_id: draft.host_id,
            end_time,
            entries: Vec::new(),
            manual_winners: Vec::new(),
            finalizing: false,
        };

        if let Err(err) = self.store.insert(giveaway.clone()).await {
            tracing::error!(giveaway_id = id, "Failed to persist giveaway: {}", err);
            if let Err(retract_err) = messenger.retract_giveaway(giveaway.channel_id, id).await {
                tracing::warn!(
                    giveaway_id = id,
                    "Failed to retract unpersisted giveaway announcement: {}",
                    retract_err
                );
            }
            return Err(err);
        }

        tracing::info!(
            giveaway_id = id,
            guild_id = giveaway.guild_id,
            host_id = giveaway.host_id,
            end_time = %giveaway.end_time,
            "Giveaway created"
        );

        Ok(giveaway)
    }

    /// Enter a user into a giveaway. Joining twice is a no-op.
    pub async fn record_entry(&self, id: u64, user_id: u64) -> Result<JoinOutcome, GiveawayError> {
        let outcome = self.store.add_entry(id, user_id).await?;
        tracing::debug!(giveaway_id = id, user_id, ?outcome, "Join attempt");
        Ok(outcome)
    }

    /// Replace the manual winner list of a live giveaway.
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    pub async fn set_manual_winners(
        &self,
        id: u64,
        winners: Vec<u64>,
    ) -> Result<SetWinnersOutcome, GiveawayError> {
        if winners.is_empty() {
            return Ok(SetWinnersOutcome::Empty);
        }

        let mut unique = Vec::with_capacity(winners.len());
        for winner in winners {
            if !unique.contains(&winner) {
                unique.push(winner);
            }
        }

        if self.store.set_manual_winners(id, &unique).await? {
            tracing::info!(giveaway_id = id, count = unique.len(), "Manual winners set");
            Ok(SetWinnersOutcome::Ok)
        } else {
            Ok(SetWinnersOutcome::NotFound)
        }
    }

    /// Every giveaway whose end time has passed. Does not change anything.
    pub async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Giveaway>, GiveawayError> {
        self.store.list_expired(now).await
    }

    pub async fn get(&self, id: u64) -> Result<Option<Giveaway>, GiveawayError> {
        self.store.get(id).await
    }

    pub async fn active_in_guild(&self, guild_id: u64) -> Result<Vec<Giveaway>, GiveawayError> {
        self.store.list_active(guild_id).await
    }

    /// Mark a giveaway as being finalized. From here on it no longer accepts
    /// entries or winner overrides.
    pub async fn begin_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        self.store.mark_finalizing(id).await
    }

    /// Put a giveaway back into the live state after finalization was abandoned.
    pub async fn abort_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        self.store.clear_finalizing(id).await
    }

    /// Delete a giveaway. Removing an already removed id does nothing.
    pub async fn remove(&self, id: u64) -> Result<(), GiveawayError> {
        if self.store.remove(id).await? {
            tracing::info!(giveaway_id = id, "Giveaway removed");
        } else {
            tracing::debug!(giveaway_id = id, "Giveaway already removed");
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
