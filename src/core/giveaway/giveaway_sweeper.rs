// Periodic finalization of expired giveaways.
//
// One sweep = list expired -> for each: mark finalizing, re-read, select,
// announce, remove. Every giveaway is handled on its own so one failure never
// stops the rest of the tick, and nothing here panics or bubbles up: the
// caller just logs the report and sleeps until the next tick.
//
// The marker goes on before the record is read for selection, so any join or
// `gset` is either in the snapshot that gets drawn or rejected outright.
// It also makes announcements at-most-once: a record that still carries it at
// the start of a sweep belongs to an earlier sweep that died before removing
// it, so it is removed without a second announcement.

use super::giveaway_models::{Giveaway, GiveawayError};
use super::giveaway_service::{GiveawayMessenger, GiveawayService, GiveawayStore, MembershipLookup};
use super::winner_selector::WinnerSelector;
use std::sync::Arc;

/// What happened during one sweep, by giveaway id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Result posted (or given up on after a retry) and record removed.
    pub finalized: Vec<u64>,
    /// Found already marked from an earlier sweep; removed without announcing.
    pub recovered: Vec<u64>,
    /// Winner selection could not run (membership lookup failed); retried next tick.
    pub deferred: Vec<u64>,
    /// Storage failed; the record is still there and will be picked up again.
    pub failed: Vec<u64>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.finalized.is_empty()
            && self.recovered.is_empty()
            && self.deferred.is_empty()
            && self.failed.is_empty()
    }
}

enum Finalized {
    Announced,
    Recovered,
    Deferred,
    AlreadyGone,
}

pub struct GiveawaySweeper<S: GiveawayStore> {
    registry: Arc<GiveawayService<S>>,
    selector: WinnerSelector,
}

impl<S: GiveawayStore> GiveawaySweeper<S> {
    pub fn new(registry: Arc<GiveawayService<S>>, selector: WinnerSelector) -> Self {
        Self { registry, selector }
    }

    /// Run one sweep over every expired giveaway.
    pub async fn sweep<M, L>(&self, messenger: &M, members: &L) -> SweepReport
    where
        M: GiveawayMessenger + ?Sized,
        L: MembershipLookup + ?Sized,
    {
        let mut report = SweepReport::default();
        let now = self.registry.now();

        let expired = match self.registry.list_expired(now).await {
            Ok(expired) => expired,
            Err(err) => {
                tracing::warn!("Failed to list expired giveaways: {}", err);
                return report;
            }
        };

        for giveaway in expired {
            let id = giveaway.id;
            match self.finalize(id, messenger, members).await {
                Ok(Finalized::Announced) => report.finalized.push(id),
                Ok(Finalized::Recovered) => report.recovered.push(id),
                Ok(Finalized::Deferred) => report.deferred.push(id),
                Ok(Finalized::AlreadyGone) => {}
                Err(err) => {
                    tracing::error!(giveaway_id = id, "Failed to finalize giveaway: {}", err);
                    report.failed.push(id);
                }
            }
        }

        report
    }

    async fn finalize<M, L>(
        &self,
        id: u64,
        messenger: &M,
        members: &L,
    ) -> Result<Finalized, GiveawayError>
    where
        M: GiveawayMessenger + ?Sized,
        L: MembershipLookup + ?Sized,
    {
        let Some(listed) = self.registry.get(id).await? else {
            return Ok(Finalized::AlreadyGone);
        };

        if listed.finalizing {
            tracing::warn!(
                giveaway_id = id,
                "Giveaway was claimed by an earlier sweep but never removed; removing it now"
            );
            self.registry.remove(id).await?;
            return Ok(Finalized::Recovered);
        }

        if !self.registry.begin_finalizing(id).await? {
            return Ok(Finalized::AlreadyGone);
        }

        // Frozen from here on: this is exactly what gets drawn.
        let Some(giveaway) = self.registry.get(id).await? else {
            return Ok(Finalized::AlreadyGone);
        };

        let winners = match self.selector.select(&giveaway, members).await {
            Ok(winners) => winners,
            Err(err) => {
                tracing::warn!(
                    giveaway_id = id,
                    "Deferring giveaway, winner selection failed: {}",
                    err
                );
                self.registry.abort_finalizing(id).await?;
                return Ok(Finalized::Deferred);
            }
        };

        self.announce(messenger, &giveaway, &winners).await;
        self.registry.remove(id).await?;

        tracing::info!(
            giveaway_id = id,
            winner_count = winners.len(),
            "Giveaway finalized"
        );
        Ok(Finalized::Announced)
    }

    /// Post the result, retrying once. Giving up is logged, never fatal: the
    /// record is removed either way so it cannot come back every tick.
    async fn announce<M: GiveawayMessenger + ?Sized>(
        &self,
        messenger: &M,
        giveaway: &Giveaway,
        winners: &[u64],
    ) {
        if let Err(first) = messenger.announce_result(giveaway, winners).await {
            tracing::warn!(
                giveaway_id = giveaway.id,
                "Announcing giveaway result failed, retrying once: {}",
                first
            );
            if let Err(second) = messenger.announce_result(giveaway, winners).await {
                tracing::error!(
                    giveaway_id = giveaway.id,
                    "Giving up on announcing giveaway result: {}",
                    second
                );
            }
        }
    }
}
