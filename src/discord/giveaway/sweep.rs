// Background loop that finalizes expired giveaways.

use super::announcements::{DiscordGiveawayMessenger, DiscordMembership};
use crate::core::giveaway::{GiveawayStore, GiveawaySweeper};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Spawn the sweep loop. One tick every `interval`; a tick never fails, it
/// only reports what it did.
pub fn spawn_giveaway_sweeper<S>(
    http: Arc<serenity::Http>,
    sweeper: Arc<GiveawaySweeper<S>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: GiveawayStore + 'static,
{
    let messenger = DiscordGiveawayMessenger::new(Arc::clone(&http));
    let members = DiscordMembership::new(http);

    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Giveaway sweeper started");

        loop {
            let report = sweeper.sweep(&messenger, &members).await;

            if report.is_empty() {
                tracing::debug!("Giveaway sweep found nothing to do");
            } else {
                tracing::info!(
                    finalized = ?report.finalized,
                    recovered = ?report.recovered,
                    deferred = ?report.deferred,
                    failed = ?report.failed,
                    "Giveaway sweep completed"
                );
            }

            sleep(interval).await;
        }
    })
}
