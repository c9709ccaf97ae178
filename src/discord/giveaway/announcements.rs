// Serenity implementations of the giveaway platform ports.

use crate::core::giveaway::{
    Giveaway, GiveawayDraft, GiveawayMessenger, MembershipLookup, PlatformError,
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Custom id of the join button on every giveaway announcement.
pub const JOIN_BUTTON_ID: &str = "g_join";

const RUNNING_COLOR: u32 = 0x5865F2;
const ENDED_COLOR: u32 = 0x2F3136;

pub struct DiscordGiveawayMessenger {
    http: Arc<serenity::Http>,
}

impl DiscordGiveawayMessenger {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn mentions(users: &[u64]) -> String {
    users
        .iter()
        .map(|id| format!("<@{}>", id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text posted in the channel when a giveaway is drawn.
pub fn result_text(prize: &str, winners: &[u64]) -> String {
    if winners.is_empty() {
        format!("No valid entries for **{}**.", prize)
    } else {
        format!(
            "🎉 Congratulations {}! You won **{}**!",
            mentions(winners),
            prize
        )
    }
}

fn running_embed(draft: &GiveawayDraft) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("🎁 GIVEAWAY: {}", draft.prize))
        .description(format!(
            "Click the button to enter!\n\n**Ends:** <t:{}:R>\n**Hosted By:** <@{}>",
            draft.end_time.timestamp(),
            draft.host_id
        ))
        .color(RUNNING_COLOR)
}

fn ended_embed(giveaway: &Giveaway, winners: &[u64]) -> serenity::CreateEmbed {
    let outcome = if winners.is_empty() {
        "No valid entries.".to_string()
    } else {
        format!("**Winner(s):** {}", mentions(winners))
    };

    serenity::CreateEmbed::new()
        .title(format!("🎁 GIVEAWAY ENDED: {}", giveaway.prize))
        .description(format!(
            "{}\n\n**Ended:** <t:{}:R>\n**Hosted By:** <@{}>\n**Entries:** {}",
            outcome,
            giveaway.end_time.timestamp(),
            giveaway.host_id,
            giveaway.entries.len()
        ))
        .color(ENDED_COLOR)
}

fn join_row() -> serenity::CreateActionRow {
    serenity::CreateActionRow::Buttons(vec![serenity::CreateButton::new(JOIN_BUTTON_ID)
        .label("Enter")
        .emoji('🎉')
        .style(serenity::ButtonStyle::Primary)])
}

#[async_trait]
impl GiveawayMessenger for DiscordGiveawayMessenger {
    async fn post_giveaway(&self, draft: &GiveawayDraft) -> Result<u64, PlatformError> {
        let message = serenity::ChannelId::new(draft.channel_id)
            .send_message(
                &self.http,
                serenity::CreateMessage::new()
                    .embed(running_embed(draft))
                    .components(vec![join_row()]),
            )
            .await
            .map_err(|e| PlatformError::Messaging(e.to_string()))?;

        Ok(message.id.get())
    }

    async fn retract_giveaway(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<(), PlatformError> {
        serenity::ChannelId::new(channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message_id))
            .await
            .map_err(|e| PlatformError::Messaging(e.to_string()))
    }

    async fn announce_result(
        &self,
        giveaway: &Giveaway,
        winners: &[u64],
    ) -> Result<(), PlatformError> {
        let channel_id = serenity::ChannelId::new(giveaway.channel_id);

        channel_id
            .say(&self.http, result_text(&giveaway.prize, winners))
            .await
            .map_err(|e| PlatformError::Messaging(e.to_string()))?;

        // Best effort: the announcement may have been deleted by a moderator.
        if let Err(err) = channel_id
            .edit_message(
                &self.http,
                serenity::MessageId::new(giveaway.id),
                serenity::EditMessage::new()
                    .embed(ended_embed(giveaway, winners))
                    .components(vec![]),
            )
            .await
        {
            tracing::warn!(
                giveaway_id = giveaway.id,
                "Could not mark giveaway message as ended: {}",
                err
            );
        }

        Ok(())
    }
}

/// Checks guild membership over HTTP. A 404 means "not a member"; any other
/// failure is reported as transient so the draw is retried later.
pub struct DiscordMembership {
    http: Arc<serenity::Http>,
}

impl DiscordMembership {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(http_err) => http_err
            .status_code()
            .is_some_and(|status| status.as_u16() == 404),
        _ => false,
    }
}

#[async_trait]
impl MembershipLookup for DiscordMembership {
    async fn is_member(&self, guild_id: u64, user_id: u64) -> Result<bool, PlatformError> {
        match self
            .http
            .get_member(serenity::GuildId::new(guild_id), serenity::UserId::new(user_id))
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(PlatformError::Membership(err.to_string())),
        }
    }
}
