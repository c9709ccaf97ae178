// Discord-specific spam handling - translates core decisions to Discord actions.
//
// A blocked message (content filter hit or rate limit) is deleted and the
// author gets a warning in the channel that deletes itself a few seconds later.
//
// Prefix commands are screened by the global command check, which poise runs
// before the event handler sees the message. The verdict is parked in
// `ScreenedMessages` so the event handler does not count the message twice,
// and a blocked command never runs.

use super::notices::post_transient;
use crate::core::moderation::{AntiSpamService, WhitelistStore};
use crate::discord::{Context, Data, Error};
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// How often idle rate-limit history is dropped.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Screening verdicts keyed by message id, each consumed exactly once.
#[derive(Default)]
pub struct ScreenedMessages(DashMap<u64, bool>);

impl ScreenedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, message_id: u64, blocked: bool) {
        self.0.insert(message_id, blocked);
    }

    /// Hand back (and forget) the verdict for a message, if it was screened.
    pub fn take(&self, message_id: u64) -> Option<bool> {
        self.0.remove(&message_id).map(|(_, blocked)| blocked)
    }
}

/// Owners and members with Manage Messages or Administrator skip rate limiting
/// and the content filter. Computed from the cache; a cache miss means "not exempt".
fn is_exempt(ctx: &serenity::Context, msg: &serenity::Message) -> bool {
    let Some(guild_id) = msg.guild_id else {
        return false;
    };
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return false;
    };

    if guild.owner_id == msg.author.id {
        return true;
    }

    let member_roles: &[serenity::RoleId] = match &msg.member {
        Some(member) => &member.roles,
        None => guild
            .members
            .get(&msg.author.id)
            .map(|member| member.roles.as_slice())
            .unwrap_or(&[]),
    };

    // The @everyone role shares the guild's id.
    let everyone = serenity::RoleId::new(guild_id.get());

    std::iter::once(&everyone)
        .chain(member_roles.iter())
        .filter_map(|role_id| guild.roles.get(role_id))
        .any(|role| role.permissions.manage_messages() || role.permissions.administrator())
}

/// Event handler entry point. Messages already screened as prefix commands
/// are not counted again.
///
/// Returns `true` if the message was removed.
pub async fn handle_message_for_spam(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    if let Some(blocked) = data.screened.take(msg.id.get()) {
        return Ok(blocked);
    }
    screen_message(ctx, msg, data).await
}

/// Global command check: a prefix command whose message gets removed does not run.
pub async fn spam_command_check(ctx: Context<'_>) -> Result<bool, Error> {
    let poise::Context::Prefix(prefix) = ctx else {
        return Ok(true);
    };

    let data = ctx.data();
    let blocked = screen_message(ctx.serenity_context(), prefix.msg, data).await?;
    data.screened.remember(prefix.msg.id.get(), blocked);
    if blocked {
        tracing::debug!(
            command = %ctx.command().name,
            user_id = prefix.msg.author.id.get(),
            "Dropped command from blocked message"
        );
    }
    Ok(!blocked)
}

/// Check a message for spam and apply the appropriate action.
///
/// Returns `true` if the message was removed.
async fn screen_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    // Skip bots
    if msg.author.bot {
        return Ok(false);
    }

    // Only check guild messages
    let guild_id = match msg.guild_id {
        Some(id) => id.get(),
        None => return Ok(false),
    };

    let user_id = msg.author.id.get();
    let channel_id = msg.channel_id.get();
    let exempt = is_exempt(ctx, msg);

    if !exempt {
        if let Some(word) = data.content_filter.find_blocked(&msg.content) {
            tracing::info!(
                user_id,
                guild_id,
                channel_id,
                word,
                "Message removed by content filter"
            );
            remove_and_warn(
                ctx,
                msg,
                format!("<@{}>, watch your language!", user_id),
                data.config.warning_lifetime,
            )
            .await;
            return Ok(true);
        }
    }

    let decision = data.anti_spam.check_message(user_id, channel_id, exempt);
    if !decision.is_blocked() {
        return Ok(false);
    }

    let policy = data.anti_spam.policy();
    tracing::info!(user_id, guild_id, channel_id, "Message removed by rate limit");
    remove_and_warn(
        ctx,
        msg,
        format!(
            "⚠️ <@{}>, slow down! Max {} messages every {} seconds.",
            user_id,
            policy.threshold,
            policy.window.as_secs()
        ),
        data.config.warning_lifetime,
    )
    .await;

    Ok(true)
}

/// Delete the offending message and post a self-deleting warning.
/// Failures are logged only: the author may have deleted it first.
async fn remove_and_warn(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    warning: String,
    lifetime: Duration,
) {
    if let Err(e) = msg.delete(&ctx.http).await {
        tracing::warn!("Failed to delete spam message: {}", e);
    }

    if let Err(e) = post_transient(&ctx.http, msg.channel_id, warning, lifetime).await {
        tracing::warn!("Failed to send spam warning: {}", e);
    }
}

/// Periodically forget users whose rate-limit history has aged out.
pub fn spawn_history_pruner<S>(anti_spam: Arc<AntiSpamService<S>>) -> tokio::task::JoinHandle<()>
where
    S: WhitelistStore + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(PRUNE_INTERVAL).await;
            let dropped = anti_spam.prune_idle();
            if dropped > 0 {
                tracing::debug!(dropped, "Pruned idle rate-limit history");
            }
        }
    })
}
