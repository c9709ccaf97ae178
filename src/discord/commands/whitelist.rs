// Anti-spam whitelist commands.

use super::arguments::send_usage_hint;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Manage channels that are exempt from the message rate limit.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("add", "remove", "list"),
    required_permissions = "MANAGE_CHANNELS",
    category = "Moderation"
)]
pub async fn whitelist(ctx: Context<'_>) -> Result<(), Error> {
    // Only reachable as a bare text command
    send_usage_hint(ctx, None).await
}

/// Exempt a channel (defaults to this one) from the rate limit.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS"
)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Channel to exempt (defaults to this one)"] channel: Option<
        serenity::GuildChannel,
    >,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());

    let added = ctx
        .data()
        .anti_spam
        .add_to_whitelist(guild_id, channel_id.get())
        .await?;

    if added {
        ctx.say(format!("✅ <#{}> is now exempt from the rate limit.", channel_id))
            .await?;
    } else {
        ctx.say(format!("<#{}> is already whitelisted.", channel_id))
            .await?;
    }
    Ok(())
}

/// Rate-limit a whitelisted channel again.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS"
)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Channel to remove (defaults to this one)"] channel: Option<
        serenity::GuildChannel,
    >,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());

    // Channel ids are global, so make sure admins only touch their own server.
    if !ctx
        .data()
        .anti_spam
        .whitelisted_channels(guild_id)
        .contains(&channel_id.get())
    {
        ctx.say(format!("<#{}> is not whitelisted.", channel_id))
            .await?;
        return Ok(());
    }

    ctx.data()
        .anti_spam
        .remove_from_whitelist(channel_id.get())
        .await?;

    ctx.say(format!("✅ <#{}> is rate-limited again.", channel_id))
        .await?;
    Ok(())
}

/// Show the whitelisted channels of this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS"
)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let channels = ctx.data().anti_spam.whitelisted_channels(guild_id);
    let policy = ctx.data().anti_spam.policy();

    let description = if channels.is_empty() {
        "No channels are whitelisted.".to_string()
    } else {
        channels
            .iter()
            .map(|id| format!("• <#{}>", id))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title("🛡️ Anti-Spam Whitelist")
        .description(description)
        .color(0x00FF00)
        .field(
            "Rate Limit",
            format!(
                "{} messages / {} seconds",
                policy.threshold,
                policy.window.as_secs()
            ),
            false,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
