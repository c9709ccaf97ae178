// Giveaway commands.
//
// Same pattern as the other command files: pull primitives out of the Discord
// context, call the core service, format the result. Posting the announcement
// itself goes through `DiscordGiveawayMessenger` so the core never sees serenity.

use super::arguments::{parse_snowflake, parse_user_ids, send_usage_hint};
use crate::core::giveaway::{format_duration, parse_duration, NewGiveaway, SetWinnersOutcome};
use crate::discord::giveaway::DiscordGiveawayMessenger;
use crate::discord::moderation::post_transient;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Reply only the invoker can see. Text commands have no ephemeral replies,
/// so there the reply is skipped and the command's own output speaks for itself.
async fn acknowledge(ctx: Context<'_>, text: String) -> Result<(), Error> {
    if let poise::Context::Application(_) = ctx {
        ctx.send(poise::CreateReply::default().content(text).ephemeral(true))
            .await?;
    }
    Ok(())
}

/// Start a giveaway in this channel.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Giveaways"
)]
pub async fn gstart(
    ctx: Context<'_>,
    #[description = "How long it runs, e.g. 10m, 1h30m, 2d"] duration: String,
    #[description = "What the winner gets"]
    #[rest]
    prize: String,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let duration = match parse_duration(&duration) {
        Ok(duration) => duration,
        Err(err) => return send_usage_hint(ctx, Some(&err.to_string())).await,
    };

    let messenger = DiscordGiveawayMessenger::new(ctx.serenity_context().http.clone());
    let request = NewGiveaway {
        guild_id,
        channel_id: ctx.channel_id().get(),
        host_id: ctx.author().id.get(),
        prize,
        duration,
    };

    let giveaway = match ctx.data().giveaways.create(&messenger, request).await {
        Ok(giveaway) => giveaway,
        Err(err) if err.is_invalid_input() => {
            return send_usage_hint(ctx, Some(&err.to_string())).await;
        }
        Err(err) => return Err(err.into()),
    };

    acknowledge(
        ctx,
        format!(
            "🎉 Giveaway for **{}** started (id `{}`), running for {}.",
            giveaway.prize,
            giveaway.id,
            format_duration(duration)
        ),
    )
    .await
}

/// Pick the winners of a running giveaway.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    hide_in_help,
    required_permissions = "ADMINISTRATOR",
    category = "Giveaways"
)]
pub async fn gset(
    ctx: Context<'_>,
    #[description = "Giveaway id (the announcement message id or link)"] giveaway: String,
    #[description = "Winners as mentions or user ids"]
    #[rest]
    winners: String,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let Some(giveaway_id) = parse_snowflake(&giveaway) else {
        return send_usage_hint(ctx, Some("That is not a giveaway id.")).await;
    };

    let winners = parse_user_ids(&winners);
    if winners.is_empty() {
        return send_usage_hint(ctx, Some("Name at least one winner.")).await;
    }

    let data = ctx.data();

    // Only giveaways of this server can be overridden from here.
    let in_this_guild = data
        .giveaways
        .get(giveaway_id)
        .await?
        .is_some_and(|g| g.guild_id == guild_id);

    let outcome = if in_this_guild {
        data.giveaways
            .set_manual_winners(giveaway_id, winners.clone())
            .await?
    } else {
        SetWinnersOutcome::NotFound
    };

    let text = match outcome {
        SetWinnersOutcome::Ok => {
            tracing::info!(
                giveaway_id,
                guild_id,
                admin_id = ctx.author().id.get(),
                "Giveaway winners overridden"
            );
            let names = winners
                .iter()
                .map(|id| format!("<@{}>", id))
                .collect::<Vec<_>>()
                .join(", ");
            format!("✅ Winners for `{}` set to {}.", giveaway_id, names)
        }
        SetWinnersOutcome::NotFound => {
            format!("❌ No running giveaway with id `{}`.", giveaway_id)
        }
        SetWinnersOutcome::Empty => {
            return send_usage_hint(ctx, Some("Name at least one winner.")).await;
        }
    };

    match ctx {
        poise::Context::Application(_) => acknowledge(ctx, text).await,
        poise::Context::Prefix(prefix) => {
            // Keep the override out of sight: drop the command and only flash a
            // short confirmation that does not name anyone.
            if let Err(e) = prefix.msg.delete(ctx.http()).await {
                tracing::warn!("Failed to delete gset invocation: {}", e);
            }
            let short = if outcome == SetWinnersOutcome::Ok {
                "✅ Done."
            } else {
                "❌ Giveaway not found."
            };
            post_transient(
                &ctx.serenity_context().http,
                ctx.channel_id(),
                short,
                data.config.warning_lifetime,
            )
            .await?;
            Ok(())
        }
    }
}

/// List the giveaways running in this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Giveaways"
)]
pub async fn glist(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    let active = ctx.data().giveaways.active_in_guild(guild_id).await?;

    if active.is_empty() {
        ctx.say("No giveaways are running right now.").await?;
        return Ok(());
    }

    let lines: Vec<String> = active
        .iter()
        .map(|g| {
            format!(
                "• **{}** in <#{}> | id `{}` | ends <t:{}:R> | {} entr{}",
                g.prize,
                g.channel_id,
                g.id,
                g.end_time.timestamp(),
                g.entries.len(),
                if g.entries.len() == 1 { "y" } else { "ies" }
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("🎁 Running Giveaways")
        .description(lines.join("\n"))
        .color(0x5865F2)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} running",
            active.len()
        )));

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
