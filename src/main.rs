// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases)
// - `discord/` = Discord-specific adapters (commands, events, background loops)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, event handlers and background tasks

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::giveaway::{GiveawayService, GiveawaySweeper, ThreadRandom, WinnerSelector};
use crate::core::moderation::{AntiSpamService, ContentFilter};
use crate::discord::commands::arguments::send_usage_hint;
use crate::discord::commands::presence;
use crate::discord::giveaway::{interaction, sweep};
use crate::discord::moderation::{
    handle_message_for_spam, spam_command_check, spawn_history_pruner, ScreenedMessages,
};
use crate::discord::{BoxedGiveawayStore, Data, Error};
use crate::infra::giveaway::{InMemoryGiveawayStore, SqliteGiveawayStore};
use crate::infra::moderation::SqliteWhitelistStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = handle_message_for_spam(ctx, new_message, data).await {
                tracing::error!("Error screening message: {}", e);
            }
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            if let Err(e) = interaction::handle_join_button(ctx, component, data).await {
                tracing::error!("Error handling giveaway button: {}", e);
            }
        }
        _ => {}
    }

    Ok(())
}

/// Turn command failures into replies instead of letting them vanish.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
            tracing::debug!(command = %ctx.command().name, "Bad arguments: {}", error);
            if let Err(e) = send_usage_hint(ctx, None).await {
                tracing::warn!("Failed to send usage hint: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { error: None, ctx, .. } => {
            // The message was already removed and the author warned.
            tracing::debug!(command = %ctx.command().name, "Command check rejected invocation");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(command = %ctx.command().name, "Command failed: {}", error);
            if let Err(e) = ctx
                .send(
                    poise::CreateReply::default()
                        .content("Something went wrong while running that command.")
                        .ephemeral(true),
                )
                .await
            {
                tracing::warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Open the durable giveaway store, or fall back to memory so the bot stays up.
async fn open_giveaway_store(config: &BotConfig) -> BoxedGiveawayStore {
    let path = config.giveaway_db_path();
    match SqliteGiveawayStore::new(&path.to_string_lossy()).await {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                "Failed to open giveaway database, giveaways will not survive a restart: {}",
                e
            );
            Box::new(InMemoryGiveawayStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = Arc::new(BotConfig::from_env()?);

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    std::fs::create_dir_all(&config.data_dir)
        .context("Failed to create data directory for SQLite files")?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let giveaway_store = open_giveaway_store(&config).await;
    let giveaway_service = Arc::new(GiveawayService::new(giveaway_store, Arc::clone(&clock)));
    let sweeper = Arc::new(GiveawaySweeper::new(
        Arc::clone(&giveaway_service),
        WinnerSelector::new(Arc::new(ThreadRandom)),
    ));

    let moderation_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!(
            "sqlite://{}?mode=rwc",
            config.moderation_db_path().display()
        ))
        .await
        .context("Failed to connect to moderation DB")?;
    let whitelist_store = SqliteWhitelistStore::new(moderation_pool);
    whitelist_store
        .migrate()
        .await
        .context("Failed to migrate moderation DB")?;
    let anti_spam = Arc::new(
        AntiSpamService::load(whitelist_store, config.spam_policy, Arc::clone(&clock))
            .await
            .context("Failed to load anti-spam whitelist")?,
    );

    let content_filter = Arc::new(ContentFilter::new(&config.blocked_words));
    if content_filter.is_enabled() {
        tracing::info!(words = config.blocked_words.len(), "Content filter enabled");
    }

    // Create the data structure that will be shared across all commands
    let data = Data {
        giveaways: Arc::clone(&giveaway_service),
        sweeper: Arc::clone(&sweeper),
        anti_spam: Arc::clone(&anti_spam),
        content_filter,
        screened: ScreenedMessages::new(),
        config: Arc::clone(&config),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::giveaway::gstart(),
                discord::commands::giveaway::gset(),
                discord::commands::giveaway::glist(),
                discord::commands::whitelist::whitelist(),
                discord::commands::help::help(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                ..Default::default()
            },
            // Event handler for messages and button clicks
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            // Rate limit and content filter apply to text commands too.
            command_check: Some(|ctx| Box::pin(spam_command_check(ctx))),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is starting up");

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                presence::on_ready(ctx, &data.config.prefix);

                // Finalize expired giveaways every few seconds.
                sweep::spawn_giveaway_sweeper(
                    ctx.http.clone(),
                    Arc::clone(&data.sweeper),
                    data.config.sweep_interval,
                );

                // Keep the rate-limit history from growing without bound.
                spawn_history_pruner(Arc::clone(&data.anti_spam));

                tracing::info!("Bot is ready");
                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
