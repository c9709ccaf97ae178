// Discord layer - commands and event handlers.
//
// Everything here translates between serenity/poise types and the core
// services. No giveaway or rate-limit rules live in this layer.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "giveaway/giveaway_adapters.rs"]
pub mod giveaway;

#[path = "moderation/moderation_handlers.rs"]
pub mod moderation;

use crate::config::BotConfig;
use crate::core::giveaway::{GiveawayService, GiveawayStore, GiveawaySweeper};
use crate::core::moderation::{AntiSpamService, ContentFilter};
use crate::infra::moderation::SqliteWhitelistStore;
use moderation::ScreenedMessages;
use std::sync::Arc;

/// Giveaway persistence picked at startup: SQLite, or in-memory if the
/// database cannot be opened.
pub type BoxedGiveawayStore = Box<dyn GiveawayStore>;

/// User data, which is stored and accessible in all command invocations.
pub struct Data {
    pub giveaways: Arc<GiveawayService<BoxedGiveawayStore>>,
    pub sweeper: Arc<GiveawaySweeper<BoxedGiveawayStore>>,
    pub anti_spam: Arc<AntiSpamService<SqliteWhitelistStore>>,
    pub content_filter: Arc<ContentFilter>,
    /// Verdicts for prefix commands screened before dispatch.
    pub screened: ScreenedMessages,
    pub config: Arc<BotConfig>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
