// Discord side of the giveaway feature: the messaging/membership adapters,
// the join button handler and the background sweep loop.

pub mod announcements;
pub mod interaction;
pub mod sweep;

pub use announcements::DiscordGiveawayMessenger;
