// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "clock.rs"]
pub mod clock;

#[path = "giveaway/mod.rs"]
pub mod giveaway;

#[path = "moderation/mod.rs"]
pub mod moderation;
