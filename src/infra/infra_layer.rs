// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "giveaway/giveaway_store.rs"]
pub mod giveaway;

#[path = "moderation/moderation_store.rs"]
pub mod moderation;
