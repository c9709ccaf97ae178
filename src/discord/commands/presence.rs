// Bot presence.
//
// Discord-layer glue only: the activity text advertises how to start a
// giveaway with whatever prefix the bot was configured with.

use poise::serenity_prelude as serenity;

fn status_text(prefix: &str) -> String {
    format!("{}gstart | giveaways", prefix)
}

/// Resets the bot's status to the default message.
pub fn reset_status(ctx: &serenity::Context, prefix: &str) {
    let activity = serenity::ActivityData::playing(status_text(prefix));
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready so the default presence is set in one place.
pub fn on_ready(ctx: &serenity::Context, prefix: &str) {
    reset_status(ctx, prefix);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_prefix() {
        assert_eq!(status_text("!"), "!gstart | giveaways");
        assert_eq!(status_text("g?"), "g?gstart | giveaways");
    }
}
