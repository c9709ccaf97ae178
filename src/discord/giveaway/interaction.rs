// Join button handling.
//
// The giveaway id is the id of the message the button sits on, so a click
// maps straight to `record_entry` without any lookup table.

use super::announcements::JOIN_BUTTON_ID;
use crate::core::giveaway::JoinOutcome;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

fn join_reply(outcome: JoinOutcome) -> &'static str {
    match outcome {
        JoinOutcome::Joined => "You entered the giveaway!",
        JoinOutcome::AlreadyJoined => "Already entered!",
        JoinOutcome::NotFound => "Giveaway ended.",
    }
}

/// Handle a component click. Returns `false` if it was not a giveaway button.
pub async fn handle_join_button(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<bool, Error> {
    if interaction.data.custom_id != JOIN_BUTTON_ID {
        return Ok(false);
    }

    let giveaway_id = interaction.message.id.get();
    let user_id = interaction.user.id.get();

    let reply = match data.giveaways.record_entry(giveaway_id, user_id).await {
        Ok(outcome) => join_reply(outcome),
        Err(err) => {
            tracing::error!(giveaway_id, user_id, "Failed to record giveaway entry: {}", err);
            "Could not enter you right now, please try again in a moment."
        }
    };

    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(reply)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(true)
}
