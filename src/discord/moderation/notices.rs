// Messages that clean up after themselves.

use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// Post `content` in `channel_id` and delete it again after `lifetime`.
///
/// The deletion runs on its own task so the caller never waits for it.
pub async fn post_transient(
    http: &Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    content: impl Into<String>,
    lifetime: Duration,
) -> Result<(), serenity::Error> {
    let message = channel_id.say(http, content).await?;

    let http = Arc::clone(http);
    tokio::spawn(async move {
        tokio::time::sleep(lifetime).await;
        if let Err(err) = message.delete(&http).await {
            tracing::debug!(
                message_id = message.id.get(),
                "Transient notice already gone: {}",
                err
            );
        }
    });

    Ok(())
}
