use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

// Category definitions with emojis and order
const CATEGORY_ORDER: &[&str] = &["Giveaways", "Moderation", "Utilities"];

fn get_category_emoji(category: &str) -> &'static str {
    match category {
        "Giveaways" => "🎁",
        "Moderation" => "🛡️",
        "Utilities" => "🧰",
        _ => "•",
    }
}

struct CommandMetadata {
    priority: i32,
    description: Option<&'static str>,
    note: Option<&'static str>,
}

fn get_command_metadata(name: &str) -> CommandMetadata {
    match name {
        "gstart" => CommandMetadata {
            priority: 100,
            description: Some("Start a giveaway in the current channel."),
            note: Some("Durations look like `30s`, `10m`, `1h30m` or `2d`."),
        },
        "glist" => CommandMetadata {
            priority: 90,
            description: Some("List the giveaways running in this server."),
            note: None,
        },
        "whitelist" => CommandMetadata {
            priority: 80,
            description: Some("Add, remove or list channels exempt from the rate limit."),
            note: None,
        },
        _ => CommandMetadata {
            priority: 0,
            description: None,
            note: None,
        },
    }
}

/// Show a categorized list of commands.
#[poise::command(slash_command, prefix_command, category = "Utilities")]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let prefix = &ctx.data().config.prefix;
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        let metadata = get_command_metadata(&command.name);

        let description = metadata
            .description
            .or(command.description.as_deref())
            .unwrap_or("No description provided.");

        let mut entry = format!(
            "• **/{0}** or `{1}{0}`: {2}",
            command.name, prefix, description
        );

        if let Some(note) = metadata.note {
            entry.push_str(&format!("\n  ⤷ {}", note));
        }

        let category = command.category.as_deref().unwrap_or("Utilities");
        categories
            .entry(category)
            .or_default()
            .push((metadata.priority, entry));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Command Guide")
        .description(format!(
            "Every command works as a slash command or with the `{}` prefix.",
            prefix
        ))
        .color(serenity::Colour::from_rgb(88, 101, 242))
        .timestamp(serenity::Timestamp::now());

    // Sort categories based on defined order, then alphabetically for others
    let mut sorted_categories: Vec<_> = categories.keys().cloned().collect();
    sorted_categories.sort_by(|a, b| {
        let pos_a = CATEGORY_ORDER.iter().position(|&x| x == *a).unwrap_or(999);
        let pos_b = CATEGORY_ORDER.iter().position(|&x| x == *b).unwrap_or(999);
        pos_a.cmp(&pos_b).then(a.cmp(b))
    });

    for category in sorted_categories {
        if let Some(entries) = categories.get_mut(category) {
            // Sort by priority (descending), then name (ascending)
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let title = format!("{} {}", get_category_emoji(category), category);
            let formatted_entries: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

            for (i, chunk) in chunk_entries(&formatted_entries).iter().enumerate() {
                let field_name = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (cont.)", title)
                };

                embed = embed.field(field_name, chunk.join("\n"), false);
            }
        }
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(
        "Need a hand? Ping a moderator.",
    ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Group entries so no embed field goes past Discord's 1024 character limit.
fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Leave a bit of buffer under the limit.
        if current_length + entry_len + 1 > 1000 && !current_chunk.is_empty() {
            chunks.push(current_chunk);
            current_chunk = Vec::new();
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1; // +1 for newline
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_entries_splits_long_lists() {
        let entries: Vec<String> = (0..30).map(|_| "x".repeat(99)).collect();
        let chunks = chunk_entries(&entries);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 30);
        for chunk in &chunks {
            let len: usize = chunk.iter().map(|e| e.len() + 1).sum();
            assert!(len <= 1000);
        }
    }

    #[test]
    fn test_chunk_entries_empty() {
        assert!(chunk_entries(&[]).is_empty());
    }
}
