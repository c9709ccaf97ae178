// Argument helpers shared by the text and slash forms of the commands.

use crate::discord::{Context, Error};

/// Usage line for a command, in text-command form.
pub fn usage_for(command: &str, prefix: &str) -> Option<String> {
    let args = match command {
        "gstart" => "10m Prize",
        "gset" => "<giveaway id> <@user> [@user...]",
        "glist" => "",
        "whitelist" => "add|remove|list [#channel]",
        "add" | "remove" | "list" => return usage_for("whitelist", prefix),
        _ => return None,
    };

    Some(if args.is_empty() {
        format!("Usage: `{}{}`", prefix, command)
    } else {
        format!("Usage: `{}{} {}`", prefix, command, args)
    })
}

/// Reply with a short hint about what went wrong and how to call the command.
pub async fn send_usage_hint(ctx: Context<'_>, problem: Option<&str>) -> Result<(), Error> {
    let prefix = &ctx.data().config.prefix;
    let usage = usage_for(&ctx.command().name, prefix)
        .unwrap_or_else(|| format!("Try `{}help`.", prefix));

    let text = match problem {
        Some(problem) => format!("{}\n{}", problem, usage),
        None => usage,
    };

    ctx.send(poise::CreateReply::default().content(text).ephemeral(true))
        .await?;
    Ok(())
}

/// A snowflake written as a raw id, a user mention or a message link.
pub fn parse_snowflake(raw: &str) -> Option<u64> {
    let trimmed = raw
        .trim()
        .trim_start_matches("<@")
        .trim_start_matches('!')
        .trim_end_matches('>');

    // Message links end in ".../channels/<guild>/<channel>/<message>"
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);

    last.parse::<u64>().ok().filter(|id| *id > 0)
}

/// Every user id in a free-form list of mentions/ids. Unparseable parts are skipped.
pub fn parse_user_ids(raw: &str) -> Vec<u64> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .filter_map(parse_snowflake)
        .collect()
}
