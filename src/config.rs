// Runtime configuration read from the environment (and `.env` via dotenv).

use crate::core::moderation::RateLimitPolicy;
use anyhow::Context as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted rate-limit window.
pub const MAX_SPAM_WINDOW_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Prefix for text commands, `!` by default.
    pub prefix: String,
    /// Folder holding the SQLite files.
    pub data_dir: PathBuf,
    pub sweep_interval: Duration,
    pub spam_policy: RateLimitPolicy,
    /// How long transient warnings stay up before deleting themselves.
    pub warning_lifetime: Duration,
    pub blocked_words: Vec<String>,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let token = std::env::var("DISCORD_TOKEN").context(
            "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
        )?;

        let prefix = std::env::var("BOT_PREFIX")
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "!".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let sweep_secs: u64 = env_or("GIVEAWAY_SWEEP_SECS", 10).max(1);
        let max_messages: usize = env_or("SPAM_MAX_MESSAGES", 5);
        let window_secs = clamp_window_secs(env_or("SPAM_WINDOW_SECS", 5));
        let warning_secs: u64 = env_or("SPAM_WARNING_SECS", 3);

        let blocked_words = std::env::var("BLOCKED_WORDS")
            .map(|raw| parse_word_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            token,
            prefix,
            data_dir: PathBuf::from(data_dir),
            sweep_interval: Duration::from_secs(sweep_secs),
            spam_policy: RateLimitPolicy {
                window: Duration::from_secs(window_secs),
                threshold: max_messages,
            },
            warning_lifetime: Duration::from_secs(warning_secs),
            blocked_words,
        })
    }

    pub fn giveaway_db_path(&self) -> PathBuf {
        self.data_dir.join("giveaways.db")
    }

    pub fn moderation_db_path(&self) -> PathBuf {
        self.data_dir.join("moderation.db")
    }
}

/// Read and parse `key`, falling back to `default` when it is unset or invalid.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Invalid config value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Keep the rate-limit window between one second and a day.
fn clamp_window_secs(secs: u64) -> u64 {
    if secs > MAX_SPAM_WINDOW_SECS {
        tracing::warn!(
            value = secs,
            max = MAX_SPAM_WINDOW_SECS,
            "SPAM_WINDOW_SECS is too large, capping it"
        );
    }
    secs.clamp(1, MAX_SPAM_WINDOW_SECS)
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_word_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_word_list() {
        assert_eq!(
            parse_word_list(" spam, scam ,,  free nitro "),
            vec!["spam", "scam", "free nitro"]
        );
        assert!(parse_word_list("").is_empty());
        assert!(parse_word_list(" , ").is_empty());
    }

    #[test]
    fn test_spam_window_is_clamped() {
        assert_eq!(clamp_window_secs(0), 1);
        assert_eq!(clamp_window_secs(5), 5);
        assert_eq!(clamp_window_secs(9_000_000_000_000), MAX_SPAM_WINDOW_SECS);
    }
}
