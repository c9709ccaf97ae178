// Parsing of human duration strings for `gstart`.
//
// Accepts compact forms ("30s", "10m", "2h", "1d", "1w"), combinations ("1h30m")
// and verbose forms ("30 minutes", "2 hours", "1 day 6 hours").

use super::giveaway_models::GiveawayError;
use std::time::Duration;

/// Parse a duration string like "10m", "1h30m" or "2 hours".
///
/// A zero total is rejected: a giveaway has to run for a positive span.
pub fn parse_duration(input: &str) -> Result<Duration, GiveawayError> {
    let normalized: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if normalized.is_empty() {
        return Err(invalid(input));
    }

    let mut total: u64 = 0;
    let mut rest = normalized.as_str();

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(invalid(input));
        }
        let number: u64 = rest[..digits_end].parse().map_err(|_| invalid(input))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let multiplier = unit_multiplier(&rest[..unit_end]).ok_or_else(|| invalid(input))?;
        rest = &rest[unit_end..];

        total = number
            .checked_mul(multiplier)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| invalid(input))?;
    }

    if total == 0 {
        return Err(GiveawayError::InvalidDuration(
            "duration must be longer than zero".to_string(),
        ));
    }

    Ok(Duration::from_secs(total))
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let multiplier = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86400,
        "w" | "week" | "weeks" => 604800,
        _ => return None,
    };
    Some(multiplier)
}

fn invalid(input: &str) -> GiveawayError {
    GiveawayError::InvalidDuration(format!("could not understand '{}'", input.trim()))
}

/// Format a Duration into a human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let plural = |n: u64| if n == 1 { "" } else { "s" };

    if total_secs < 60 {
        format!("{} second{}", total_secs, plural(total_secs))
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        format!("{} minute{}", mins, plural(mins))
    } else if total_secs < 86400 {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        if mins > 0 {
            format!(
                "{} hour{} and {} minute{}",
                hours,
                plural(hours),
                mins,
                plural(mins)
            )
        } else {
            format!("{} hour{}", hours, plural(hours))
        }
    } else {
        let days = total_secs / 86400;
        let hours = (total_secs % 86400) / 3600;
        if hours > 0 {
            format!(
                "{} day{} and {} hour{}",
                days,
                plural(days),
                hours,
                plural(hours)
            )
        } else {
            format!("{} day{}", days, plural(days))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_units() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("2w").unwrap(), Duration::from_secs(1_209_600));
    }

    #[test]
    fn test_combined_and_verbose() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("30 minutes").unwrap(), Duration::from_secs(1800));
        assert_eq!(
            parse_duration("1 Day 6 Hours").unwrap(),
            Duration::from_secs(86400 + 6 * 3600)
        );
    }

    #[test]
    fn test_rejects_garbage_and_zero() {
        for input in ["", "   ", "soon", "10", "m10", "10 parsecs", "0s", "0h0m"] {
            let err = parse_duration(input).unwrap_err();
            assert!(
                matches!(err, GiveawayError::InvalidDuration(_)),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_duration("99999999999999999999w").is_err());
        assert!(parse_duration("18446744073709551615w").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(1)), "1 second");
        assert_eq!(format_duration(Duration::from_secs(600)), "10 minutes");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1 hour and 30 minutes");
        assert_eq!(format_duration(Duration::from_secs(86400)), "1 day");
    }
}
