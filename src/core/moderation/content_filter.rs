// Blocked-word filter for message content.

/// Case-insensitive substring filter. An empty word list lets everything through.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    blocked: Vec<String>,
}

impl ContentFilter {
    pub fn new<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let blocked = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { blocked }
    }

    pub fn is_enabled(&self) -> bool {
        !self.blocked.is_empty()
    }

    /// The first blocked word found in `content`, if any.
    pub fn find_blocked(&self, content: &str) -> Option<&str> {
        if self.blocked.is_empty() {
            return None;
        }
        let lowered = content.to_lowercase();
        self.blocked
            .iter()
            .find(|word| lowered.contains(word.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_case_insensitively() {
        let filter = ContentFilter::new(["SpamLink", "abuse"]);
        assert_eq!(filter.find_blocked("check my spamlink!"), Some("spamlink"));
        assert_eq!(filter.find_blocked("No ABUSE here"), Some("abuse"));
        assert_eq!(filter.find_blocked("hello world"), None);
    }

    #[test]
    fn test_empty_words_are_ignored() {
        let filter = ContentFilter::new(["", "   "]);
        assert!(!filter.is_enabled());
        assert_eq!(filter.find_blocked("anything"), None);
    }
}
