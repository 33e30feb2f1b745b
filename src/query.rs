use regex::Regex;

/// A search string derived from a directory name or a canonical title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub raw_text: String,
    pub normalized_text: String,
}

/// Turns noisy directory names into plain title strings.
///
/// Rules run in order and the whole set is re-applied until the text stops
/// changing, so building a query from an already normalized title is a no-op.
#[derive(Debug)]
pub struct QueryBuilder {
    rules: Vec<(&'static str, Regex)>,
    separators: Regex,
    spaces: Regex,
}

impl QueryBuilder {
    pub fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            // [SubsPlease], (2019), {tags}
            ("brackets", Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}")?),
            (
                "resolution",
                Regex::new(r"(?i)\b(?:2160|1440|1080|720|576|480)[pi]\b|\b4k\b")?,
            ),
            (
                "source",
                Regex::new(
                    r"(?i)\b(?:bd(?:rip)?|blu-?ray|web-?dl|web-?rip|hevc|x\.?26[45]|h\.?26[45]|aac|flac|opus|10-?bit|8-?bit|dual[\s-]audio|multi[\s-]subs?|batch|complete)\b",
                )?,
            ),
            (
                "year_range",
                Regex::new(r"\b(?:19|20)\d{2}\s*[-~]\s*(?:(?:19|20)\d{2}\b)?")?,
            ),
            (
                "season",
                Regex::new(
                    r"(?i)\bseason\s*\d{1,2}\b|\b\d{1,2}(?:st|nd|rd|th)\s+season\b|\bS\d{1,2}(?:E\d{1,4})?\b",
                )?,
            ),
        ];

        Ok(Self {
            rules,
            separators: Regex::new(r"[._]+")?,
            spaces: Regex::new(r"\s+")?,
        })
    }

    /// Builds a query from a raw directory name or title.
    pub fn build(&self, raw: &str) -> SearchQuery {
        let raw_text = raw.trim().to_string();

        let mut current = raw_text.clone();
        loop {
            let next = self.normalize_once(&current);
            if next == current {
                break;
            }
            current = next;
        }

        let normalized_text = if current.is_empty() {
            tracing::debug!(raw = %raw_text, "normalization removed everything, keeping raw text");
            raw_text.clone()
        } else {
            current
        };

        SearchQuery {
            raw_text,
            normalized_text,
        }
    }

    fn normalize_once(&self, input: &str) -> String {
        let mut text = input.to_string();

        for (name, rule) in &self.rules {
            let replaced = rule.replace_all(&text, " ");
            if replaced != text {
                tracing::trace!(rule = name, before = %text, after = %replaced, "stripped noise");
                text = replaced.into_owned();
            }
        }

        let text = self.separators.replace_all(&text, " ");
        let text = self.spaces.replace_all(&text, " ");
        text.trim_matches(&[' ', '-', ',', '~', '+'] as &[char]).to_string()
    }
}
