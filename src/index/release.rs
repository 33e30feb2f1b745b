use regex::Regex;

use crate::episode::{EpisodeNumber, EpisodeParser};

/// Fields recovered from a fansub release name such as
/// `[SubsPlease] Sousou no Frieren - 05 (1080p) [ABCD1234].mkv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRelease {
    pub group: Option<String>,
    pub series_title: String,
    pub episode: Option<EpisodeNumber>,
}

#[derive(Debug)]
pub struct ReleaseNameParser {
    episodes: EpisodeParser,
    group: Regex,
    title_end: Regex,
    separators: Regex,
}

impl ReleaseNameParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            episodes: EpisodeParser::new()?,
            group: Regex::new(r"^\s*\[([^\]]+)\]")?,
            // The title runs until the episode token or the first tag.
            title_end: Regex::new(
                r"(?i)\s-\s\d|[\[(]|\bS\d{1,2}E\d|\b(?:episode|ep)\s*\d|\bE\d{1,4}\b|\.(?:mkv|mp4|avi|webm|mov)$",
            )?,
            separators: Regex::new(r"[_\s]+")?,
        })
    }

    pub fn parse(&self, release_name: &str) -> ParsedRelease {
        let name = release_name.trim();

        let (group, rest) = match self.group.captures(name) {
            Some(captures) => {
                let whole = captures.get(0).map(|m| m.end()).unwrap_or(0);
                (Some(captures[1].trim().to_string()), &name[whole..])
            }
            None => (None, name),
        };

        let title = match self.title_end.find(rest) {
            Some(m) => &rest[..m.start()],
            None => rest,
        };
        let series_title = self
            .separators
            .replace_all(title, " ")
            .trim_matches(&[' ', '-', '.'] as &[char])
            .to_string();

        ParsedRelease {
            group,
            series_title,
            episode: self.episodes.parse(rest),
        }
    }
}
