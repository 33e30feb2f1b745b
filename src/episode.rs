use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCALE: u64 = 1000;

/// Episode identity used as the join key between subtitles and videos.
///
/// Stored as fixed-point thousandths so that `"01"`, `"1"` and `"1.0"`
/// compare equal while specials such as `12.5` stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeNumber(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseEpisodeError {
    #[error("episode number is empty")]
    Empty,
    #[error("invalid episode number: {0:?}")]
    Invalid(String),
}

impl EpisodeNumber {
    pub fn new(whole: u32) -> Self {
        Self(u64::from(whole) * SCALE)
    }

    pub fn whole(&self) -> u32 {
        (self.0 / SCALE) as u32
    }

    /// Fractional episodes (recaps, `.5` specials).
    pub fn is_special(&self) -> bool {
        self.0 % SCALE != 0
    }
}

impl From<u32> for EpisodeNumber {
    fn from(whole: u32) -> Self {
        Self::new(whole)
    }
}

impl FromStr for EpisodeNumber {
    type Err = ParseEpisodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseEpisodeError::Empty);
        }

        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || whole.len() > 6 || !is_digits(whole) || !is_digits(fraction) {
            return Err(ParseEpisodeError::Invalid(s.to_string()));
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > 3 {
            return Err(ParseEpisodeError::Invalid(s.to_string()));
        }

        let whole: u64 = whole
            .parse()
            .map_err(|_| ParseEpisodeError::Invalid(s.to_string()))?;
        let thousandths = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<3}");
            padded
                .parse::<u64>()
                .map_err(|_| ParseEpisodeError::Invalid(s.to_string()))?
        };

        Ok(Self(whole * SCALE + thousandths))
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let fraction = self.0 % SCALE;
        if fraction == 0 {
            write!(f, "{whole:02}")
        } else {
            let digits = format!("{fraction:03}");
            write!(f, "{whole:02}.{}", digits.trim_end_matches('0'))
        }
    }
}

/// Extracts episode numbers from release and video filenames.
///
/// Heuristics are tried in order and the first one that yields a number wins:
///
/// 1. `S01E05`
/// 2. `Title - 05`
/// 3. `Episode 05`, `Ep05`, `EP 05`
/// 4. bare `E05` / `E 05`
/// 5. a 1-3 digit number delimited by separators (`Show.05.mkv`)
///
/// Each number must end at a separator or the end of the name, so ordinals
/// (`2nd`) and years never win over the real episode.
///
/// Bracketed tags (`[1080p]`, `(BD)`, `[ABCD1234]`) and the extension are
/// removed before matching so CRCs and resolutions never parse as episodes.
#[derive(Debug)]
pub struct EpisodeParser {
    tags: Regex,
    heuristics: Vec<(&'static str, Regex)>,
}

impl EpisodeParser {
    pub fn new() -> Result<Self, regex::Error> {
        const PART: &str = r"\d{1,3}(?:\.\d{1,2})?";
        const END: &str = r"(?:v\d+)?(?:[\s._\-]|$)";

        let heuristics = vec![
            (
                "season_episode",
                Regex::new(&format!(r"(?i)\bS\d{{1,2}}\s?E(\d{{1,4}}(?:\.\d{{1,2}})?){END}"))?,
            ),
            ("dash_separated", Regex::new(&format!(r"\s-\s({PART}){END}"))?),
            ("episode_keyword", Regex::new(&format!(r"(?i)\b(?:episode|ep)[\s._]*({PART}){END}"))?),
            ("bare_e", Regex::new(&format!(r"(?i)(?:^|[\s._\-])E\s?({PART}){END}"))?),
            ("separated_number", Regex::new(&format!(r"(?:^|[\s._\-])({PART}){END}"))?),
        ];

        Ok(Self {
            tags: Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}")?,
            heuristics,
        })
    }

    /// Parses the episode number out of a filename (with or without extension).
    pub fn parse(&self, filename: &str) -> Option<EpisodeNumber> {
        let stem = strip_extension(filename);
        let cleaned = self.tags.replace_all(stem, " ");

        for (name, pattern) in &self.heuristics {
            if let Some(captures) = pattern.captures(&cleaned) {
                if let Ok(number) = captures[1].parse::<EpisodeNumber>() {
                    tracing::trace!(filename, heuristic = name, %number, "parsed episode number");
                    return Some(number);
                }
            }
        }

        None
    }
}

/// Removes a trailing media extension, leaving dotted titles like `Dr. Stone` intact.
fn strip_extension(filename: &str) -> &str {
    let path = Path::new(filename);
    match (path.extension().and_then(|e| e.to_str()), path.file_stem().and_then(|s| s.to_str())) {
        (Some(ext), Some(_))
            if (2..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic()) =>
        {
            &filename[..filename.len() - ext.len() - 1]
        }
        _ => filename,
    }
}
