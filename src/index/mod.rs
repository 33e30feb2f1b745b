//! Subtitle index abstraction.
//!
//! An index search returns flat release rows; [`group_releases`] folds them
//! into one [`IndexEntry`] per series, each holding its release groups and
//! their episodes.

mod animetosho;
mod release;

pub use animetosho::{AnimeToshoIndex, parse_search_page};
pub use release::{ParsedRelease, ReleaseNameParser};

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::episode::EpisodeNumber;
use crate::error::{Result, SubdlError};

/// One downloadable subtitle archive for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeFile {
    pub episode: EpisodeNumber,
    pub archive_url: String,
    pub archive_filename: String,
    pub release_name: String,
}

/// Subtitles for one series from one release group, ascending by episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseGroup {
    pub name: String,
    pub episodes: Vec<EpisodeFile>,
}

impl ReleaseGroup {
    pub fn new(name: impl Into<String>, mut episodes: Vec<EpisodeFile>) -> Self {
        // Stable, so duplicate episode numbers stay adjacent and visible.
        episodes.sort_by_key(|e| e.episode);
        Self {
            name: name.into(),
            episodes,
        }
    }

    /// Episode numbers listed more than once, with their counts.
    pub fn duplicate_episodes(&self) -> Vec<(EpisodeNumber, usize)> {
        let mut counts: BTreeMap<EpisodeNumber, usize> = BTreeMap::new();
        for file in &self.episodes {
            *counts.entry(file.episode).or_default() += 1;
        }
        counts.into_iter().filter(|(_, count)| *count > 1).collect()
    }

    /// Removes every episode listed more than once and reports each one as
    /// `AmbiguousEpisodeData`; the remaining episodes are unique.
    pub fn split_duplicates(mut self) -> (ReleaseGroup, Vec<SubdlError>) {
        let duplicates = self.duplicate_episodes();
        self.episodes
            .retain(|file| !duplicates.iter().any(|(episode, _)| *episode == file.episode));
        let excluded = duplicates
            .into_iter()
            .map(|(episode, count)| SubdlError::AmbiguousEpisodeData {
                group: self.name.clone(),
                episode,
                count,
            })
            .collect();
        (self, excluded)
    }

    /// Adds episodes from another listing of the same group, skipping
    /// archives that are already present.
    pub fn merge(&mut self, other: ReleaseGroup) {
        for file in other.episodes {
            if !self.episodes.iter().any(|e| e.archive_url == file.archive_url) {
                self.episodes.push(file);
            }
        }
        self.episodes.sort_by_key(|e| e.episode);
    }
}

/// A series-level search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub series_title: String,
    pub release_groups: Vec<ReleaseGroup>,
    /// Number of index rows folded into this entry.
    pub raw_score: u32,
}

impl IndexEntry {
    pub fn group(&self, name: &str) -> Option<&ReleaseGroup> {
        self.release_groups.iter().find(|g| g.name == name)
    }
}

/// A single release as listed by the index, before grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRow {
    pub group: String,
    pub series_title: String,
    pub file: EpisodeFile,
}

/// Folds release rows into series entries, keeping the index's order.
///
/// Series are keyed case-insensitively and appear in order of their first
/// row; groups are ordered by name.
pub fn group_releases(rows: Vec<ReleaseRow>) -> Vec<IndexEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut series: HashMap<String, (String, u32, BTreeMap<String, Vec<EpisodeFile>>)> =
        HashMap::new();

    for row in rows {
        let key = row.series_title.to_lowercase();
        let slot = series.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (row.series_title.clone(), 0, BTreeMap::new())
        });
        slot.1 += 1;
        slot.2.entry(row.group).or_default().push(row.file);
    }

    order
        .into_iter()
        .filter_map(|key| series.remove(&key))
        .map(|(series_title, raw_score, groups)| IndexEntry {
            series_title,
            release_groups: groups
                .into_iter()
                .map(|(name, episodes)| ReleaseGroup::new(name, episodes))
                .collect(),
            raw_score,
        })
        .collect()
}

/// A searchable subtitle repository.
#[async_trait]
pub trait SubtitleIndex: Send + Sync {
    /// Searches by free text; entries come back in relevance order.
    async fn search(&self, query: &str) -> Result<Vec<IndexEntry>>;
}
