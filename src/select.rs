//! Disambiguation steps that need a human: series directory, series
//! candidate, release group and episodes.

use tracing::{info, warn};

use crate::error::{Result, SubdlError};
use crate::index::{EpisodeFile, IndexEntry, ReleaseGroup};
use crate::library::AnimeDirectory;

/// Interactive selection and confirmation channel.
///
/// Implementations return indices into the `options` they were given.
pub trait Chooser {
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<usize>;

    /// Multiple selection; the "all" shortcut returns every index.
    fn choose_many(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>>;

    fn confirm(&mut self, prompt: &str, details: &[String]) -> Result<bool>;

    /// Free-text answer.
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

fn checked_index(index: usize, len: usize) -> Result<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(SubdlError::Cancelled)
    }
}

pub fn select_directory(
    mut directories: Vec<AnimeDirectory>,
    chooser: &mut impl Chooser,
) -> Result<AnimeDirectory> {
    if directories.is_empty() {
        return Err(SubdlError::EmptyChoice("no anime series directories".to_string()));
    }
    let options: Vec<String> = directories.iter().map(|d| d.derived_name.clone()).collect();
    let index = checked_index(chooser.choose("Select an anime directory:", &options)?, options.len())?;
    Ok(directories.swap_remove(index))
}

/// Picks the series entry: automatic for one candidate, otherwise always
/// asks, listing candidates in the order the index returned them.
pub fn select_candidate(mut candidates: Vec<IndexEntry>, chooser: &mut impl Chooser) -> Result<IndexEntry> {
    match candidates.len() {
        0 => Err(SubdlError::EmptyChoice("no series candidates".to_string())),
        1 => {
            let entry = candidates.remove(0);
            info!(series = %entry.series_title, "single series candidate selected");
            Ok(entry)
        }
        len => {
            let options: Vec<String> = candidates
                .iter()
                .map(|entry| {
                    let groups: Vec<&str> = entry.release_groups.iter().map(|g| g.name.as_str()).collect();
                    format!("{} ({})", entry.series_title, groups.join(", "))
                })
                .collect();
            let index = checked_index(chooser.choose("Select a series:", &options)?, len)?;
            Ok(candidates.swap_remove(index))
        }
    }
}

/// Picks a release group of `entry`. Duplicated episodes are left in place;
/// see [`exclude_duplicates`].
pub fn pick_release(mut entry: IndexEntry, chooser: &mut impl Chooser) -> Result<ReleaseGroup> {
    let group = match entry.release_groups.len() {
        0 => {
            return Err(SubdlError::EmptyChoice(format!(
                "no release groups for {}",
                entry.series_title
            )));
        }
        1 => entry.release_groups.remove(0),
        len => {
            let options: Vec<String> = entry
                .release_groups
                .iter()
                .map(|g| format!("{} ({} episodes)", g.name, g.episodes.len()))
                .collect();
            let index = checked_index(chooser.choose("Select a release group:", &options)?, len)?;
            entry.release_groups.swap_remove(index)
        }
    };

    info!(group = %group.name, episodes = group.episodes.len(), "release group selected");
    Ok(group)
}

/// Drops episodes the group lists more than once so they are never offered.
/// The dropped episodes come back as `AmbiguousEpisodeData` errors.
pub fn exclude_duplicates(group: ReleaseGroup) -> (ReleaseGroup, Vec<SubdlError>) {
    let (group, excluded) = group.split_duplicates();
    for err in &excluded {
        warn!(error = %err, "episode excluded");
    }
    (group, excluded)
}

/// Offers the group's episodes in ascending order and returns the chosen
/// ones, also ascending.
pub fn select_episodes(group: &ReleaseGroup, chooser: &mut impl Chooser) -> Result<Vec<EpisodeFile>> {
    if group.episodes.is_empty() {
        return Err(SubdlError::EmptyChoice(format!("no episodes from {}", group.name)));
    }

    let mut episodes = group.episodes.clone();
    episodes.sort_by_key(|e| e.episode);

    let options: Vec<String> = episodes
        .iter()
        .map(|e| format!("Episode {} - {}", e.episode, e.release_name))
        .collect();

    let mut indices = chooser.choose_many("Select episodes:", &options)?;
    indices.sort_unstable();
    indices.dedup();
    if let Some(&last) = indices.last() {
        checked_index(last, episodes.len())?;
    }

    Ok(indices.into_iter().map(|i| episodes[i].clone()).collect())
}
