//! Joins extracted subtitles to local videos by episode number.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::ExtractedSubtitle;
use crate::episode::{EpisodeNumber, EpisodeParser};
use crate::error::{Result, SubdlError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub local_path: PathBuf,
    pub episode: EpisodeNumber,
}

/// One proposed rename: `subtitle` moves to `target`, next to `video`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub subtitle: ExtractedSubtitle,
    pub video: VideoFile,
    pub target: PathBuf,
}

impl RenameEntry {
    pub fn episode(&self) -> EpisodeNumber {
        self.subtitle.episode
    }
}

/// One-to-one subtitle to video mapping, ascending by episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMapping {
    pub entries: Vec<RenameEntry>,
}

impl RenameMapping {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `"old -> new"` lines for the confirmation prompt.
    pub fn describe(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| format!("{} -> {}", file_name(&entry.subtitle.local_path), file_name(&entry.target)))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MatchReport {
    pub mapping: RenameMapping,
    pub unmatched_subtitles: Vec<ExtractedSubtitle>,
    pub unmatched_videos: Vec<VideoFile>,
    /// `AmbiguousEpisodeMatch` for every episode left out of the mapping.
    pub conflicts: Vec<SubdlError>,
    /// Videos whose names carry no recognisable episode number.
    pub unparsed_videos: Vec<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Default)]
struct Sides {
    subtitles: Vec<ExtractedSubtitle>,
    videos: Vec<VideoFile>,
}

pub struct RenameMatcher {
    parser: EpisodeParser,
}

impl RenameMatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: EpisodeParser::new()?,
        })
    }

    /// Parses episode numbers out of video paths. The second list holds the
    /// paths that could not be parsed.
    pub fn parse_videos(&self, paths: &[PathBuf]) -> (Vec<VideoFile>, Vec<PathBuf>) {
        let mut videos = Vec::new();
        let mut unparsed = Vec::new();

        for path in paths {
            let name = file_name(path);
            match self.parser.parse(&name) {
                Some(episode) => videos.push(VideoFile {
                    local_path: path.clone(),
                    episode,
                }),
                None => {
                    debug!(file = %name, "no episode number in video name");
                    unparsed.push(path.clone());
                }
            }
        }

        (videos, unparsed)
    }

    /// Matches subtitles to the videos in `video_paths`.
    pub fn match_files(&self, subtitles: Vec<ExtractedSubtitle>, video_paths: &[PathBuf]) -> MatchReport {
        let (videos, unparsed_videos) = self.parse_videos(video_paths);
        let mut report = join(subtitles, videos);
        report.unparsed_videos = unparsed_videos;
        report
    }
}

/// Equality join on episode number. Only singleton pairs are committed;
/// any other combination with both sides present is a conflict.
pub fn join(subtitles: Vec<ExtractedSubtitle>, videos: Vec<VideoFile>) -> MatchReport {
    let mut by_episode: BTreeMap<EpisodeNumber, Sides> = BTreeMap::new();
    for subtitle in subtitles {
        by_episode.entry(subtitle.episode).or_default().subtitles.push(subtitle);
    }
    for video in videos {
        by_episode.entry(video.episode).or_default().videos.push(video);
    }

    let mut report = MatchReport::default();
    for (episode, sides) in by_episode {
        let (subtitle_count, video_count) = (sides.subtitles.len(), sides.videos.len());
        match (subtitle_count, video_count) {
            (1, 1) => {
                let Sides { mut subtitles, mut videos } = sides;
                let (subtitle, video) = (subtitles.remove(0), videos.remove(0));
                let target = target_path(&subtitle, &video);
                report.mapping.entries.push(RenameEntry {
                    subtitle,
                    video,
                    target,
                });
            }
            (_, 0) => report.unmatched_subtitles.extend(sides.subtitles),
            (0, _) => report.unmatched_videos.extend(sides.videos),
            (subtitles, videos) => {
                warn!(episode = %episode, subtitles, videos, "ambiguous episode match");
                report.conflicts.push(SubdlError::AmbiguousEpisodeMatch {
                    episode,
                    subtitles,
                    videos,
                });
            }
        }
    }

    report
}

/// The video's path with the subtitle's extension.
fn target_path(subtitle: &ExtractedSubtitle, video: &VideoFile) -> PathBuf {
    let ext = subtitle
        .local_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("ass");
    video.local_path.with_extension(ext)
}
