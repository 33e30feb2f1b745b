use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::episode::EpisodeNumber;

/// Errors produced while resolving, downloading and matching subtitles.
#[derive(Debug, Error)]
pub enum SubdlError {
    /// Neither the directory name nor the canonical title found a series.
    #[error("no subtitle index match found for {query:?}")]
    NoMatchFound { query: String },

    /// A release group lists the same episode more than once.
    #[error("release group {group:?} lists episode {episode} {count} times")]
    AmbiguousEpisodeData {
        group: String,
        episode: EpisodeNumber,
        count: usize,
    },

    /// Joining subtitles to videos for this episode is not one-to-one.
    #[error("episode {episode} matches {subtitles} subtitle(s) and {videos} video(s)")]
    AmbiguousEpisodeMatch {
        episode: EpisodeNumber,
        subtitles: usize,
        videos: usize,
    },

    #[error("download of episode {episode} failed after {attempts} attempt(s): {reason}")]
    DownloadFailed {
        episode: EpisodeNumber,
        attempts: u32,
        reason: String,
    },

    #[error("archive for episode {episode} is corrupt: {reason}")]
    CorruptArchive {
        episode: EpisodeNumber,
        reason: String,
    },

    #[error("archive for episode {episode} has an unexpected layout: {layout}")]
    UnexpectedArchiveLayout {
        episode: EpisodeNumber,
        layout: String,
    },

    /// The extracted subtitle would replace a file already in the series folder.
    #[error("episode {episode}: {} already exists, not overwritten", path.display())]
    OutputExists { episode: EpisodeNumber, path: PathBuf },

    /// The destination directory cannot take any more writes.
    #[error("destination {} is not writable: {source}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filesystem error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not build HTTP client: {0}")]
    HttpClient(String),

    #[error("subtitle index request failed: {0}")]
    Index(String),

    #[error("metadata lookup failed: {0}")]
    Metadata(String),

    #[error("selection cancelled")]
    Cancelled,

    #[error("nothing to choose from: {0}")]
    EmptyChoice(String),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl SubdlError {
    /// Classifies a filesystem error hit while writing into `path`.
    ///
    /// Permission, read-only and out-of-space errors make the whole
    /// destination unusable; anything else only affects the current file.
    pub fn from_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        use io::ErrorKind::*;

        let path = path.into();
        match source.kind() {
            PermissionDenied | ReadOnlyFilesystem | StorageFull => {
                Self::DestinationUnwritable { path, source }
            }
            _ => Self::Io { path, source },
        }
    }

    /// Whether the error aborts the remaining batch instead of one episode.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DestinationUnwritable { .. })
    }

    /// The episode an error is scoped to, if any.
    pub fn episode(&self) -> Option<EpisodeNumber> {
        match self {
            Self::AmbiguousEpisodeData { episode, .. }
            | Self::AmbiguousEpisodeMatch { episode, .. }
            | Self::DownloadFailed { episode, .. }
            | Self::CorruptArchive { episode, .. }
            | Self::UnexpectedArchiveLayout { episode, .. }
            | Self::OutputExists { episode, .. } => Some(*episode),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubdlError>;
