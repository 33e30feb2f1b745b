use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::episode::EpisodeNumber;
use crate::matcher::RenameMapping;

const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOperation {
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameResult {
    Success,
    /// Source and target are the same path.
    Unchanged,
    AlreadyExists,
    NoPermission,
    SourceNotFound,
    OtherError(String),
}

impl RenameResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct RenameOutcome {
    pub episode: EpisodeNumber,
    pub operation: RenameOperation,
    pub result: RenameResult,
}

impl RenameOperation {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Renames `source` to `target`. An existing target is never overwritten.
    pub fn execute(&self) -> RenameResult {
        if self.source == self.target {
            return RenameResult::Unchanged;
        }
        if !self.source.exists() {
            return RenameResult::SourceNotFound;
        }
        if self.target.exists() {
            return RenameResult::AlreadyExists;
        }

        match fs::rename(&self.source, &self.target) {
            Ok(()) => RenameResult::Success,
            Err(e) => match e.kind() {
                ErrorKind::PermissionDenied => RenameResult::NoPermission,
                ErrorKind::NotFound => RenameResult::SourceNotFound,
                ErrorKind::AlreadyExists => RenameResult::AlreadyExists,
                _ => RenameResult::OtherError(e.to_string()),
            },
        }
    }
}

/// Executes every entry of a confirmed mapping, in mapping order.
pub fn apply_mapping(mapping: &RenameMapping) -> Vec<RenameOutcome> {
    mapping
        .entries
        .iter()
        .map(|entry| {
            let operation = RenameOperation::new(&entry.subtitle.local_path, &entry.target);
            let result = operation.execute();
            if result.is_success() {
                info!(
                    episode = %entry.episode(),
                    target = %operation.target.display(),
                    "renamed subtitle"
                );
            } else {
                warn!(
                    episode = %entry.episode(),
                    source = %operation.source.display(),
                    result = ?result,
                    "rename skipped"
                );
            }
            RenameOutcome {
                episode: entry.episode(),
                operation,
                result,
            }
        })
        .collect()
}

pub fn sanitize_filename(filename: &str) -> String {
    filename.replace(RESERVED_CHARS, "_")
}
