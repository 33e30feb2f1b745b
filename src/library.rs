use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SubdlError};

pub const VIDEO_EXTENSIONS: [&str; 5] = ["mkv", "mp4", "avi", "mov", "webm"];

/// A series folder inside the anime root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimeDirectory {
    pub path: PathBuf,
    pub derived_name: String,
}

impl AnimeDirectory {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let derived_name = path.file_name()?.to_string_lossy().to_string();
        Some(Self {
            path: path.to_path_buf(),
            derived_name,
        })
    }
}

/// Lists the series folders directly under `root`, sorted by name.
pub fn list_series(root: &Path) -> Result<Vec<AnimeDirectory>> {
    let entries = fs::read_dir(root).map_err(|source| SubdlError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut series: Vec<AnimeDirectory> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .filter_map(|entry| AnimeDirectory::from_path(entry.path()))
        .collect();

    series.sort_by(|a, b| a.derived_name.cmp(&b.derived_name));
    Ok(series)
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lists video files directly inside `directory`, sorted by name.
pub fn scan_videos(directory: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(directory).map_err(|source| SubdlError::Io {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut videos: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| is_video_file(path))
        .collect();

    videos.sort();
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_directories_sorted() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("Zeta Show")).unwrap();
        fs::create_dir(root.path().join("Alpha Show")).unwrap();
        fs::write(root.path().join("notes.txt"), "x").unwrap();

        let series = list_series(root.path()).unwrap();
        let names: Vec<_> = series.iter().map(|s| s.derived_name.as_str()).collect();
        assert_eq!(names, ["Alpha Show", "Zeta Show"]);
    }

    #[test]
    fn scans_video_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["EP02.MKV", "EP01.mp4", "EP01.ass", "cover.jpg"] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let videos = scan_videos(dir.path()).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["EP01.mp4", "EP02.MKV"]);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let err = list_series(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, SubdlError::Io { .. }));
    }
}
