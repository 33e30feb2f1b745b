mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use common::ScriptedFetcher;
use common::fixtures::{archive_url, episode_file, subtitle_payload, xz};
use subdl::SubdlError;
use subdl::archive::{ArchivePipeline, RetryPolicy};
use subdl::episode::EpisodeNumber;

fn no_delay() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

/// Files left behind by the pipeline's temporary archives.
fn leftover_archives(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".subdl-") || name.ends_with(".xz"))
        .collect()
}

#[tokio::test]
async fn extracted_payload_matches_reference() {
    let dir = tempfile::tempdir().unwrap();
    let payload = subtitle_payload(1);
    let fetcher = ScriptedFetcher::default().serve(&archive_url("G", 1), xz(&payload));
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 1);

    let extracted = pipeline
        .fetch_and_extract("Example Show", &episode_file("G", 1))
        .await
        .unwrap();

    assert_eq!(extracted.episode, EpisodeNumber::new(1));
    assert_eq!(extracted.local_path, dir.path().join("Example Show - 01.ass"));
    assert_eq!(fs::read(&extracted.local_path).unwrap(), payload);
    assert!(leftover_archives(dir.path()).is_empty());
}

#[tokio::test]
async fn corrupt_archive_is_not_retried_and_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let url = archive_url("G", 2);
    let fetcher = ScriptedFetcher::default().serve(&url, b"<html>rate limited</html>".to_vec());
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 1);

    let err = pipeline
        .fetch_and_extract("Example Show", &episode_file("G", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, SubdlError::CorruptArchive { .. }));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn truncated_xz_stream_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = xz(&subtitle_payload(3));
    bytes.truncate(bytes.len() / 2);
    let fetcher = ScriptedFetcher::default().serve(&archive_url("G", 3), bytes);
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 1);

    let err = pipeline
        .fetch_and_extract("Example Show", &episode_file("G", 3))
        .await
        .unwrap_err();

    assert!(matches!(err, SubdlError::CorruptArchive { .. }));
    assert!(leftover_archives(dir.path()).is_empty());
}

#[tokio::test]
async fn empty_payload_is_an_unexpected_layout() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::default().serve(&archive_url("G", 4), xz(b""));
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 1);

    let err = pipeline
        .fetch_and_extract("Example Show", &episode_file("G", 4))
        .await
        .unwrap_err();

    assert!(matches!(err, SubdlError::UnexpectedArchiveLayout { .. }));
    assert!(leftover_archives(dir.path()).is_empty());
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let url = archive_url("G", 5);
    let fetcher = ScriptedFetcher::default()
        .serve(&url, xz(&subtitle_payload(5)))
        .fail(&url, 2);
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 1);

    let extracted = pipeline
        .fetch_and_extract("Example Show", &episode_file("G", 5))
        .await
        .unwrap();

    assert!(extracted.local_path.exists());
}

#[tokio::test]
async fn one_failed_episode_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut fetcher = ScriptedFetcher::default();
    for episode in 1..=12 {
        fetcher = fetcher.serve(&archive_url("G", episode), xz(&subtitle_payload(episode)));
    }
    let fetcher = fetcher.fail(&archive_url("G", 7), u32::MAX);
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 3);

    let files: Vec<_> = (1..=12).rev().map(|e| episode_file("G", e)).collect();
    let report = pipeline.fetch_batch("Example Show", files).await;

    let extracted: Vec<u32> = report.extracted.iter().map(|s| s.episode.whole()).collect();
    assert_eq!(extracted, [1, 2, 3, 4, 5, 6, 8, 9, 10, 11, 12]);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        SubdlError::DownloadFailed { episode, attempts: 3, .. } if *episode == EpisodeNumber::new(7)
    ));
    assert!(report.fatal.is_none());
    assert!(report.skipped.is_empty());
    assert!(leftover_archives(dir.path()).is_empty());
}

#[tokio::test]
async fn malformed_archives_do_not_stop_sibling_episodes() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = ScriptedFetcher::default()
        .serve(&archive_url("G", 1), xz(&subtitle_payload(1)))
        .serve(&archive_url("G", 2), b"<html>not an archive</html>".to_vec())
        .serve(&archive_url("G", 3), xz(b""))
        .serve(&archive_url("G", 4), xz(&subtitle_payload(4)));
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 2);

    let files: Vec<_> = (1..=4).map(|e| episode_file("G", e)).collect();
    let report = pipeline.fetch_batch("Example Show", files).await;

    let extracted: Vec<u32> = report.extracted.iter().map(|s| s.episode.whole()).collect();
    assert_eq!(extracted, [1, 4]);
    assert_eq!(report.failures.len(), 2);
    assert!(matches!(&report.failures[0], SubdlError::CorruptArchive { .. }));
    assert!(matches!(&report.failures[1], SubdlError::UnexpectedArchiveLayout { .. }));
    assert!(report.fatal.is_none());
    assert!(leftover_archives(dir.path()).is_empty());
    assert_eq!(
        fs::read(dir.path().join("Example Show - 04.ass")).unwrap(),
        subtitle_payload(4)
    );
}

#[tokio::test]
async fn existing_subtitle_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("Example Show - 06.ass");
    fs::write(&existing, "hand-made").unwrap();
    let fetcher = ScriptedFetcher::default().serve(&archive_url("G", 6), xz(&subtitle_payload(6)));
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 1);

    let err = pipeline
        .fetch_and_extract("Example Show", &episode_file("G", 6))
        .await
        .unwrap_err();

    assert!(matches!(&err, SubdlError::OutputExists { path, .. } if *path == existing));
    assert!(!err.is_fatal());
    assert_eq!(fs::read_to_string(&existing).unwrap(), "hand-made");
    assert!(leftover_archives(dir.path()).is_empty());
}

#[tokio::test]
async fn failing_downloads_use_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let url = archive_url("G", 7);
    let fetcher = ScriptedFetcher::default().fail(&url, u32::MAX);
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 1);

    let report = pipeline.fetch_batch("Example Show", vec![episode_file("G", 7)]).await;

    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_complete());
}

#[cfg(unix)]
#[tokio::test]
async fn unwritable_destination_aborts_the_batch() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

    // Root ignores directory permissions.
    if tempfile::tempfile_in(dir.path()).is_ok() {
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let fetcher = ScriptedFetcher::default().serve(&archive_url("G", 1), xz(&subtitle_payload(1)));
    let pipeline = ArchivePipeline::new(fetcher, no_delay(), dir.path(), 2);

    let report = pipeline
        .fetch_batch("Example Show", vec![episode_file("G", 2), episode_file("G", 1)])
        .await;

    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(report.fatal, Some(SubdlError::DestinationUnwritable { .. })));
    assert_eq!(report.skipped, [EpisodeNumber::new(1), EpisodeNumber::new(2)]);
    assert!(report.extracted.is_empty());
}
