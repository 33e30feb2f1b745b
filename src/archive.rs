//! Download, verification and decompression of per-episode subtitle archives.

use std::fs;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{DownloadConfig, MAX_CONCURRENCY};
use crate::episode::EpisodeNumber;
use crate::error::{Result, SubdlError};
use crate::index::EpisodeFile;
use crate::rename_engine::sanitize_filename;

const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const TAR_MAGIC_OFFSET: usize = 257;
const DEFAULT_EXTENSION: &str = "ass";

/// A failed transfer. Every fetch error is retried.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubdlError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError(e.to_string()))?;

        let bytes = response.bytes().await.map_err(|e| FetchError(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

impl From<&DownloadConfig> for RetryPolicy {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSubtitle {
    pub local_path: PathBuf,
    pub episode: EpisodeNumber,
}

/// Outcome of a batch, every list ascending by episode.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub extracted: Vec<ExtractedSubtitle>,
    pub failures: Vec<SubdlError>,
    /// Episodes never started because of a fatal error.
    pub skipped: Vec<EpisodeNumber>,
    pub fatal: Option<SubdlError>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty() && self.fatal.is_none()
    }
}

pub struct ArchivePipeline<F> {
    fetcher: F,
    retry: RetryPolicy,
    dest_dir: PathBuf,
    concurrency: usize,
    write_lock: Mutex<()>,
}

impl<F: ArchiveFetcher> ArchivePipeline<F> {
    pub fn new(fetcher: F, retry: RetryPolicy, dest_dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            fetcher,
            retry,
            dest_dir: dest_dir.into(),
            concurrency: concurrency.clamp(1, MAX_CONCURRENCY),
            write_lock: Mutex::new(()),
        }
    }

    /// Checks that the destination exists and accepts new files.
    pub fn ensure_destination(&self) -> Result<()> {
        fs::create_dir_all(&self.dest_dir).map_err(|e| SubdlError::from_write(&self.dest_dir, e))?;
        tempfile::Builder::new()
            .prefix(".subdl-check-")
            .tempfile_in(&self.dest_dir)
            .map_err(|e| SubdlError::from_write(&self.dest_dir, e))?;
        Ok(())
    }

    /// Runs one episode through download, verification, decompression and
    /// write. The temporary archive never outlives this call.
    pub async fn fetch_and_extract(&self, series_title: &str, file: &EpisodeFile) -> Result<ExtractedSubtitle> {
        let episode = file.episode;
        let bytes = self.download(file).await?;

        let mut archive = tempfile::Builder::new()
            .prefix(".subdl-")
            .suffix(".xz")
            .tempfile_in(&self.dest_dir)
            .map_err(|e| SubdlError::from_write(&self.dest_dir, e))?;
        debug!(episode = %episode, path = %archive.path().display(), "staged archive");

        let staged = archive.write_all(&bytes).and_then(|()| archive.flush());
        let payload = match staged {
            Ok(()) => decode_archive(archive.as_file_mut(), episode),
            Err(e) => Err(SubdlError::from_write(archive.path(), e)),
        };

        let archive_path = archive.path().to_path_buf();
        if let Err(e) = archive.close() {
            warn!(path = %archive_path.display(), error = %e, "failed to remove temporary archive");
        }

        let payload = payload?;
        let target = self.dest_dir.join(output_name(series_title, file));
        {
            let _guard = self.write_lock.lock().await;
            write_new(&target, &payload).map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => SubdlError::OutputExists {
                    episode,
                    path: target.clone(),
                },
                _ => SubdlError::from_write(&target, e),
            })?;
        }

        info!(episode = %episode, path = %target.display(), "extracted subtitle");
        Ok(ExtractedSubtitle {
            local_path: target,
            episode,
        })
    }

    async fn download(&self, file: &EpisodeFile) -> Result<Vec<u8>> {
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch(&file.archive_url).await {
                Ok(bytes) => {
                    debug!(episode = %file.episode, bytes = bytes.len(), attempt, "downloaded archive");
                    return Ok(bytes);
                }
                Err(e) if attempt >= self.retry.max_attempts => {
                    return Err(SubdlError::DownloadFailed {
                        episode: file.episode,
                        attempts: attempt,
                        reason: e.0,
                    });
                }
                Err(e) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        episode = %file.episode,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "download failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Fetches `files` with bounded parallelism. Per-episode failures are
    /// collected; a fatal error stops episodes that have not started yet.
    pub async fn fetch_batch(&self, series_title: &str, files: Vec<EpisodeFile>) -> BatchReport {
        let mut report = BatchReport::default();

        if let Err(e) = self.ensure_destination() {
            error!(error = %e, "destination is not usable");
            report.skipped = files.iter().map(|f| f.episode).collect();
            report.skipped.sort();
            report.fatal = Some(e);
            return report;
        }

        let abort = AtomicBool::new(false);
        let abort = &abort;
        let results: Vec<(EpisodeNumber, Option<Result<ExtractedSubtitle>>)> = stream::iter(files)
            .map(|file| async move {
                if abort.load(Ordering::SeqCst) {
                    return (file.episode, None);
                }
                let result = self.fetch_and_extract(series_title, &file).await;
                if let Err(e) = &result {
                    if e.is_fatal() {
                        abort.store(true, Ordering::SeqCst);
                    }
                    error!(episode = %file.episode, error = %e, "episode failed");
                }
                (file.episode, Some(result))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut failures: Vec<(EpisodeNumber, SubdlError)> = Vec::new();
        for (episode, result) in results {
            match result {
                Some(Ok(subtitle)) => report.extracted.push(subtitle),
                Some(Err(e)) if e.is_fatal() && report.fatal.is_none() => report.fatal = Some(e),
                Some(Err(e)) => failures.push((episode, e)),
                None => report.skipped.push(episode),
            }
        }

        failures.sort_by_key(|(episode, _)| *episode);
        report.failures = failures.into_iter().map(|(_, e)| e).collect();
        report.extracted.sort_by_key(|s| s.episode);
        report.skipped.sort();
        report
    }
}

fn decode_archive(archive: &mut fs::File, episode: EpisodeNumber) -> Result<Vec<u8>> {
    let corrupt = |reason: String| SubdlError::CorruptArchive { episode, reason };

    archive
        .seek(SeekFrom::Start(0))
        .map_err(|e| corrupt(e.to_string()))?;
    let mut reader = BufReader::new(archive);

    let header = reader.fill_buf().map_err(|e| corrupt(e.to_string()))?;
    if !header.starts_with(&XZ_MAGIC) {
        return Err(corrupt("missing xz header".to_string()));
    }

    let mut payload = Vec::new();
    lzma_rs::xz_decompress(&mut reader, &mut payload).map_err(|e| corrupt(e.to_string()))?;

    check_layout(&payload, episode)?;
    Ok(payload)
}

fn check_layout(payload: &[u8], episode: EpisodeNumber) -> Result<()> {
    let layout = if payload.is_empty() {
        "empty payload"
    } else if payload
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5)
        .is_some_and(|magic| magic == b"ustar")
    {
        "tar archive with multiple entries"
    } else {
        return Ok(());
    };

    Err(SubdlError::UnexpectedArchiveLayout {
        episode,
        layout: layout.to_string(),
    })
}

/// Writes `payload` to a file that must not exist yet.
fn write_new(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(payload)?;
    file.flush()
}

/// `"{series} - {episode}.{ext}"`, with the extension taken from the
/// archive name (`foo.ass.xz` gives `ass`).
pub fn output_name(series_title: &str, file: &EpisodeFile) -> String {
    let inner = file
        .archive_filename
        .strip_suffix(".xz")
        .unwrap_or(&file.archive_filename);
    let ext = Path::new(inner)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_ascii_lowercase();

    format!("{} - {}.{}", sanitize_filename(series_title.trim()), file.episode, ext)
}
