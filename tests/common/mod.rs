//! Mocks for the network-facing traits and the interactive channel.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use subdl::archive::{ArchiveFetcher, FetchError};
use subdl::episode::EpisodeNumber;
use subdl::index::{EpisodeFile, IndexEntry, ReleaseGroup, SubtitleIndex};
use subdl::metadata::{MetadataApi, TitleCandidate};
use subdl::select::Chooser;
use subdl::{Result, SubdlError};

/// Index that answers from a fixed table and records every query.
#[derive(Default)]
pub struct MockIndex {
    responses: HashMap<String, Vec<IndexEntry>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockIndex {
    pub fn with(mut self, query: &str, entries: Vec<IndexEntry>) -> Self {
        self.responses.insert(query.to_string(), entries);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubtitleIndex for MockIndex {
    async fn search(&self, query: &str) -> Result<Vec<IndexEntry>> {
        self.calls.lock().unwrap().push(query.to_string());
        Ok(self.responses.get(query).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockMetadata {
    pub candidate: Option<TitleCandidate>,
    pub calls: AtomicUsize,
}

impl MockMetadata {
    pub fn returning(romaji: &str) -> Self {
        Self {
            candidate: Some(TitleCandidate {
                external_id: 1,
                romaji_title: romaji.to_string(),
                english_title: None,
                synonyms: Vec::new(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataApi for MockMetadata {
    async fn lookup(&self, _search: &str) -> Result<Option<TitleCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidate.clone())
    }
}

/// Serves archive bytes by URL. URLs in `failing` fail that many times
/// before succeeding (`u32::MAX` fails forever).
#[derive(Default)]
pub struct ScriptedFetcher {
    bodies: HashMap<String, Vec<u8>>,
    failing: Mutex<HashMap<String, u32>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl ScriptedFetcher {
    pub fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn fail(self, url: &str, times: u32) -> Self {
        self.failing.lock().unwrap().insert(url.to_string(), times);
        self
    }

    pub fn attempts(&self, url: &str) -> u32 {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ArchiveFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        *self.attempts.lock().unwrap().entry(url.to_string()).or_default() += 1;

        {
            let mut failing = self.failing.lock().unwrap();
            if let Some(remaining) = failing.get_mut(url) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(FetchError("connection reset".to_string()));
                }
            }
        }

        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError("404 Not Found".to_string()))
    }
}

#[derive(Debug, Clone)]
pub enum Answer {
    Choose(usize),
    Many(Vec<usize>),
    Confirm(bool),
    Text(String),
}

/// Replays answers in order; running out of answers cancels.
#[derive(Default)]
pub struct ScriptedChooser {
    answers: VecDeque<Answer>,
    pub prompts: Vec<String>,
    pub confirmed_details: Vec<String>,
}

impl ScriptedChooser {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    fn next(&mut self, prompt: &str) -> Result<Answer> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or(SubdlError::Cancelled)
    }
}

impl Chooser for ScriptedChooser {
    fn choose(&mut self, prompt: &str, _options: &[String]) -> Result<usize> {
        match self.next(prompt)? {
            Answer::Choose(i) => Ok(i),
            other => panic!("expected a single choice for {prompt:?}, scripted {other:?}"),
        }
    }

    fn choose_many(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>> {
        match self.next(prompt)? {
            Answer::Many(indices) if indices.is_empty() => Ok((0..options.len()).collect()),
            Answer::Many(indices) => Ok(indices),
            other => panic!("expected a multi choice for {prompt:?}, scripted {other:?}"),
        }
    }

    fn confirm(&mut self, prompt: &str, details: &[String]) -> Result<bool> {
        self.confirmed_details = details.to_vec();
        match self.next(prompt)? {
            Answer::Confirm(answer) => Ok(answer),
            other => panic!("expected a confirmation for {prompt:?}, scripted {other:?}"),
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        match self.next(prompt)? {
            Answer::Text(text) => Ok(text),
            other => panic!("expected text for {prompt:?}, scripted {other:?}"),
        }
    }
}

pub mod fixtures {
    use super::*;

    pub fn archive_url(group: &str, episode: u32) -> String {
        format!("https://animetosho.test/storage/attach/{group}/{episode:02}.ass.xz")
    }

    pub fn episode_file(group: &str, episode: u32) -> EpisodeFile {
        EpisodeFile {
            episode: EpisodeNumber::new(episode),
            archive_url: archive_url(group, episode),
            archive_filename: format!("{episode:02}.ass.xz"),
            release_name: format!("[{group}] Example Show - {episode:02} (1080p).mkv"),
        }
    }

    pub fn release_group(name: &str, episodes: impl IntoIterator<Item = u32>) -> ReleaseGroup {
        ReleaseGroup::new(name, episodes.into_iter().map(|e| episode_file(name, e)).collect())
    }

    pub fn entry(title: &str, groups: Vec<ReleaseGroup>) -> IndexEntry {
        IndexEntry {
            series_title: title.to_string(),
            release_groups: groups,
            raw_score: 1,
        }
    }

    pub fn subtitle_payload(episode: u32) -> Vec<u8> {
        format!("[Script Info]\nTitle: Example Show - {episode:02}\n\n[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hello\n")
            .into_bytes()
    }

    pub fn xz(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        lzma_rs::xz_compress(&mut &payload[..], &mut out).unwrap();
        out
    }
}
