//! External anime metadata lookups used to recover canonical titles.

mod anilist;

pub use anilist::AniListClient;

use async_trait::async_trait;

use crate::error::Result;

/// Best match returned by a metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleCandidate {
    pub external_id: u64,
    pub romaji_title: String,
    pub english_title: Option<String>,
    pub synonyms: Vec<String>,
}

#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Looks up the best match for a free-text title.
    async fn lookup(&self, search: &str) -> Result<Option<TitleCandidate>>;
}
