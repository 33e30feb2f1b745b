use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{MetadataApi, TitleCandidate};
use crate::config::MetadataConfig;
use crate::error::{Result, SubdlError};

const MEDIA_QUERY: &str = r#"
query ($search: String) {
  Media (search: $search, type: ANIME) {
    id
    title {
      romaji
      english
    }
    synonyms
  }
}
"#;

#[derive(Debug)]
pub struct AniListClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<MediaData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    status: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: u64,
    title: MediaTitle,
    #[serde(default)]
    synonyms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MediaTitle {
    romaji: Option<String>,
    english: Option<String>,
}

impl AniListClient {
    pub fn new(config: &MetadataConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubdlError::Metadata(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl MetadataApi for AniListClient {
    async fn lookup(&self, search: &str) -> Result<Option<TitleCandidate>> {
        info!(search, "searching AniList");

        let body = json!({
            "query": MEDIA_QUERY,
            "variables": { "search": search },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubdlError::Metadata(format!("request failed: {e}")))?;

        let status = response.status();
        // AniList answers 404 with a GraphQL error body when nothing matches.
        if status == StatusCode::NOT_FOUND {
            debug!(search, "AniList has no match");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SubdlError::Metadata(format!("HTTP error: {status}")));
        }

        let payload: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| SubdlError::Metadata(format!("invalid response: {e}")))?;

        candidate_from_response(payload)
    }
}

fn candidate_from_response(payload: GraphQlResponse) -> Result<Option<TitleCandidate>> {
    if let Some(error) = payload.errors.iter().find(|e| e.status != Some(404)) {
        return Err(SubdlError::Metadata(error.message.clone()));
    }

    let Some(media) = payload.data.and_then(|d| d.media) else {
        return Ok(None);
    };
    let Some(romaji_title) = media.title.romaji.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };

    info!(romaji = %romaji_title, id = media.id, "found canonical title");
    Ok(Some(TitleCandidate {
        external_id: media.id,
        romaji_title,
        english_title: media.title.english,
        synonyms: media.synonyms,
    }))
}
