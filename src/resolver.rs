//! Multi-stage title resolution: index search, then at most one metadata
//! lookup for a canonical title, then one more index search.

use tracing::{debug, info, warn};

use crate::error::{Result, SubdlError};
use crate::index::{IndexEntry, ReleaseGroup, SubtitleIndex};
use crate::metadata::{MetadataApi, TitleCandidate};
use crate::query::{QueryBuilder, SearchQuery};

/// Entries found for a directory and how they were found.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub entries: Vec<IndexEntry>,
    /// The query that produced `entries`.
    pub query: SearchQuery,
    /// Set when the metadata fallback supplied the title.
    pub canonical: Option<TitleCandidate>,
}

#[derive(Debug)]
enum ResolveState {
    Searching {
        query: SearchQuery,
        canonical: Option<TitleCandidate>,
    },
    ResolvingViaMetadata,
}

pub struct TitleResolver<'a, I: ?Sized, M: ?Sized> {
    index: &'a I,
    metadata: &'a M,
    queries: &'a QueryBuilder,
}

impl<'a, I, M> TitleResolver<'a, I, M>
where
    I: SubtitleIndex + ?Sized,
    M: MetadataApi + ?Sized,
{
    pub fn new(index: &'a I, metadata: &'a M, queries: &'a QueryBuilder) -> Self {
        Self {
            index,
            metadata,
            queries,
        }
    }

    pub async fn resolve(&self, original: &SearchQuery) -> Result<Resolution> {
        let mut state = ResolveState::Searching {
            query: original.clone(),
            canonical: None,
        };

        loop {
            state = match state {
                ResolveState::Searching { query, canonical } => {
                    let entries = self.index.search(&query.normalized_text).await?;
                    if !entries.is_empty() {
                        info!(
                            query = %query.normalized_text,
                            series = entries.len(),
                            "resolved series candidates"
                        );
                        return Ok(Resolution {
                            entries,
                            query,
                            canonical,
                        });
                    }
                    if canonical.is_some() {
                        return Err(SubdlError::NoMatchFound {
                            query: original.raw_text.clone(),
                        });
                    }
                    info!(query = %query.normalized_text, "no index results, trying metadata lookup");
                    ResolveState::ResolvingViaMetadata
                }
                ResolveState::ResolvingViaMetadata => {
                    let candidate = match self.metadata.lookup(&original.raw_text).await {
                        Ok(candidate) => candidate,
                        Err(e) => {
                            warn!(error = %e, "metadata lookup failed");
                            None
                        }
                    };
                    let Some(candidate) = candidate else {
                        return Err(SubdlError::NoMatchFound {
                            query: original.raw_text.clone(),
                        });
                    };
                    ResolveState::Searching {
                        query: self.queries.build(&candidate.romaji_title),
                        canonical: Some(candidate),
                    }
                }
            };
        }
    }

    /// Re-queries the index for `[group] title` and merges any extra
    /// episodes of the same series and group into `group`.
    pub async fn expand_release(&self, series_title: &str, mut group: ReleaseGroup) -> Result<ReleaseGroup> {
        let term = format!("[{}] {}", group.name, series_title);
        let entries = self.index.search(&term).await?;

        let name = group.name.clone();
        let extra = entries
            .into_iter()
            .filter(|entry| entry.series_title.eq_ignore_ascii_case(series_title))
            .flat_map(|entry| entry.release_groups)
            .filter(|candidate| candidate.name == name);

        let before = group.episodes.len();
        for other in extra {
            group.merge(other);
        }
        debug!(
            group = %group.name,
            added = group.episodes.len() - before,
            "expanded release listing"
        );
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct NoResults {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SubtitleIndex for NoResults {
        async fn search(&self, query: &str) -> Result<Vec<IndexEntry>> {
            self.calls.lock().unwrap().push(query.to_string());
            Ok(Vec::new())
        }
    }

    struct FailingMetadata;

    #[async_trait]
    impl MetadataApi for FailingMetadata {
        async fn lookup(&self, _search: &str) -> Result<Option<TitleCandidate>> {
            Err(SubdlError::Metadata("offline".into()))
        }
    }

    #[tokio::test]
    async fn metadata_failure_ends_in_no_match() {
        let index = NoResults {
            calls: Mutex::new(Vec::new()),
        };
        let queries = QueryBuilder::new().unwrap();
        let resolver = TitleResolver::new(&index, &FailingMetadata, &queries);

        let err = resolver
            .resolve(&queries.build("[Group] Unknown Show"))
            .await
            .unwrap_err();

        assert!(matches!(err, SubdlError::NoMatchFound { query } if query == "[Group] Unknown Show"));
        assert_eq!(*index.calls.lock().unwrap(), ["Unknown Show"]);
    }
}
