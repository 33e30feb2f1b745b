use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info};

use super::{EpisodeFile, IndexEntry, ReleaseNameParser, ReleaseRow, SubtitleIndex, group_releases};
use crate::config::IndexConfig;
use crate::error::{Result, SubdlError};

const USER_AGENT: &str = concat!("subdl/", env!("CARGO_PKG_VERSION"));

/// Anime Tosho search, restricted to releases that carry subtitle attachments.
#[derive(Debug)]
pub struct AnimeToshoIndex {
    client: reqwest::Client,
    base_url: Url,
    search_suffix: String,
    subtitle_label: String,
    releases: ReleaseNameParser,
}

impl AnimeToshoIndex {
    pub fn new(config: &IndexConfig, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SubdlError::Index(format!("invalid base url {:?}: {e}", config.base_url)))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SubdlError::Index(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            search_suffix: config.search_suffix.clone(),
            subtitle_label: config.subtitle_label.clone(),
            releases: ReleaseNameParser::new()?,
        })
    }

    fn search_term(&self, query: &str) -> String {
        if self.search_suffix.is_empty() {
            query.to_string()
        } else {
            format!("{query} {}", self.search_suffix)
        }
    }
}

#[async_trait]
impl SubtitleIndex for AnimeToshoIndex {
    async fn search(&self, query: &str) -> Result<Vec<IndexEntry>> {
        let url = self
            .base_url
            .join("search")
            .map_err(|e| SubdlError::Index(e.to_string()))?;
        let term = self.search_term(query);
        info!(query = %term, "searching subtitle index");

        let response = self
            .client
            .get(url)
            .query(&[("disp", "attachments"), ("q", term.as_str())])
            .send()
            .await
            .map_err(|e| SubdlError::Index(format!("request for {term:?} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SubdlError::Index(format!("HTTP error: {}", response.status())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SubdlError::Index(e.to_string()))?;

        let rows = parse_search_page(&html, &self.base_url, &self.subtitle_label, &self.releases)?;
        let entries = group_releases(rows);
        debug!(query = %term, series = entries.len(), "index search finished");
        Ok(entries)
    }
}

/// Extracts release rows that carry a subtitle attachment labelled `label`.
pub fn parse_search_page(
    html: &str,
    base_url: &Url,
    label: &str,
    releases: &ReleaseNameParser,
) -> Result<Vec<ReleaseRow>> {
    let document = Html::parse_document(html);
    let entry_selector = selector("div.home_list_entry")?;
    let name_selector = selector("div.link a")?;
    let anchor_selector = selector("a")?;

    let mut rows = Vec::new();

    for entry in document.select(&entry_selector) {
        let Some(name) = entry
            .select(&name_selector)
            .next()
            .map(|a| a.text().collect::<String>().trim().to_string())
        else {
            continue;
        };

        let Some(href) = entry
            .select(&anchor_selector)
            .find(|a| a.text().collect::<String>().trim() == label)
            .and_then(|a| a.value().attr("href"))
        else {
            debug!(release = %name, "no matching subtitle attachment");
            continue;
        };

        let archive_url = match base_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                debug!(release = %name, href, error = %e, "skipping unparsable attachment link");
                continue;
            }
        };

        let parsed = releases.parse(&name);
        let (Some(group), Some(episode)) = (parsed.group, parsed.episode) else {
            debug!(release = %name, "skipping release without group or episode number");
            continue;
        };

        let archive_filename = archive_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .unwrap_or("subtitle.ass.xz")
            .to_string();

        rows.push(ReleaseRow {
            group,
            series_title: parsed.series_title,
            file: EpisodeFile {
                episode,
                archive_url: archive_url.to_string(),
                archive_filename,
                release_name: name,
            },
        });
    }

    Ok(rows)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SubdlError::Index(format!("bad selector {css:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::EpisodeNumber;

    const LABEL: &str = "English subs [eng, ASS]";

    fn page(entries: &[(&str, Option<&str>)]) -> String {
        let body: String = entries
            .iter()
            .map(|(name, attachment)| {
                let link = attachment
                    .map(|href| format!(r#"<a href="{href}">{LABEL}</a> | <a href="/x">Signs [eng, ASS]</a>"#))
                    .unwrap_or_default();
                format!(
                    r#"<div class="home_list_entry"><div class="link"><a href="/view/1">{name}</a></div><div class="links">{link}</div></div>"#
                )
            })
            .collect();
        format!("<html><body>{body}</body></html>")
    }

    #[test]
    fn extracts_rows_with_labelled_attachments() {
        let base = Url::parse("https://animetosho.org").unwrap();
        let releases = ReleaseNameParser::new().unwrap();
        let html = page(&[
            (
                "[SubsPlease] Example Show - 02 (1080p) [AAAA0000].mkv",
                Some("/storage/attach/00000002/Example%20Show%20-%2002.ass.xz"),
            ),
            ("[SubsPlease] Example Show - 03 (1080p) [BBBB0000].mkv", None),
            ("Example Show Batch (1080p)", Some("/storage/attach/00000009/batch.ass.xz")),
        ]);

        let rows = parse_search_page(&html, &base, LABEL, &releases).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.group, "SubsPlease");
        assert_eq!(row.series_title, "Example Show");
        assert_eq!(row.file.episode, EpisodeNumber::new(2));
        assert_eq!(
            row.file.archive_url,
            "https://animetosho.org/storage/attach/00000002/Example%20Show%20-%2002.ass.xz"
        );
        assert_eq!(row.file.archive_filename, "Example%20Show%20-%2002.ass.xz");
    }

    #[test]
    fn empty_page_yields_no_rows() {
        let base = Url::parse("https://animetosho.org").unwrap();
        let releases = ReleaseNameParser::new().unwrap();
        let rows = parse_search_page("<html></html>", &base, LABEL, &releases).unwrap();
        assert!(rows.is_empty());
    }
}
