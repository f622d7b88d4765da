//! bioRxiv / medRxiv adapter. The details API has no search endpoint: it
//! pages by cursor over a date window, so this adapter walks the most
//! recent two years and filters client-side by keyword.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Days, Utc};
use metrics::counter;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::fetch::types::{RawPaper, RawRecord, SourceAdapter};
use crate::fetch::{build_client, get_json, FetchConfig};
use crate::registry::SourceId;

const API_PAGE_SIZE: usize = 100;
const WINDOW_DAYS: u64 = 730;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailsPage {
    collection: Vec<Preprint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Preprint {
    doi: Option<String>,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    authors: Option<String>,
    date: Option<String>,
}

pub struct BiorxivAdapter {
    source: SourceId,
    client: reqwest::Client,
    cfg: FetchConfig,
    base_url: String,
}

impl BiorxivAdapter {
    /// `source` must be `Biorxiv` or `Medrxiv`; both servers share one API.
    pub fn new(source: SourceId, cfg: &FetchConfig) -> Self {
        let host = Self::host(source);
        Self {
            source,
            client: build_client(cfg.timeout_secs),
            cfg: cfg.clone(),
            base_url: format!("https://api.biorxiv.org/details/{host}"),
        }
    }

    fn host(source: SourceId) -> &'static str {
        match source {
            SourceId::Medrxiv => "medrxiv",
            _ => "biorxiv",
        }
    }

    /// Plain keyword filter: any search-term word appears in the title or
    /// abstract (case-insensitive).
    pub fn matches_term(term: &str, title: &str, abstract_text: &str) -> bool {
        let title = title.to_lowercase();
        let abstract_text = abstract_text.to_lowercase();
        term.to_lowercase()
            .split_whitespace()
            .any(|word| title.contains(word) || abstract_text.contains(word))
    }

    fn raw_from_preprint(&self, p: Preprint) -> RawPaper {
        let doi = p.doi.unwrap_or_default();
        let host = Self::host(self.source);
        let (url, pdf_url) = if doi.is_empty() {
            (String::new(), None)
        } else {
            (
                format!("https://www.{host}.org/content/{doi}"),
                Some(format!("https://www.{host}.org/content/{doi}.full.pdf")),
            )
        };

        RawPaper {
            id: doi.clone(),
            doi,
            title: p.title.unwrap_or_default(),
            abstract_text: p.abstract_text.unwrap_or_default(),
            authors: p.authors.unwrap_or_default(),
            publication_date: p.date.unwrap_or_default(),
            pdf_url,
            url,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SourceAdapter for BiorxivAdapter {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch(&self, term: &str, limit: usize) -> Result<Vec<RawRecord>> {
        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_days(Days::new(WINDOW_DAYS))
            .unwrap_or(end);

        let mut out: Vec<RawRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = 0usize;

        loop {
            if out.len() >= limit {
                break;
            }
            let url = format!("{}/{start}/{end}/{cursor}", self.base_url);
            let payload = match get_json(&self.client, &url, &[], &self.cfg).await {
                // A dead API on the very first page is a systemic failure.
                Err(e) if cursor == 0 => {
                    return Err(e.context(format!("{} details", Self::host(self.source))))
                }
                Err(e) => {
                    counter!("fetch_page_errors_total").increment(1);
                    tracing::warn!(error = ?e, source = self.source.as_str(), "page fetch failed");
                    break;
                }
                Ok(v) => v,
            };
            let page: DetailsPage = match serde_json::from_value(payload) {
                Ok(p) => p,
                Err(e) => {
                    counter!("fetch_page_errors_total").increment(1);
                    tracing::warn!(error = ?e, source = self.source.as_str(), "page parse failed");
                    break;
                }
            };
            if page.collection.is_empty() {
                break;
            }

            let fetched = page.collection.len();
            for preprint in page.collection {
                let title = preprint.title.clone().unwrap_or_default();
                let abstract_text = preprint.abstract_text.clone().unwrap_or_default();
                if !Self::matches_term(term, &title, &abstract_text) {
                    continue;
                }
                let raw = self.raw_from_preprint(preprint);
                if !raw.doi.is_empty() && !seen.insert(raw.doi.clone()) {
                    continue;
                }
                out.push(RawRecord::Paper(raw));
                if out.len() >= limit {
                    break;
                }
            }

            cursor += fetched;
            if fetched < API_PAGE_SIZE {
                break;
            }
            tokio::time::sleep(Duration::from_millis(self.cfg.page_delay_ms)).await;
        }

        Ok(out)
    }
}
