//! PubMed adapter over NCBI E-utilities: `esearch.fcgi` for the PMID list,
//! then `esummary.fcgi` in batches of 50 ids. The summary payload keys
//! articles by PMID, so that part is navigated as dynamic JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::collections::HashSet;
use std::time::Duration;

use crate::fetch::types::{RawPaper, RawRecord, SourceAdapter};
use crate::fetch::{build_client, get_json, FetchConfig};
use crate::registry::SourceId;

use super::join_authors;

const BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const BATCH_SIZE: usize = 50;
const BATCH_DELAY: Duration = Duration::from_millis(500);

pub struct PubmedAdapter {
    client: reqwest::Client,
    cfg: FetchConfig,
    base_url: String,
}

impl PubmedAdapter {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self {
            client: build_client(cfg.timeout_secs),
            cfg: cfg.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Pure mapping of one esummary article object. Public for
    /// fixture-driven tests.
    pub fn paper_from_summary(pmid: &str, article: &serde_json::Value) -> RawPaper {
        let text = |key: &str| -> String {
            article
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let authors = article
            .get("authors")
            .and_then(|v| v.as_array())
            .map(|list| {
                join_authors(
                    list.iter()
                        .filter_map(|a| a.get("name").and_then(|n| n.as_str())),
                )
            })
            .unwrap_or_default();

        let journal = {
            let full = text("fulljournalname");
            if full.is_empty() {
                text("source")
            } else {
                full
            }
        };

        let doi = article
            .get("articleids")
            .and_then(|v| v.as_array())
            .and_then(|ids| {
                ids.iter().find_map(|id| {
                    (id.get("idtype").and_then(|t| t.as_str()) == Some("doi"))
                        .then(|| id.get("value").and_then(|v| v.as_str()))
                        .flatten()
                })
            })
            .unwrap_or_default()
            .to_string();

        RawPaper {
            id: pmid.to_string(),
            pmid: pmid.to_string(),
            title: text("title"),
            authors,
            journal,
            publication_date: text("pubdate"),
            doi,
            url: format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SourceAdapter for PubmedAdapter {
    fn source(&self) -> SourceId {
        SourceId::Pubmed
    }

    async fn fetch(&self, term: &str, limit: usize) -> Result<Vec<RawRecord>> {
        // The id search is the systemic gate: if it fails, the source is
        // unavailable for this run.
        let search_url = format!("{}/esearch.fcgi", self.base_url);
        let params = [
            ("db", "pubmed".to_string()),
            ("term", term.to_string()),
            ("retmax", limit.to_string()),
            ("retmode", "json".to_string()),
            ("sort", "relevance".to_string()),
        ];
        let search = get_json(&self.client, &search_url, &params, &self.cfg)
            .await
            .context("pubmed esearch")?;

        let ids: Vec<String> = search
            .pointer("/esearchresult/idlist")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut out: Vec<RawRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let summary_url = format!("{}/esummary.fcgi", self.base_url);

        for batch in ids.chunks(BATCH_SIZE) {
            if out.len() >= limit {
                break;
            }
            let params = [
                ("db", "pubmed".to_string()),
                ("id", batch.join(",")),
                ("retmode", "json".to_string()),
            ];
            let summary = match get_json(&self.client, &summary_url, &params, &self.cfg).await {
                Ok(v) => v,
                Err(e) => {
                    counter!("fetch_page_errors_total").increment(1);
                    tracing::warn!(error = ?e, "pubmed esummary batch failed");
                    continue;
                }
            };

            let result = summary.get("result").cloned().unwrap_or_default();
            for pmid in batch {
                if out.len() >= limit {
                    break;
                }
                let Some(article) = result.get(pmid.as_str()).filter(|v| v.is_object()) else {
                    continue;
                };
                if !seen.insert(pmid.clone()) {
                    continue;
                }
                out.push(RawRecord::Paper(Self::paper_from_summary(pmid, article)));
            }

            tokio::time::sleep(BATCH_DELAY).await;
        }

        Ok(out)
    }
}
