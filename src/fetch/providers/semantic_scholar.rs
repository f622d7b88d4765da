//! Semantic Scholar Graph API adapter: `/paper/search` with offset
//! pagination in steps of up to 100, explicit field list, citation metrics.

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::fetch::types::{RawPaper, RawRecord, SourceAdapter};
use crate::fetch::{build_client, get_json, FetchConfig};
use crate::registry::SourceId;

use super::join_authors;

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const PAGE_SIZE: usize = 100;
const PAGE_DELAY: Duration = Duration::from_millis(500);

const FIELDS: &str = "paperId,title,abstract,authors,year,citationCount,\
influentialCitationCount,venue,publicationDate,openAccessPdf,externalIds,journal";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchPage {
    data: Vec<Paper>,
    next: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Paper {
    paper_id: Option<String>,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    authors: Vec<Author>,
    year: Option<i32>,
    publication_date: Option<String>,
    venue: Option<String>,
    journal: Option<Journal>,
    citation_count: Option<u64>,
    influential_citation_count: Option<u64>,
    external_ids: Option<ExternalIds>,
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Journal {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "PubMed")]
    pubmed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenAccessPdf {
    url: Option<String>,
}

pub struct SemanticScholarAdapter {
    client: reqwest::Client,
    cfg: FetchConfig,
    base_url: String,
}

impl SemanticScholarAdapter {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self {
            client: build_client(cfg.timeout_secs),
            cfg: cfg.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    fn raw_from_paper(paper: Paper) -> RawPaper {
        let id = paper.paper_id.unwrap_or_default();
        let external_ids = paper.external_ids.unwrap_or_default();
        let journal = paper
            .journal
            .and_then(|j| j.name)
            .or(paper.venue)
            .unwrap_or_default();

        RawPaper {
            url: if id.is_empty() {
                String::new()
            } else {
                format!("https://www.semanticscholar.org/paper/{id}")
            },
            id,
            doi: external_ids.doi.unwrap_or_default(),
            pmid: external_ids.pubmed.unwrap_or_default(),
            title: paper.title.unwrap_or_default(),
            abstract_text: paper.abstract_text.unwrap_or_default(),
            authors: join_authors(paper.authors.iter().filter_map(|a| a.name.as_deref())),
            journal,
            year: paper.year,
            publication_date: paper.publication_date.unwrap_or_default(),
            citation_count: paper.citation_count,
            influential_citation_count: paper.influential_citation_count,
            pdf_url: paper.open_access_pdf.and_then(|p| p.url),
            ..Default::default()
        }
    }

    /// Parse one search page payload. Public for fixture-driven tests.
    pub fn records_from_page(v: serde_json::Value) -> Result<(Vec<RawPaper>, Option<u64>)> {
        let page: SearchPage = serde_json::from_value(v)?;
        let next = page.next;
        Ok((page.data.into_iter().map(Self::raw_from_paper).collect(), next))
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn source(&self) -> SourceId {
        SourceId::SemanticScholar
    }

    async fn fetch(&self, term: &str, limit: usize) -> Result<Vec<RawRecord>> {
        let mut out: Vec<RawRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let url = format!("{}/paper/search", self.base_url);
        let mut offset = 0u64;

        loop {
            if out.len() >= limit {
                break;
            }
            let mut params = vec![
                ("query", term.to_string()),
                ("limit", PAGE_SIZE.min(limit - out.len()).to_string()),
                ("fields", FIELDS.to_string()),
            ];
            if offset > 0 {
                params.push(("offset", offset.to_string()));
            }

            let payload = match get_json(&self.client, &url, &params, &self.cfg).await {
                Ok(v) => v,
                Err(e) if out.is_empty() => return Err(e.context("semantic scholar search")),
                Err(e) => {
                    counter!("fetch_page_errors_total").increment(1);
                    tracing::warn!(error = ?e, "semantic scholar page fetch failed");
                    break;
                }
            };
            let (papers, next) = match Self::records_from_page(payload) {
                Ok(parsed) => parsed,
                Err(e) => {
                    counter!("fetch_page_errors_total").increment(1);
                    tracing::warn!(error = ?e, "semantic scholar page parse failed");
                    break;
                }
            };
            if papers.is_empty() {
                break;
            }

            for paper in papers {
                let key = if paper.id.is_empty() {
                    paper.doi.clone()
                } else {
                    paper.id.clone()
                };
                if !key.is_empty() && !seen.insert(key) {
                    continue;
                }
                out.push(RawRecord::Paper(paper));
                if out.len() >= limit {
                    break;
                }
            }

            let Some(next) = next else { break };
            offset = next;
            tokio::time::sleep(PAGE_DELAY).await;
        }

        Ok(out)
    }
}
