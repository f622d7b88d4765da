//! OpenAlex adapter: one `/works` search page of up to 200 results with the
//! polite-pool `mailto` parameter. Abstracts arrive as an inverted index
//! and are reconstructed into text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::fetch::types::{RawPaper, RawRecord, SourceAdapter};
use crate::fetch::{build_client, get_json, FetchConfig};
use crate::registry::SourceId;

use super::join_authors;

const BASE_URL: &str = "https://api.openalex.org";
const MAX_PAGE: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorksPage {
    results: Vec<Work>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Work {
    id: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    abstract_inverted_index: Option<HashMap<String, Vec<u64>>>,
    authorships: Vec<Authorship>,
    publication_date: Option<String>,
    publication_year: Option<i32>,
    primary_location: Option<PrimaryLocation>,
    cited_by_count: Option<u64>,
    open_access: OpenAccess,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Authorship {
    author: AuthorRef,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorRef {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrimaryLocation {
    source: Option<LocationSource>,
    pdf_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationSource {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenAccess {
    is_oa: bool,
    oa_status: Option<String>,
    oa_url: Option<String>,
}

/// Rebuild abstract text from OpenAlex's inverted index (word -> list of
/// token positions).
pub fn abstract_from_inverted_index(index: &HashMap<String, Vec<u64>>) -> String {
    let mut positions: Vec<(u64, &str)> = index
        .iter()
        .flat_map(|(word, at)| at.iter().map(move |p| (*p, word.as_str())))
        .collect();
    positions.sort_by_key(|(p, _)| *p);
    positions
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct OpenalexAdapter {
    client: reqwest::Client,
    cfg: FetchConfig,
    base_url: String,
}

impl OpenalexAdapter {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self {
            client: build_client(cfg.timeout_secs),
            cfg: cfg.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    fn raw_from_work(work: Work) -> RawPaper {
        let abstract_text = work
            .abstract_inverted_index
            .as_ref()
            .map(abstract_from_inverted_index)
            .unwrap_or_default();
        let (journal, location_pdf) = match work.primary_location {
            Some(loc) => (
                loc.source.and_then(|s| s.display_name).unwrap_or_default(),
                loc.pdf_url,
            ),
            None => (String::new(), None),
        };

        RawPaper {
            url: work.id.clone().unwrap_or_default(),
            id: work.id.unwrap_or_default(),
            doi: work.doi.unwrap_or_default(),
            title: work.title.unwrap_or_default(),
            abstract_text,
            authors: join_authors(
                work.authorships
                    .iter()
                    .filter_map(|a| a.author.display_name.as_deref()),
            ),
            journal,
            year: work.publication_year,
            publication_date: work.publication_date.unwrap_or_default(),
            citation_count: work.cited_by_count,
            is_open_access: work.open_access.is_oa,
            oa_status: work.open_access.oa_status.unwrap_or_default(),
            pdf_url: location_pdf.or(work.open_access.oa_url),
            ..Default::default()
        }
    }

    /// Parse one works page payload. Public for fixture-driven tests.
    pub fn records_from_page(v: serde_json::Value) -> Result<Vec<RawPaper>> {
        let page: WorksPage = serde_json::from_value(v)?;
        Ok(page.results.into_iter().map(Self::raw_from_work).collect())
    }
}

#[async_trait]
impl SourceAdapter for OpenalexAdapter {
    fn source(&self) -> SourceId {
        SourceId::Openalex
    }

    async fn fetch(&self, term: &str, limit: usize) -> Result<Vec<RawRecord>> {
        let url = format!("{}/works", self.base_url);
        let params = [
            ("search", term.to_string()),
            ("per_page", MAX_PAGE.min(limit).to_string()),
            ("mailto", self.cfg.contact_email.clone()),
        ];
        let payload = get_json(&self.client, &url, &params, &self.cfg)
            .await
            .context("openalex works")?;
        let papers = Self::records_from_page(payload).context("openalex works payload")?;

        let mut out: Vec<RawRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for paper in papers {
            if !paper.id.is_empty() && !seen.insert(paper.id.clone()) {
                continue;
            }
            out.push(RawRecord::Paper(paper));
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }
}
