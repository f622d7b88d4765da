//! Europe PMC adapter: one REST `search` page (`resultType=core`) of up to
//! 100 results. Flags arrive as "Y"/"N" strings, the year as a string.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;

use crate::fetch::types::{RawPaper, RawRecord, SourceAdapter};
use crate::fetch::{build_client, get_json, FetchConfig};
use crate::registry::SourceId;

use super::join_authors;

const BASE_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";
const MAX_PAGE: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchResponse {
    result_list: ResultList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResultList {
    result: Vec<Article>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Article {
    pmid: Option<String>,
    pmcid: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    abstract_text: Option<String>,
    author_list: AuthorList,
    journal_title: Option<String>,
    first_publication_date: Option<String>,
    pub_year: Option<String>,
    cited_by_count: Option<u64>,
    is_open_access: Option<String>,
    has_text_mined_terms: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorList {
    author: Vec<Author>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Author {
    first_name: Option<String>,
    last_name: Option<String>,
}

pub struct EuropePmcAdapter {
    client: reqwest::Client,
    cfg: FetchConfig,
    base_url: String,
}

impl EuropePmcAdapter {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self {
            client: build_client(cfg.timeout_secs),
            cfg: cfg.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    fn raw_from_article(article: Article) -> RawPaper {
        let pmid = article.pmid.unwrap_or_default();
        let authors = join_authors(article.author_list.author.iter().map(|a| {
            format!(
                "{} {}",
                a.first_name.as_deref().unwrap_or_default(),
                a.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string()
        }));

        RawPaper {
            url: if pmid.is_empty() {
                String::new()
            } else {
                format!("https://europepmc.org/article/MED/{pmid}")
            },
            id: if pmid.is_empty() {
                article.pmcid.unwrap_or_default()
            } else {
                pmid.clone()
            },
            pmid,
            doi: article.doi.unwrap_or_default(),
            title: article.title.unwrap_or_default(),
            abstract_text: article.abstract_text.unwrap_or_default(),
            authors,
            journal: article.journal_title.unwrap_or_default(),
            year: article.pub_year.and_then(|y| y.parse().ok()),
            publication_date: article.first_publication_date.unwrap_or_default(),
            citation_count: article.cited_by_count,
            is_open_access: article.is_open_access.as_deref() == Some("Y"),
            has_full_text: article.has_text_mined_terms.as_deref() == Some("Y"),
            ..Default::default()
        }
    }

    /// Parse one search payload. Public for fixture-driven tests.
    pub fn records_from_page(v: serde_json::Value) -> Result<Vec<RawPaper>> {
        let page: SearchResponse = serde_json::from_value(v)?;
        Ok(page
            .result_list
            .result
            .into_iter()
            .map(Self::raw_from_article)
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for EuropePmcAdapter {
    fn source(&self) -> SourceId {
        SourceId::EuropePmc
    }

    async fn fetch(&self, term: &str, limit: usize) -> Result<Vec<RawRecord>> {
        let url = format!("{}/search", self.base_url);
        let params = [
            ("query", term.to_string()),
            ("format", "json".to_string()),
            ("pageSize", MAX_PAGE.min(limit).to_string()),
            ("resultType", "core".to_string()),
        ];
        let payload = get_json(&self.client, &url, &params, &self.cfg)
            .await
            .context("europe pmc search")?;
        let articles = Self::records_from_page(payload).context("europe pmc payload")?;

        let mut out: Vec<RawRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for article in articles {
            if !article.id.is_empty() && !seen.insert(article.id.clone()) {
                continue;
            }
            out.push(RawRecord::Paper(article));
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }
}
