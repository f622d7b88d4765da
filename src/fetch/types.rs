//! Adapter contract and the explicit raw record shapes providers emit.
//! Raw shapes are per-category structs behind a tagged enum — no untyped
//! JSON maps cross the adapter boundary.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::registry::SourceId;

/// Raw clinical-trial record as assembled from a registry's wire format,
/// before normalization. String fields carry the provider's spelling.
#[derive(Debug, Clone)]
pub struct RawTrial {
    pub nct_id: String,
    pub title: String,
    pub official_title: String,
    pub status: String,
    pub phase: String,
    pub start_date: String,
    pub completion_date: String,
    pub enrollment: Option<u64>,
    pub study_type: String,
    pub sponsor: String,
    pub collaborators: Vec<String>,
    pub countries: Vec<String>,
    pub interventions: Vec<String>,
    pub num_locations: u64,
    pub min_age: String,
    pub max_age: String,
    pub sex: String,
    pub primary_outcomes: Vec<String>,
    pub summary: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

impl Default for RawTrial {
    fn default() -> Self {
        Self {
            nct_id: String::new(),
            title: String::new(),
            official_title: String::new(),
            status: String::new(),
            phase: String::new(),
            start_date: String::new(),
            completion_date: String::new(),
            enrollment: None,
            study_type: String::new(),
            sponsor: String::new(),
            collaborators: Vec::new(),
            countries: Vec::new(),
            interventions: Vec::new(),
            num_locations: 0,
            min_age: String::new(),
            max_age: String::new(),
            sex: String::new(),
            primary_outcomes: Vec::new(),
            summary: String::new(),
            url: String::new(),
            fetched_at: Utc::now(),
        }
    }
}

/// Raw literature/preprint record before normalization.
#[derive(Debug, Clone)]
pub struct RawPaper {
    /// Provider-native identifier (paper id, OpenAlex id, DOI for
    /// preprints). Falls back to `pmid`/`doi` for dedup when empty.
    pub id: String,
    pub doi: String,
    pub pmid: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: String,
    pub journal: String,
    pub year: Option<i32>,
    pub publication_date: String,
    pub citation_count: Option<u64>,
    pub influential_citation_count: Option<u64>,
    pub is_open_access: bool,
    pub has_full_text: bool,
    pub oa_status: String,
    pub pdf_url: Option<String>,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

impl Default for RawPaper {
    fn default() -> Self {
        Self {
            id: String::new(),
            doi: String::new(),
            pmid: String::new(),
            title: String::new(),
            abstract_text: String::new(),
            authors: String::new(),
            journal: String::new(),
            year: None,
            publication_date: String::new(),
            citation_count: None,
            influential_citation_count: None,
            is_open_access: false,
            has_full_text: false,
            oa_status: String::new(),
            pdf_url: None,
            url: String::new(),
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RawRecord {
    Trial(RawTrial),
    Paper(RawPaper),
}

impl RawRecord {
    /// The source's natural identifier, used for in-call deduplication.
    pub fn natural_id(&self) -> &str {
        match self {
            RawRecord::Trial(t) => &t.nct_id,
            RawRecord::Paper(p) => {
                if !p.id.is_empty() {
                    &p.id
                } else if !p.doi.is_empty() {
                    &p.doi
                } else {
                    &p.pmid
                }
            }
        }
    }
}

/// One external data provider. `fetch` handles the provider's own
/// pagination and pacing, dedups by natural id within the call, and absorbs
/// transient page failures; it returns `Err` only for systemic failure
/// (nothing could be fetched at all).
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;
    async fn fetch(&self, term: &str, limit: usize) -> Result<Vec<RawRecord>>;
}

/// Narrow progress interface owned by the caller of the orchestrator.
/// Implementations must tolerate concurrent invocation.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: f64, message: &str);
}

/// Sink that discards progress; handy for tests and fire-and-forget runs.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _progress: f64, _message: &str) {}
}

/// Cooperative cancellation checked at phase boundaries. Never interrupts
/// an in-flight network call.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
