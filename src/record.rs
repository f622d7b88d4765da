//! record.rs — the canonical shape every source's raw records are mapped
//! into, plus the per-source and per-search aggregate result types attached
//! to completed tasks. Everything here serializes to plain JSON (maps,
//! lists, scalars) so storage collaborators can persist results without
//! knowing these types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::registry::SourceId;

/// Standardized overall status of a clinical trial. Values the mapping table
/// does not know pass through upper-cased in `Other`; empty input is
/// `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialStatus {
    Recruiting,
    Active,
    NotRecruiting,
    Completed,
    Terminated,
    Withdrawn,
    Suspended,
    Enrolling,
    Unknown,
    Other(String),
}

impl TrialStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TrialStatus::Recruiting => "RECRUITING",
            TrialStatus::Active => "ACTIVE",
            TrialStatus::NotRecruiting => "NOT_RECRUITING",
            TrialStatus::Completed => "COMPLETED",
            TrialStatus::Terminated => "TERMINATED",
            TrialStatus::Withdrawn => "WITHDRAWN",
            TrialStatus::Suspended => "SUSPENDED",
            TrialStatus::Enrolling => "ENROLLING",
            TrialStatus::Unknown => "UNKNOWN",
            TrialStatus::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TrialStatus::Unknown)
    }
}

impl Serialize for TrialStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Standardized trial phase. Combined or unusual phase strings pass through
/// canonicalized in `Other` (e.g. "PHASE_1, PHASE_2").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialPhase {
    EarlyPhase1,
    Phase1,
    Phase2,
    Phase3,
    Phase4,
    Unknown,
    Other(String),
}

impl TrialPhase {
    pub fn as_str(&self) -> &str {
        match self {
            TrialPhase::EarlyPhase1 => "EARLY_PHASE_1",
            TrialPhase::Phase1 => "PHASE_1",
            TrialPhase::Phase2 => "PHASE_2",
            TrialPhase::Phase3 => "PHASE_3",
            TrialPhase::Phase4 => "PHASE_4",
            TrialPhase::Unknown => "UNKNOWN",
            TrialPhase::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TrialPhase::Unknown)
    }
}

impl Serialize for TrialPhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One normalized item from any source.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalRecord {
    pub source: SourceId,
    /// Source-native identifier (NCT number, PMID, DOI, ...). May be empty.
    pub external_id: String,
    pub title: String,
    /// Best available calendar date for the record (trial start date,
    /// publication date). Partial inputs are completed to the first day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_date: Option<NaiveDate>,
    /// Deterministic completeness/credibility score in [0, 100].
    pub quality_score: f64,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub normalized_at: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: RecordDetail,
}

/// Category-specific fields of a canonical record.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum RecordDetail {
    ClinicalTrial(TrialDetail),
    Literature(LiteratureDetail),
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialDetail {
    pub status: TrialStatus,
    pub phase: TrialPhase,
    pub enrollment: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age_years: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_years: Option<f64>,
    pub sex: String,
    pub study_type: String,
    pub sponsor: String,
    pub collaborators: String,
    pub countries: String,
    pub interventions: String,
    pub num_locations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    pub primary_outcome: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiteratureDetail {
    pub authors: String,
    pub journal: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub citation_count: u64,
    pub influential_citation_count: u64,
    pub doi: String,
    pub pmid: String,
    pub is_open_access: bool,
    pub has_full_text: bool,
    pub oa_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl CanonicalRecord {
    pub fn trial(&self) -> Option<&TrialDetail> {
        match &self.detail {
            RecordDetail::ClinicalTrial(t) => Some(t),
            RecordDetail::Literature(_) => None,
        }
    }

    pub fn literature(&self) -> Option<&LiteratureDetail> {
        match &self.detail {
            RecordDetail::Literature(l) => Some(l),
            RecordDetail::ClinicalTrial(_) => None,
        }
    }
}

/// Outcome of one source within one orchestrator run. Record order follows
/// fetch/page order; `raw_count` is the pre-normalization count, so
/// `records.len() < raw_count` signals dropped unrecoverable items.
#[derive(Debug, Clone, Serialize)]
pub struct SourceResult {
    pub source: SourceId,
    pub records: Vec<CanonicalRecord>,
    pub raw_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceResult {
    pub fn failed(source: SourceId, error: impl Into<String>) -> Self {
        Self {
            source,
            records: Vec::new(),
            raw_count: 0,
            error: Some(error.into()),
        }
    }
}

/// Aggregated result set attached to a completed task.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub total_records: usize,
    pub sources: BTreeMap<SourceId, SourceResult>,
}

impl SearchResult {
    pub fn from_sources(sources: BTreeMap<SourceId, SourceResult>) -> Self {
        let total_records = sources.values().map(|r| r.records.len()).sum();
        Self {
            total_records,
            sources,
        }
    }
}

// Keyed by the source id string so the payload stays a plain JSON map.
impl Serialize for SearchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("total_records", &self.total_records)?;
        let by_name: BTreeMap<&str, &SourceResult> = self
            .sources
            .iter()
            .map(|(id, res)| (id.as_str(), res))
            .collect();
        map.serialize_entry("sources", &by_name)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_serializes_with_category_tag() {
        let rec = CanonicalRecord {
            source: SourceId::Pubmed,
            external_id: "12345".into(),
            title: "A study".into(),
            primary_date: NaiveDate::from_ymd_opt(2020, 1, 15),
            quality_score: 80.0,
            url: "https://pubmed.ncbi.nlm.nih.gov/12345/".into(),
            fetched_at: Utc::now(),
            normalized_at: Utc::now(),
            detail: RecordDetail::Literature(LiteratureDetail {
                authors: "Doe J".into(),
                journal: "Vaccine".into(),
                abstract_text: String::new(),
                year: Some(2020),
                citation_count: 3,
                influential_citation_count: 0,
                doi: "10.1/abc".into(),
                pmid: "12345".into(),
                is_open_access: false,
                has_full_text: false,
                oa_status: String::new(),
                pdf_url: None,
            }),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["category"], "literature");
        assert_eq!(v["source"], "pubmed");
        assert_eq!(v["primary_date"], "2020-01-15");
        assert_eq!(v["abstract"], "");
    }

    #[test]
    fn open_enums_pass_unknown_values_through() {
        let st = TrialStatus::Other("PAUSED FOR REVIEW".into());
        assert_eq!(serde_json::to_value(&st).unwrap(), "PAUSED FOR REVIEW");
        let ph = TrialPhase::Other("PHASE_1, PHASE_2".into());
        assert_eq!(serde_json::to_value(&ph).unwrap(), "PHASE_1, PHASE_2");
    }

    #[test]
    fn search_result_keys_sources_by_wire_id() {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::EuropePmc,
            SourceResult {
                source: SourceId::EuropePmc,
                records: vec![],
                raw_count: 2,
                error: None,
            },
        );
        let v = serde_json::to_value(SearchResult::from_sources(sources)).unwrap();
        assert!(v["sources"].get("europe_pmc").is_some());
        assert_eq!(v["total_records"], 0);
    }
}
