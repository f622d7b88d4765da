//! Record normalization: map one source's raw records into the canonical
//! shape and score each result. Stateless and pure per item; malformed
//! records are dropped (the `raw_count` vs `records.len()` divergence is
//! the caller's signal), the rest of the batch proceeds.

pub mod quality;
pub mod text;

use chrono::Utc;
use metrics::counter;

use crate::fetch::types::{RawPaper, RawRecord, RawTrial};
use crate::record::{CanonicalRecord, LiteratureDetail, RecordDetail, TrialDetail};
use crate::registry::{SourceCategory, SourceId};

use text::{
    clean_text, extract_age_years, join_list, standardize_date, standardize_phase,
    standardize_status,
};

/// Normalize one source's raw batch, preserving input order. Records whose
/// category does not match the source, or that carry neither an identifier
/// nor a title, are unrecoverable and dropped.
pub fn normalize_source(source: SourceId, raw: Vec<RawRecord>) -> Vec<CanonicalRecord> {
    let mut out = Vec::with_capacity(raw.len());
    for item in raw {
        let normalized = match (source.category(), item) {
            (SourceCategory::ClinicalTrials, RawRecord::Trial(t)) => normalize_trial(source, t),
            (SourceCategory::Literature, RawRecord::Paper(p)) => normalize_paper(source, p),
            (_, mismatched) => {
                tracing::warn!(
                    source = source.as_str(),
                    id = mismatched.natural_id(),
                    "raw record category does not match source; dropping"
                );
                None
            }
        };
        match normalized {
            Some(rec) => out.push(rec),
            None => counter!("normalize_dropped_total").increment(1),
        }
    }
    out
}

fn normalize_trial(source: SourceId, t: RawTrial) -> Option<CanonicalRecord> {
    let external_id = clean_text(&t.nct_id);
    let mut title = clean_text(&t.title);
    if title.is_empty() {
        title = clean_text(&t.official_title);
    }
    if external_id.is_empty() && title.is_empty() {
        return None;
    }

    let start_date = standardize_date(&t.start_date);
    let detail = TrialDetail {
        status: standardize_status(&t.status),
        phase: standardize_phase(&t.phase),
        enrollment: t.enrollment.unwrap_or(0),
        min_age_years: extract_age_years(&t.min_age),
        max_age_years: extract_age_years(&t.max_age),
        sex: clean_text(&t.sex),
        study_type: clean_text(&t.study_type),
        sponsor: clean_text(&t.sponsor),
        collaborators: join_list(&t.collaborators),
        countries: join_list(&t.countries),
        interventions: join_list(&t.interventions),
        num_locations: t.num_locations,
        start_date,
        completion_date: standardize_date(&t.completion_date),
        primary_outcome: join_list(&t.primary_outcomes),
        summary: clean_text(&t.summary),
    };

    let mut rec = CanonicalRecord {
        source,
        external_id,
        title,
        primary_date: start_date,
        quality_score: 0.0,
        url: t.url,
        fetched_at: t.fetched_at,
        normalized_at: Utc::now(),
        detail: RecordDetail::ClinicalTrial(detail),
    };
    rec.quality_score = quality::score(&rec);
    Some(rec)
}

fn normalize_paper(source: SourceId, p: RawPaper) -> Option<CanonicalRecord> {
    let doi = clean_text(&p.doi);
    let pmid = clean_text(&p.pmid);
    let mut external_id = clean_text(&p.id);
    if external_id.is_empty() {
        external_id = if !doi.is_empty() { doi.clone() } else { pmid.clone() };
    }
    let title = clean_text(&p.title);
    if external_id.is_empty() && title.is_empty() {
        return None;
    }

    let primary_date = standardize_date(&p.publication_date);
    let detail = LiteratureDetail {
        authors: clean_text(&p.authors),
        journal: clean_text(&p.journal),
        abstract_text: clean_text(&p.abstract_text),
        year: p.year,
        citation_count: p.citation_count.unwrap_or(0),
        influential_citation_count: p.influential_citation_count.unwrap_or(0),
        doi,
        pmid,
        is_open_access: p.is_open_access,
        has_full_text: p.has_full_text,
        oa_status: clean_text(&p.oa_status),
        pdf_url: p.pdf_url.filter(|u| !u.trim().is_empty()),
    };

    let mut rec = CanonicalRecord {
        source,
        external_id,
        title,
        primary_date,
        quality_score: 0.0,
        url: p.url,
        fetched_at: p.fetched_at,
        normalized_at: Utc::now(),
        detail: RecordDetail::Literature(detail),
    };
    rec.quality_score = quality::score(&rec);
    Some(rec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{TrialPhase, TrialStatus};

    #[test]
    fn trial_batch_normalizes_in_order() {
        let raw = vec![
            RawRecord::Trial(RawTrial {
                nct_id: "NCT001".into(),
                title: "  First\n trial ".into(),
                status: "Active, not recruiting".into(),
                phase: "Phase 2".into(),
                start_date: "January 2020".into(),
                min_age: "6 Months".into(),
                ..Default::default()
            }),
            RawRecord::Trial(RawTrial {
                nct_id: "NCT002".into(),
                title: "Second".into(),
                ..Default::default()
            }),
        ];
        let out = normalize_source(SourceId::ClinicalTrials, raw);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "First trial");
        let t = out[0].trial().unwrap();
        assert_eq!(t.status, TrialStatus::Active);
        assert_eq!(t.phase, TrialPhase::Phase2);
        assert_eq!(t.min_age_years, Some(0.5));
        assert_eq!(out[0].primary_date.unwrap().to_string(), "2020-01-01");
        assert_eq!(out[1].external_id, "NCT002");
    }

    #[test]
    fn unrecoverable_records_are_dropped_not_fatal() {
        let raw = vec![
            // Neither id nor title.
            RawRecord::Paper(RawPaper::default()),
            // Wrong category for the source.
            RawRecord::Trial(RawTrial {
                nct_id: "NCT003".into(),
                ..Default::default()
            }),
            RawRecord::Paper(RawPaper {
                pmid: "42".into(),
                title: "Kept".into(),
                ..Default::default()
            }),
        ];
        let out = normalize_source(SourceId::Pubmed, raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].external_id, "42");
    }

    #[test]
    fn paper_external_id_prefers_doi_over_pmid() {
        let raw = vec![RawRecord::Paper(RawPaper {
            doi: "10.1101/2020.01.01".into(),
            pmid: "77".into(),
            title: "Preprint".into(),
            ..Default::default()
        })];
        let out = normalize_source(SourceId::Biorxiv, raw);
        assert_eq!(out[0].external_id, "10.1101/2020.01.01");
    }
}
