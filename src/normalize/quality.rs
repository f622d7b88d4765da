//! Per-source quality scoring: weighted completeness checklists over the
//! canonical fields. Deterministic, bounded to [0, 100], monotone in field
//! completeness. Weights differ per source category; the contract is
//! uniform.

use crate::record::{CanonicalRecord, LiteratureDetail, RecordDetail, TrialDetail};
use crate::registry::SourceId;

fn present(s: &str) -> bool {
    !s.is_empty() && s != "N/A"
}

/// Score a normalized record. Reads every input from the record's
/// normalized fields (never the stored score), so recomputation always
/// reproduces the same value.
pub fn score(record: &CanonicalRecord) -> f64 {
    let raw = match (&record.detail, record.source) {
        (RecordDetail::ClinicalTrial(t), _) => trial_score(record, t),
        (RecordDetail::Literature(l), SourceId::Pubmed) => pubmed_score(record, l),
        (RecordDetail::Literature(l), SourceId::SemanticScholar) => semantic_scholar_score(record, l),
        (RecordDetail::Literature(l), SourceId::Biorxiv | SourceId::Medrxiv) => {
            preprint_score(record, l)
        }
        (RecordDetail::Literature(l), SourceId::Openalex) => openalex_score(record, l),
        (RecordDetail::Literature(l), SourceId::EuropePmc) => europe_pmc_score(record, l),
        // A literature detail under the trial registry cannot be scored;
        // normalization drops such records before this point.
        (RecordDetail::Literature(_), SourceId::ClinicalTrials) => 0.0,
    };
    raw.clamp(0.0, 100.0)
}

/// Registry checklist: six key fields at 10 points, numeric validity at 20,
/// date validity at 20.
fn trial_score(record: &CanonicalRecord, t: &TrialDetail) -> f64 {
    let mut score = 0.0;

    for ok in [
        present(&record.external_id),
        present(&record.title),
        t.status.is_known(),
        t.phase.is_known(),
        present(&t.sponsor),
        present(&t.summary),
    ] {
        if ok {
            score += 10.0;
        }
    }

    if t.enrollment > 0 {
        score += 10.0;
    }
    if t.min_age_years.is_some() {
        score += 5.0;
    }
    if t.max_age_years.is_some() {
        score += 5.0;
    }

    if t.start_date.is_some() {
        score += 10.0;
    }
    if t.completion_date.is_some() {
        score += 10.0;
    }

    score
}

fn pubmed_score(record: &CanonicalRecord, l: &LiteratureDetail) -> f64 {
    let checklist = [
        (present(&l.pmid), 15.0),
        (present(&record.title), 20.0),
        (present(&l.authors), 15.0),
        (present(&l.journal), 15.0),
        (record.primary_date.is_some(), 15.0),
        (present(&l.doi), 10.0),
    ];
    checklist.iter().filter(|(ok, _)| *ok).map(|(_, w)| w).sum()
}

fn citation_bonus(count: u64, cap: f64, divisor: f64) -> f64 {
    if count > 0 {
        (count as f64 / divisor).min(cap)
    } else {
        0.0
    }
}

fn semantic_scholar_score(record: &CanonicalRecord, l: &LiteratureDetail) -> f64 {
    let mut score = 50.0;
    if present(&record.title) {
        score += 10.0;
    }
    if present(&l.abstract_text) {
        score += 10.0;
    }
    if present(&l.authors) {
        score += 5.0;
    }
    if present(&l.doi) {
        score += 5.0;
    }
    if l.year.is_some() {
        score += 5.0;
    }
    score + citation_bonus(l.citation_count, 15.0, 10.0)
}

/// Preprints start lower: not yet peer reviewed.
fn preprint_score(record: &CanonicalRecord, l: &LiteratureDetail) -> f64 {
    let mut score = 40.0;
    if present(&record.title) {
        score += 15.0;
    }
    if present(&l.abstract_text) {
        score += 15.0;
    }
    if present(&l.authors) {
        score += 10.0;
    }
    if present(&l.doi) {
        score += 10.0;
    }
    if l.pdf_url.is_some() {
        score += 10.0;
    }
    score
}

fn openalex_score(record: &CanonicalRecord, l: &LiteratureDetail) -> f64 {
    let mut score = 50.0;
    if present(&record.title) {
        score += 10.0;
    }
    if present(&l.abstract_text) {
        score += 10.0;
    }
    if present(&l.authors) {
        score += 5.0;
    }
    if present(&l.doi) {
        score += 5.0;
    }
    if l.is_open_access {
        score += 5.0;
    }
    score + citation_bonus(l.citation_count, 15.0, 10.0)
}

fn europe_pmc_score(record: &CanonicalRecord, l: &LiteratureDetail) -> f64 {
    let mut score = 50.0;
    if present(&record.title) {
        score += 10.0;
    }
    if present(&l.abstract_text) {
        score += 10.0;
    }
    if present(&l.authors) {
        score += 5.0;
    }
    if present(&l.pmid) {
        score += 5.0;
    }
    if l.is_open_access {
        score += 5.0;
    }
    if l.has_full_text {
        score += 10.0;
    }
    score + citation_bonus(l.citation_count, 5.0, 20.0)
}
