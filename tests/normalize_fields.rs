// tests/normalize_fields.rs
//
// Field-level normalization through the public per-source entry point:
// text cleanup, enum tables, age conversion, raw-count divergence.

use biosearch_aggregator::fetch::types::{RawPaper, RawRecord, RawTrial};
use biosearch_aggregator::normalize::normalize_source;
use biosearch_aggregator::record::{TrialPhase, TrialStatus};
use biosearch_aggregator::registry::SourceId;

fn trial(nct: &str) -> RawTrial {
    RawTrial {
        nct_id: nct.to_string(),
        title: "A trial".to_string(),
        ..Default::default()
    }
}

#[test]
fn text_fields_are_trimmed_and_collapsed() {
    let raw = RawTrial {
        summary: "  Multi-line\n\tsummary   with   gaps ".to_string(),
        sponsor: "Acme &amp; Partners".to_string(),
        countries: vec!["France".into(), String::new(), " Spain ".into()],
        interventions: vec!["Vaccine A".into(), "Placebo".into()],
        ..trial("NCT100")
    };
    let out = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(raw)]);
    let t = out[0].trial().unwrap();
    assert_eq!(t.summary, "Multi-line summary with gaps");
    assert_eq!(t.sponsor, "Acme & Partners");
    assert_eq!(t.countries, "France, Spain");
    assert_eq!(t.interventions, "Vaccine A, Placebo");
}

#[test]
fn status_table_maps_substrings_case_insensitively() {
    let cases = [
        ("Recruiting", TrialStatus::Recruiting),
        ("ACTIVE, NOT RECRUITING", TrialStatus::Active),
        ("Not yet recruiting", TrialStatus::NotRecruiting),
        ("Enrolling by invitation", TrialStatus::Enrolling),
        ("Unknown status", TrialStatus::Unknown),
        ("", TrialStatus::Unknown),
        ("Temporarily paused", TrialStatus::Other("TEMPORARILY PAUSED".into())),
    ];
    for (input, expected) in cases {
        let raw = RawTrial {
            status: input.to_string(),
            ..trial("NCT200")
        };
        let out = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(raw)]);
        assert_eq!(out[0].trial().unwrap().status, expected, "input {input:?}");
    }
}

#[test]
fn phase_and_ages_normalize() {
    let raw = RawTrial {
        phase: "PHASE2".to_string(),
        min_age: "6 Months".to_string(),
        max_age: "17 Years".to_string(),
        ..trial("NCT300")
    };
    let out = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(raw)]);
    let t = out[0].trial().unwrap();
    assert_eq!(t.phase, TrialPhase::Phase2);
    assert_eq!(t.min_age_years, Some(0.5));
    assert_eq!(t.max_age_years, Some(17.0));

    // Unparseable ages stay absent, never zero.
    let raw = RawTrial {
        min_age: "N/A".to_string(),
        ..trial("NCT301")
    };
    let out = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(raw)]);
    assert_eq!(out[0].trial().unwrap().min_age_years, None);
}

#[test]
fn raw_count_divergence_signals_dropped_records() {
    let batch = vec![
        RawRecord::Paper(RawPaper {
            pmid: "1".into(),
            title: "Kept".into(),
            ..Default::default()
        }),
        // Unrecoverable: no identifier, no title.
        RawRecord::Paper(RawPaper::default()),
        RawRecord::Paper(RawPaper {
            doi: "10.1/z".into(),
            ..Default::default()
        }),
    ];
    let raw_count = batch.len();
    let out = normalize_source(SourceId::Pubmed, batch);
    assert_eq!(raw_count, 3);
    assert_eq!(out.len(), 2, "one unrecoverable record dropped");
}

#[test]
fn literature_fields_map_into_canonical_shape() {
    let raw = RawPaper {
        id: "33123456".into(),
        pmid: "33123456".into(),
        doi: "10.1016/j.vaccine.2020.01.001".into(),
        title: "Immunogenicity of a &quot;novel&quot; vaccine".into(),
        authors: "Doe J, Roe A".into(),
        journal: "Vaccine".into(),
        publication_date: "2020 Jan 15".into(),
        citation_count: Some(12),
        ..Default::default()
    };
    let out = normalize_source(SourceId::Pubmed, vec![RawRecord::Paper(raw)]);
    let rec = &out[0];
    assert_eq!(rec.external_id, "33123456");
    assert_eq!(rec.title, "Immunogenicity of a \"novel\" vaccine");
    assert_eq!(rec.primary_date.unwrap().to_string(), "2020-01-15");
    let l = rec.literature().unwrap();
    assert_eq!(l.journal, "Vaccine");
    assert_eq!(l.citation_count, 12);
}
