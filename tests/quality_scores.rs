// tests/quality_scores.rs
//
// The scoring contract: deterministic bit-for-bit, bounded to [0,100],
// monotone in field completeness, with per-source weight tables.

use biosearch_aggregator::fetch::types::{RawPaper, RawRecord, RawTrial};
use biosearch_aggregator::normalize::{normalize_source, quality};
use biosearch_aggregator::registry::SourceId;

fn full_trial() -> RawTrial {
    RawTrial {
        nct_id: "NCT04123456".into(),
        title: "Immunogenicity study".into(),
        status: "Recruiting".into(),
        phase: "Phase 3".into(),
        sponsor: "Acme Biotech".into(),
        summary: "A randomized trial.".into(),
        enrollment: Some(500),
        min_age: "18 Years".into(),
        max_age: "65 Years".into(),
        start_date: "2020-03-01".into(),
        completion_date: "2022-06-30".into(),
        ..Default::default()
    }
}

#[test]
fn complete_trial_scores_full_marks() {
    let out = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(full_trial())]);
    assert_eq!(out[0].quality_score, 100.0);
}

#[test]
fn score_recomputation_is_bit_for_bit_identical() {
    let out = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(full_trial())]);
    let rec = &out[0];
    for _ in 0..100 {
        assert_eq!(quality::score(rec).to_bits(), rec.quality_score.to_bits());
    }
}

#[test]
fn trial_score_is_monotone_in_completeness() {
    let mut raw = full_trial();
    raw.sponsor.clear();
    raw.completion_date.clear();
    let partial = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(raw)]);
    let full = normalize_source(SourceId::ClinicalTrials, vec![RawRecord::Trial(full_trial())]);
    assert!(partial[0].quality_score < full[0].quality_score);
    // sponsor (10) + completion date (10)
    assert_eq!(partial[0].quality_score, 80.0);
}

#[test]
fn pubmed_checklist_weights() {
    let raw = RawPaper {
        id: "123".into(),
        pmid: "123".into(),
        title: "T".into(),
        authors: "Doe J".into(),
        journal: "Vaccine".into(),
        publication_date: "2020-01-15".into(),
        doi: "10.1/x".into(),
        ..Default::default()
    };
    let out = normalize_source(SourceId::Pubmed, vec![RawRecord::Paper(raw)]);
    // 15 + 20 + 15 + 15 + 15 + 10
    assert_eq!(out[0].quality_score, 90.0);

    let minimal = RawPaper {
        id: "124".into(),
        pmid: "124".into(),
        ..Default::default()
    };
    let out = normalize_source(SourceId::Pubmed, vec![RawRecord::Paper(minimal)]);
    assert_eq!(out[0].quality_score, 15.0);
}

#[test]
fn semantic_scholar_citation_bonus_is_capped() {
    let base = RawPaper {
        id: "p1".into(),
        title: "T".into(),
        abstract_text: "A".into(),
        authors: "X".into(),
        doi: "10.1/y".into(),
        year: Some(2021),
        ..Default::default()
    };

    let few = RawPaper {
        citation_count: Some(40),
        ..base.clone()
    };
    let out = normalize_source(SourceId::SemanticScholar, vec![RawRecord::Paper(few)]);
    // 50 + 10 + 10 + 5 + 5 + 5 + 40/10
    assert_eq!(out[0].quality_score, 89.0);

    let many = RawPaper {
        citation_count: Some(10_000),
        ..base
    };
    let out = normalize_source(SourceId::SemanticScholar, vec![RawRecord::Paper(many)]);
    // bonus capped at 15
    assert_eq!(out[0].quality_score, 100.0);
}

#[test]
fn preprints_start_from_a_lower_base() {
    let raw = RawPaper {
        id: "10.1101/2021.05.01".into(),
        doi: "10.1101/2021.05.01".into(),
        title: "Preprint".into(),
        abstract_text: "A".into(),
        authors: "X".into(),
        pdf_url: Some("https://www.biorxiv.org/content/x.full.pdf".into()),
        ..Default::default()
    };
    let out = normalize_source(SourceId::Biorxiv, vec![RawRecord::Paper(raw.clone())]);
    // 40 + 15 + 15 + 10 + 10 + 10
    assert_eq!(out[0].quality_score, 100.0);

    let bare = RawPaper {
        pdf_url: None,
        abstract_text: String::new(),
        ..raw
    };
    let out = normalize_source(SourceId::Medrxiv, vec![RawRecord::Paper(bare)]);
    assert_eq!(out[0].quality_score, 75.0);
}

#[test]
fn europe_pmc_rewards_full_text_mining() {
    let raw = RawPaper {
        id: "555".into(),
        pmid: "555".into(),
        title: "T".into(),
        abstract_text: "A".into(),
        authors: "X".into(),
        is_open_access: true,
        has_full_text: true,
        citation_count: Some(200),
        ..Default::default()
    };
    let out = normalize_source(SourceId::EuropePmc, vec![RawRecord::Paper(raw)]);
    // 50 + 10 + 10 + 5 + 5 + 5 + 10 + min(5, 200/20)
    assert_eq!(out[0].quality_score, 100.0);
}

#[test]
fn every_score_stays_in_bounds() {
    let batches: Vec<(SourceId, Vec<RawRecord>)> = vec![
        (
            SourceId::ClinicalTrials,
            vec![
                RawRecord::Trial(RawTrial {
                    nct_id: "NCT1".into(),
                    ..Default::default()
                }),
                RawRecord::Trial(full_trial()),
            ],
        ),
        (
            SourceId::Openalex,
            vec![RawRecord::Paper(RawPaper {
                id: "W1".into(),
                title: "T".into(),
                abstract_text: "A".into(),
                authors: "X".into(),
                doi: "10.1/z".into(),
                is_open_access: true,
                citation_count: Some(1_000_000),
                ..Default::default()
            })],
        ),
    ];
    for (source, raw) in batches {
        for rec in normalize_source(source, raw) {
            assert!(
                (0.0..=100.0).contains(&rec.quality_score),
                "{}: {}",
                source,
                rec.quality_score
            );
        }
    }
}
