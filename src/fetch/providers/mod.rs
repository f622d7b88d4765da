// src/fetch/providers/mod.rs
pub mod biorxiv;
pub mod clinicaltrials;
pub mod europe_pmc;
pub mod openalex;
pub mod pubmed;
pub mod semantic_scholar;

use crate::registry::SourceId;

use super::types::SourceAdapter;
use super::FetchConfig;

/// Build one adapter per requested source. The registry guarantees every
/// id maps to exactly one adapter.
pub fn build_adapters(sources: &[SourceId], cfg: &FetchConfig) -> Vec<Box<dyn SourceAdapter>> {
    sources
        .iter()
        .map(|id| -> Box<dyn SourceAdapter> {
            match id {
                SourceId::ClinicalTrials => {
                    Box::new(clinicaltrials::ClinicalTrialsAdapter::new(cfg))
                }
                SourceId::Pubmed => Box::new(pubmed::PubmedAdapter::new(cfg)),
                SourceId::SemanticScholar => {
                    Box::new(semantic_scholar::SemanticScholarAdapter::new(cfg))
                }
                SourceId::Biorxiv => Box::new(biorxiv::BiorxivAdapter::new(SourceId::Biorxiv, cfg)),
                SourceId::Medrxiv => Box::new(biorxiv::BiorxivAdapter::new(SourceId::Medrxiv, cfg)),
                SourceId::Openalex => Box::new(openalex::OpenalexAdapter::new(cfg)),
                SourceId::EuropePmc => Box::new(europe_pmc::EuropePmcAdapter::new(cfg)),
            }
        })
        .collect()
}

/// First five author names comma-joined, with "et al." appended beyond
/// that — the display convention every literature provider here follows.
pub(crate) fn join_authors<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let all: Vec<String> = names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    let mut joined = all.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
    if all.len() > 5 {
        joined.push_str(" et al.");
    }
    joined
}
