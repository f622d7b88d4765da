//! registry.rs — static table of the external data providers this service
//! can aggregate from. Validation and the `/api/sources` listing both read
//! this table; adding a provider means one adapter plus one entry here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one external data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceId {
    #[serde(rename = "clinicaltrials")]
    ClinicalTrials,
    #[serde(rename = "pubmed")]
    Pubmed,
    #[serde(rename = "semantic_scholar")]
    SemanticScholar,
    #[serde(rename = "biorxiv")]
    Biorxiv,
    #[serde(rename = "medrxiv")]
    Medrxiv,
    #[serde(rename = "openalex")]
    Openalex,
    #[serde(rename = "europe_pmc")]
    EuropePmc,
}

/// Broad category a source's records fall into. Drives which raw shape an
/// adapter emits and which quality checklist applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    ClinicalTrials,
    Literature,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub id: SourceId,
    pub name: &'static str,
    pub description: &'static str,
    pub url: &'static str,
    pub category: SourceCategory,
    /// Finer-grained label for UI consumers ("clinical_trials",
    /// "literature", "preprint").
    pub data_type: &'static str,
}

const SOURCES: &[SourceInfo] = &[
    SourceInfo {
        id: SourceId::ClinicalTrials,
        name: "ClinicalTrials.gov",
        description: "US NIH registry of interventional and observational clinical studies",
        url: "https://clinicaltrials.gov",
        category: SourceCategory::ClinicalTrials,
        data_type: "clinical_trials",
    },
    SourceInfo {
        id: SourceId::Pubmed,
        name: "PubMed",
        description: "US National Library of Medicine index of biomedical literature",
        url: "https://pubmed.ncbi.nlm.nih.gov",
        category: SourceCategory::Literature,
        data_type: "literature",
    },
    SourceInfo {
        id: SourceId::SemanticScholar,
        name: "Semantic Scholar",
        description: "AI-assisted academic search with citation and influence metrics",
        url: "https://www.semanticscholar.org",
        category: SourceCategory::Literature,
        data_type: "literature",
    },
    SourceInfo {
        id: SourceId::Biorxiv,
        name: "bioRxiv",
        description: "Preprint server for biology (not yet peer reviewed)",
        url: "https://www.biorxiv.org",
        category: SourceCategory::Literature,
        data_type: "preprint",
    },
    SourceInfo {
        id: SourceId::Medrxiv,
        name: "medRxiv",
        description: "Preprint server for the health sciences (not yet peer reviewed)",
        url: "https://www.medrxiv.org",
        category: SourceCategory::Literature,
        data_type: "preprint",
    },
    SourceInfo {
        id: SourceId::Openalex,
        name: "OpenAlex",
        description: "Fully open scholarly catalog with citation and institution data",
        url: "https://openalex.org",
        category: SourceCategory::Literature,
        data_type: "literature",
    },
    SourceInfo {
        id: SourceId::EuropePmc,
        name: "Europe PMC",
        description: "European biomedical literature database with full-text mining",
        url: "https://europepmc.org",
        category: SourceCategory::Literature,
        data_type: "literature",
    },
];

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::ClinicalTrials => "clinicaltrials",
            SourceId::Pubmed => "pubmed",
            SourceId::SemanticScholar => "semantic_scholar",
            SourceId::Biorxiv => "biorxiv",
            SourceId::Medrxiv => "medrxiv",
            SourceId::Openalex => "openalex",
            SourceId::EuropePmc => "europe_pmc",
        }
    }

    pub fn category(&self) -> SourceCategory {
        match self {
            SourceId::ClinicalTrials => SourceCategory::ClinicalTrials,
            _ => SourceCategory::Literature,
        }
    }

    /// Literature sources that get the best-effort Unpaywall enrichment
    /// pass. Preprint servers already ship their own PDF links.
    pub fn wants_oa_enrichment(&self) -> bool {
        matches!(
            self,
            SourceId::Pubmed | SourceId::SemanticScholar | SourceId::Openalex | SourceId::EuropePmc
        )
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_sources()
            .iter()
            .map(|info| info.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source id '{}'", self.0)
    }
}

impl std::error::Error for UnknownSource {}

/// The full registry, in declaration order.
pub fn all_sources() -> &'static [SourceInfo] {
    SOURCES
}

pub fn sources_by_category(category: SourceCategory) -> Vec<&'static SourceInfo> {
    SOURCES.iter().filter(|s| s.category == category).collect()
}

pub fn source_info(id: SourceId) -> &'static SourceInfo {
    SOURCES
        .iter()
        .find(|s| s.id == id)
        .expect("every SourceId has a registry entry")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_round_trips_through_from_str() {
        for info in all_sources() {
            let parsed: SourceId = info.id.as_str().parse().unwrap();
            assert_eq!(parsed, info.id);
        }
        assert!("elsevier".parse::<SourceId>().is_err());
    }

    #[test]
    fn category_split_matches_registry() {
        assert_eq!(sources_by_category(SourceCategory::ClinicalTrials).len(), 1);
        assert_eq!(sources_by_category(SourceCategory::Literature).len(), 6);
    }

    #[test]
    fn serde_uses_wire_ids() {
        let s = serde_json::to_string(&SourceId::EuropePmc).unwrap();
        assert_eq!(s, "\"europe_pmc\"");
        let back: SourceId = serde_json::from_str("\"clinicaltrials\"").unwrap();
        assert_eq!(back, SourceId::ClinicalTrials);
    }
}
