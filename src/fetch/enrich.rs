//! Best-effort open-access enrichment via Unpaywall. A secondary lookup by
//! DOI that fills `is_open_access`/`oa_status`/`pdf_url` on literature
//! records; per-DOI errors are absorbed and never fail the fetch.

use metrics::counter;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::record::{RecordDetail, SourceResult};
use crate::registry::SourceId;
use crate::{fetch, normalize};

use super::FetchConfig;

#[derive(Debug, Clone, Default)]
pub struct OaInfo {
    pub is_oa: bool,
    pub oa_status: String,
    pub pdf_url: Option<String>,
}

/// Seam for the open-access lookup so orchestrator tests can run without
/// network.
#[async_trait::async_trait]
pub trait OaLookup: Send + Sync {
    /// Map of DOI -> open-access info for every DOI the service resolved.
    /// Unresolved DOIs are simply absent.
    async fn lookup(&self, dois: &[String]) -> HashMap<String, OaInfo>;
}

const UNPAYWALL_BASE: &str = "https://api.unpaywall.org/v2";
// Unpaywall allows 100 req/s; stay comfortably below it.
const LOOKUP_DELAY: Duration = Duration::from_millis(20);

pub struct UnpaywallClient {
    client: reqwest::Client,
    cfg: FetchConfig,
    base_url: String,
}

impl UnpaywallClient {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self {
            client: fetch::build_client(cfg.timeout_secs),
            cfg: cfg.clone(),
            base_url: UNPAYWALL_BASE.to_string(),
        }
    }

    fn info_from_response(v: &serde_json::Value) -> OaInfo {
        let best = v.get("best_oa_location").filter(|loc| !loc.is_null());
        OaInfo {
            is_oa: v.get("is_oa").and_then(|x| x.as_bool()).unwrap_or(false),
            oa_status: v
                .get("oa_status")
                .and_then(|x| x.as_str())
                .unwrap_or_default()
                .to_string(),
            pdf_url: best
                .and_then(|loc| loc.get("url_for_pdf"))
                .and_then(|x| x.as_str())
                .map(str::to_string),
        }
    }
}

#[async_trait::async_trait]
impl OaLookup for UnpaywallClient {
    async fn lookup(&self, dois: &[String]) -> HashMap<String, OaInfo> {
        let mut out = HashMap::new();
        for doi in dois {
            let clean = doi.replace("https://doi.org/", "");
            let clean = clean.trim();
            if clean.is_empty() {
                continue;
            }
            let url = format!("{}/{}", self.base_url, clean);
            let query = [("email", self.cfg.contact_email.clone())];
            match fetch::get_json(&self.client, &url, &query, &self.cfg).await {
                Ok(v) => {
                    out.insert(doi.clone(), Self::info_from_response(&v));
                }
                Err(e) => {
                    tracing::debug!(doi = %doi, error = ?e, "unpaywall lookup failed");
                }
            }
            tokio::time::sleep(LOOKUP_DELAY).await;
        }
        out
    }
}

/// Apply looked-up info to a batch of records. The stored quality score is
/// recomputed for touched records so it stays a pure function of the
/// record's fields.
pub fn apply_oa_info(
    records: &mut [crate::record::CanonicalRecord],
    info: &HashMap<String, OaInfo>,
) -> usize {
    let mut touched = 0;
    for rec in records.iter_mut() {
        let RecordDetail::Literature(lit) = &mut rec.detail else {
            continue;
        };
        let Some(oa) = info.get(&lit.doi) else {
            continue;
        };
        lit.is_open_access = oa.is_oa;
        if !oa.oa_status.is_empty() {
            lit.oa_status = oa.oa_status.clone();
        }
        if lit.pdf_url.is_none() {
            lit.pdf_url = oa.pdf_url.clone();
        }
        rec.quality_score = normalize::quality::score(rec);
        touched += 1;
    }
    touched
}

/// Enrich every literature source that takes part in the pass. Best-effort:
/// lookup misses and errors leave records exactly as normalized.
pub async fn enrich_source_results(
    results: &mut BTreeMap<SourceId, SourceResult>,
    lookup: &dyn OaLookup,
) {
    let dois: Vec<String> = results
        .values()
        .filter(|r| r.source.wants_oa_enrichment())
        .flat_map(|r| r.records.iter())
        .filter_map(|rec| rec.literature().map(|l| l.doi.clone()))
        .filter(|doi| !doi.is_empty())
        .collect();

    if dois.is_empty() {
        return;
    }

    let info = lookup.lookup(&dois).await;
    if info.is_empty() {
        return;
    }

    let mut touched = 0;
    for result in results.values_mut() {
        if result.source.wants_oa_enrichment() {
            touched += apply_oa_info(&mut result.records, &info);
        }
    }
    counter!("oa_enriched_total").increment(touched as u64);
}
