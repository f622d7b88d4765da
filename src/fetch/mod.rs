// src/fetch/mod.rs
pub mod enrich;
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::record::SourceResult;
use crate::registry::SourceId;
use enrich::OaLookup;
use types::{CancelFlag, ProgressSink, RawRecord, SourceAdapter};

/// Knobs shared by every adapter and the enrichment client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    /// Fixed small delay between consecutive page requests to one provider.
    pub page_delay_ms: u64,
    pub enrich_open_access: bool,
    /// Contact email Unpaywall and OpenAlex ask polite clients to send.
    pub contact_email: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_count: 3,
            retry_delay_ms: 2000,
            page_delay_ms: 300,
            enrich_open_access: true,
            contact_email: "bioinfo@example.com".to_string(),
        }
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_records_total", "Raw records fetched across providers.");
        describe_counter!(
            "fetch_source_errors_total",
            "Sources that failed systemically within one run."
        );
        describe_counter!(
            "fetch_page_errors_total",
            "Absorbed per-page provider fetch/parse errors."
        );
        describe_counter!(
            "normalize_dropped_total",
            "Raw records dropped as unrecoverable during normalization."
        );
        describe_counter!("oa_enriched_total", "Records enriched with open-access data.");
        describe_histogram!(
            "fetch_source_duration_ms",
            "Wall time of one source's fetch unit in milliseconds."
        );
    });
}

pub(crate) fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// GET a JSON document with bounded retries on transport errors and
/// retryable statuses (429/5xx). Returns the last error once attempts are
/// exhausted; per-page callers absorb it, first-page callers surface it.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
    cfg: &FetchConfig,
) -> anyhow::Result<serde_json::Value> {
    use anyhow::Context;

    let attempts = cfg.retry_count.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        let outcome = client.get(url).query(query).send().await;
        match outcome {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return resp.json().await.with_context(|| format!("decoding json from {url}"));
                }
                if !(status.as_u16() == 429 || status.is_server_error()) {
                    anyhow::bail!("{url} returned {status}");
                }
                last_err = Some(anyhow::anyhow!("{url} returned {status}"));
            }
            Err(e) => last_err = Some(anyhow::Error::new(e).context(format!("requesting {url}"))),
        }
        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(cfg.retry_delay_ms)).await;
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{url}: no attempts made")))
}

/// Fan out one fetch across the given adapters, splitting `total_budget`
/// evenly (integer division; the remainder is intentionally dropped). Each
/// unit's outcome is isolated: a failing source contributes an empty record
/// set with an error marker, never an error to the caller. Raw records are
/// normalized per source after all units settle, then optionally enriched
/// with open-access data. Progress goes through `progress`; `cancel` is
/// checked at phase boundaries only.
pub async fn fetch_all(
    adapters: Vec<Box<dyn SourceAdapter>>,
    term: &str,
    total_budget: usize,
    enricher: Option<&dyn OaLookup>,
    cancel: &CancelFlag,
    progress: &dyn ProgressSink,
) -> BTreeMap<SourceId, SourceResult> {
    ensure_metrics_described();

    if adapters.is_empty() {
        return BTreeMap::new();
    }
    let per_source = total_budget / adapters.len();
    let total = adapters.len();

    progress.report(0.2, &format!("fetching from {total} sources"));

    // Pre-mark every requested source so a panicked unit still leaves an
    // error entry behind.
    let mut raw: BTreeMap<SourceId, Result<Vec<RawRecord>, String>> = adapters
        .iter()
        .map(|a| (a.source(), Err("fetch did not complete".to_string())))
        .collect();

    let mut set = JoinSet::new();
    for adapter in adapters {
        let term = term.to_string();
        set.spawn(async move {
            let source = adapter.source();
            let started = std::time::Instant::now();
            let outcome = adapter.fetch(&term, per_source).await;
            histogram!("fetch_source_duration_ms")
                .record(started.elapsed().as_secs_f64() * 1_000.0);
            (source, outcome)
        });
    }

    let mut done = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((source, Ok(records))) => {
                done += 1;
                counter!("fetch_records_total").increment(records.len() as u64);
                progress.report(
                    0.2 + 0.35 * done as f64 / total as f64,
                    &format!("{source}: fetched {} raw records", records.len()),
                );
                raw.insert(source, Ok(records));
            }
            Ok((source, Err(e))) => {
                done += 1;
                counter!("fetch_source_errors_total").increment(1);
                tracing::warn!(source = source.as_str(), error = ?e, "source fetch failed");
                progress.report(
                    0.2 + 0.35 * done as f64 / total as f64,
                    &format!("{source}: fetch failed"),
                );
                raw.insert(source, Err(format!("{e:#}")));
            }
            Err(join_err) => {
                // The pre-marked entry keeps the error visible.
                tracing::warn!(error = ?join_err, "source fetch unit aborted");
            }
        }
        if cancel.is_cancelled() {
            set.abort_all();
            break;
        }
    }

    if cancel.is_cancelled() {
        tracing::info!("fetch cancelled before normalization");
        return raw
            .into_iter()
            .map(|(source, outcome)| {
                let result = match outcome {
                    Ok(records) => SourceResult {
                        source,
                        records: Vec::new(),
                        raw_count: records.len(),
                        error: Some("cancelled before normalization".to_string()),
                    },
                    Err(msg) => SourceResult::failed(source, msg),
                };
                (source, result)
            })
            .collect();
    }

    progress.report(0.7, "normalizing records");
    let mut results: BTreeMap<SourceId, SourceResult> = raw
        .into_iter()
        .map(|(source, outcome)| {
            let result = match outcome {
                Ok(records) => {
                    let raw_count = records.len();
                    SourceResult {
                        source,
                        records: crate::normalize::normalize_source(source, records),
                        raw_count,
                        error: None,
                    }
                }
                Err(msg) => SourceResult::failed(source, msg),
            };
            (source, result)
        })
        .collect();

    let normalized: usize = results.values().map(|r| r.records.len()).sum();
    progress.report(0.8, &format!("normalization done: {normalized} records"));

    if let Some(lookup) = enricher {
        progress.report(0.85, "looking up open access links");
        enrich::enrich_source_results(&mut results, lookup).await;
    }

    results
}
