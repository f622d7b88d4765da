//! engine.rs — ties the pieces together: validates a search request,
//! creates its task, and drives the fetch/normalize pipeline in a detached
//! background execution that reports progress into the task table. The
//! engine never surfaces errors to the caller beyond a failed task.

use std::fmt;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::fetch::enrich::{OaLookup, UnpaywallClient};
use crate::fetch::providers::build_adapters;
use crate::fetch::types::{CancelFlag, ProgressSink, SourceAdapter};
use crate::record::SearchResult;
use crate::registry::SourceId;
use crate::tasks::{TaskManager, TaskStatus};

/// Validation failures for `start_search`; the only errors the inbound
/// surface ever sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequestError {
    InvalidMaxResults { got: usize, cap: usize },
    NoSourcesSelected,
    UnknownSource(String),
}

impl fmt::Display for SearchRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchRequestError::InvalidMaxResults { got, cap } => {
                write!(f, "max_results must be between 1 and {cap}, got {got}")
            }
            SearchRequestError::NoSourcesSelected => write!(f, "at least one source is required"),
            SearchRequestError::UnknownSource(s) => write!(f, "unknown source id '{s}'"),
        }
    }
}

impl std::error::Error for SearchRequestError {}

/// Reports orchestrator progress into one task's row.
struct TaskProgress {
    tasks: Arc<TaskManager>,
    task_id: String,
}

impl ProgressSink for TaskProgress {
    fn report(&self, progress: f64, message: &str) {
        self.tasks.update_task(
            &self.task_id,
            Some(TaskStatus::Processing),
            Some(progress),
            Some(message),
        );
    }
}

/// Validate a search request and start its background execution. Returns
/// the new task id; the task converges to a terminal status on its own.
pub fn start_search(
    tasks: &Arc<TaskManager>,
    config: &AppConfig,
    query: &str,
    sources: &[String],
    max_results: usize,
) -> Result<String, SearchRequestError> {
    if max_results == 0 || max_results > config.max_results_cap {
        return Err(SearchRequestError::InvalidMaxResults {
            got: max_results,
            cap: config.max_results_cap,
        });
    }
    if sources.is_empty() {
        return Err(SearchRequestError::NoSourcesSelected);
    }
    let mut parsed: Vec<SourceId> = Vec::with_capacity(sources.len());
    for s in sources {
        let id = s
            .parse()
            .map_err(|_| SearchRequestError::UnknownSource(s.clone()))?;
        if !parsed.contains(&id) {
            parsed.push(id);
        }
    }

    let task_id = tasks.create_task(query);
    let fetch_cfg = config.fetch_config();
    let adapters = build_adapters(&parsed, &fetch_cfg);

    let enricher: Option<Box<dyn OaLookup>> =
        if fetch_cfg.enrich_open_access && parsed.iter().any(|s| s.wants_oa_enrichment()) {
            Some(Box::new(UnpaywallClient::new(&fetch_cfg)))
        } else {
            None
        };

    // The search term interpretation lives outside this core; the query
    // string is consumed opaquely.
    let term = query.trim().to_string();

    tokio::spawn(run_search(
        tasks.clone(),
        task_id.clone(),
        term,
        adapters,
        enricher,
        max_results,
        CancelFlag::new(),
    ));

    tracing::info!(task_id = %task_id, sources = parsed.len(), "search task started");
    Ok(task_id)
}

/// Drive one search to a terminal status. Public with injectable adapters
/// and enricher so tests can run the whole lifecycle without network.
pub async fn run_search(
    tasks: Arc<TaskManager>,
    task_id: String,
    term: String,
    adapters: Vec<Box<dyn SourceAdapter>>,
    enricher: Option<Box<dyn OaLookup>>,
    total_budget: usize,
    cancel: CancelFlag,
) {
    tasks.update_task(
        &task_id,
        Some(TaskStatus::Processing),
        Some(0.05),
        Some("search term resolved"),
    );

    let sink = TaskProgress {
        tasks: tasks.clone(),
        task_id: task_id.clone(),
    };
    let results = crate::fetch::fetch_all(
        adapters,
        &term,
        total_budget,
        enricher.as_deref(),
        &cancel,
        &sink,
    )
    .await;

    if cancel.is_cancelled() {
        tasks.fail_task(&task_id, "search cancelled");
        return;
    }

    // Only a run where every source errored is a task-level failure;
    // partial outcomes complete with per-source error markers attached.
    let all_failed = !results.is_empty() && results.values().all(|r| r.error.is_some());
    if all_failed {
        let detail = results
            .values()
            .filter_map(|r| r.error.as_deref())
            .next()
            .unwrap_or("unknown error");
        tasks.fail_task(
            &task_id,
            &format!("no source produced a usable result ({detail})"),
        );
        return;
    }

    let result = SearchResult::from_sources(results);
    tracing::info!(
        task_id = %task_id,
        total = result.total_records,
        "search task complete"
    );
    tasks.complete_task(&task_id, result);
}
