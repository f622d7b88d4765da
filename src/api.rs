use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::engine::{self, SearchRequestError};
use crate::registry::{self, SourceCategory};
use crate::tasks::{Task, TaskManager, TaskStatus};

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskManager>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            tasks: Arc::new(TaskManager::new(config.max_tasks, config.task_ttl_hours)),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/sources", get(list_sources))
        .route("/api/search", post(search))
        .route("/api/task/{task_id}", get(task_status))
        .route("/api/tasks", get(list_tasks))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct SearchReq {
    query: String,
    #[serde(default = "default_sources")]
    sources: Vec<String>,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_sources() -> Vec<String> {
    vec!["clinicaltrials".to_string(), "pubmed".to_string()]
}

fn default_max_results() -> usize {
    100
}

#[derive(Serialize)]
struct SearchResp {
    task_id: String,
    status: TaskStatus,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchReq>,
) -> Result<Json<SearchResp>, (StatusCode, Json<ErrorBody>)> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(error_body(StatusCode::BAD_REQUEST, "query must not be empty"));
    }

    let task_id = engine::start_search(
        &state.tasks,
        &state.config,
        query,
        &body.sources,
        body.max_results,
    )
    .map_err(|e: SearchRequestError| error_body(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(SearchResp {
        task_id,
        status: TaskStatus::Pending,
        message: "search task created; aggregation runs in the background".to_string(),
    }))
}

async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, (StatusCode, Json<ErrorBody>)> {
    state
        .tasks
        .get_task(&task_id)
        .map(Json)
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, "task not found"))
}

#[derive(Deserialize)]
struct ListTasksQuery {
    status: Option<String>,
    #[serde(default = "default_list_limit")]
    limit: usize,
}

fn default_list_limit() -> usize {
    100
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(q): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, Json<ErrorBody>)> {
    let status = match q.status.as_deref() {
        None => None,
        Some("pending") => Some(TaskStatus::Pending),
        Some("processing") => Some(TaskStatus::Processing),
        Some("completed") => Some(TaskStatus::Completed),
        Some("failed") => Some(TaskStatus::Failed),
        Some(other) => {
            return Err(error_body(
                StatusCode::BAD_REQUEST,
                format!("unknown status filter '{other}'"),
            ))
        }
    };
    Ok(Json(state.tasks.list_tasks(status, q.limit)))
}

#[derive(Serialize)]
struct SourcesResp {
    sources: Vec<&'static registry::SourceInfo>,
    categories: CategoriesResp,
}

#[derive(Serialize)]
struct CategoriesResp {
    clinical_trials: Vec<&'static registry::SourceInfo>,
    literature: Vec<&'static registry::SourceInfo>,
}

async fn list_sources() -> Json<SourcesResp> {
    Json(SourcesResp {
        sources: registry::all_sources().iter().collect(),
        categories: CategoriesResp {
            clinical_trials: registry::sources_by_category(SourceCategory::ClinicalTrials),
            literature: registry::sources_by_category(SourceCategory::Literature),
        },
    })
}
