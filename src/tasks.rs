//! tasks.rs — in-memory lifecycle store for aggregation requests. The
//! manager exclusively owns the id→task table; callers only see cheap
//! snapshots. Housekeeping (TTL expiry, capacity eviction of terminal
//! tasks) runs on every create.

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::record::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// One aggregation request's tracked lifecycle. Serializes to plain JSON;
/// snapshots are plain clones.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub query: String,
    pub status: TaskStatus,
    /// In [0,1], monotonically non-decreasing while the task is live.
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Hook invoked (outside the table lock) when a task reaches a terminal
/// status, so persistence collaborators can archive it.
pub type TerminalHook = Box<dyn Fn(&str, &Task) + Send + Sync>;

pub struct TaskManager {
    tasks: Mutex<HashMap<String, Task>>,
    max_tasks: usize,
    ttl: Duration,
    on_terminal: Mutex<Option<TerminalHook>>,
}

impl TaskManager {
    pub fn new(max_tasks: usize, ttl_hours: i64) -> Self {
        Self::with_ttl(max_tasks, Duration::hours(ttl_hours))
    }

    pub fn with_ttl(max_tasks: usize, ttl: Duration) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            max_tasks,
            ttl,
            on_terminal: Mutex::new(None),
        }
    }

    pub fn set_on_terminal(&self, hook: TerminalHook) {
        *self.on_terminal.lock().expect("hook mutex poisoned") = Some(hook);
    }

    /// Allocate a fresh task in `pending`. Runs housekeeping first; never
    /// reuses an id still present in the table.
    pub fn create_task(&self, query: &str) -> String {
        let mut tasks = self.tasks.lock().expect("task table mutex poisoned");

        Self::evict_expired(&mut tasks, self.ttl);
        if tasks.len() >= self.max_tasks {
            Self::evict_oldest_terminal(&mut tasks);
        }

        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !tasks.contains_key(&candidate) {
                break candidate;
            }
        };

        let now = Utc::now();
        tasks.insert(
            id.clone(),
            Task {
                id: id.clone(),
                query: query.to_string(),
                status: TaskStatus::Pending,
                progress: 0.0,
                message: "task created".to_string(),
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
                completed_at: None,
            },
        );

        counter!("task_created_total").increment(1);
        gauge!("task_table_size").set(tasks.len() as f64);
        id
    }

    /// Partial update. Unknown ids are a no-op (tolerates races with
    /// eviction), as are updates to tasks already terminal. Progress is
    /// clamped to [0,1] and never moves backward.
    pub fn update_task(
        &self,
        task_id: &str,
        status: Option<TaskStatus>,
        progress: Option<f64>,
        message: Option<&str>,
    ) {
        let mut tasks = self.tasks.lock().expect("task table mutex poisoned");
        let Some(task) = tasks.get_mut(task_id) else {
            return;
        };
        if task.status.is_terminal() {
            return;
        }

        if let Some(s) = status {
            // Terminal transitions go through complete/fail only.
            if !s.is_terminal() {
                task.status = s;
            }
        }
        if let Some(p) = progress {
            task.progress = p.clamp(0.0, 1.0).max(task.progress);
        }
        if let Some(m) = message {
            task.message = m.to_string();
        }
        task.updated_at = Utc::now();
    }

    /// Mark completed with the attached result. Idempotent: a second call
    /// overwrites result and timestamps (last write wins).
    pub fn complete_task(&self, task_id: &str, result: SearchResult) {
        let snapshot = {
            let mut tasks = self.tasks.lock().expect("task table mutex poisoned");
            let Some(task) = tasks.get_mut(task_id) else {
                return;
            };
            let now = Utc::now();
            task.status = TaskStatus::Completed;
            task.progress = 1.0;
            task.message = "search complete".to_string();
            task.result = Some(result);
            task.error = None;
            task.completed_at = Some(now);
            task.updated_at = now;
            task.clone()
        };
        counter!("task_completed_total").increment(1);
        self.fire_terminal(task_id, &snapshot);
    }

    /// Mark failed. Progress is left at its last reported value.
    pub fn fail_task(&self, task_id: &str, error: &str) {
        let snapshot = {
            let mut tasks = self.tasks.lock().expect("task table mutex poisoned");
            let Some(task) = tasks.get_mut(task_id) else {
                return;
            };
            task.status = TaskStatus::Failed;
            task.message = "search failed".to_string();
            task.error = Some(error.to_string());
            task.result = None;
            task.updated_at = Utc::now();
            task.clone()
        };
        counter!("task_failed_total").increment(1);
        self.fire_terminal(task_id, &snapshot);
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        let tasks = self.tasks.lock().expect("task table mutex poisoned");
        tasks.get(task_id).cloned()
    }

    /// Recent tasks, newest first, optionally filtered by status.
    pub fn list_tasks(&self, status: Option<TaskStatus>, limit: usize) -> Vec<Task> {
        let tasks = self.tasks.lock().expect("task table mutex poisoned");
        let mut rows: Vec<Task> = tasks
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        rows
    }

    pub fn delete_task(&self, task_id: &str) -> bool {
        let mut tasks = self.tasks.lock().expect("task table mutex poisoned");
        tasks.remove(task_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().expect("task table mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(tasks: &mut HashMap<String, Task>, ttl: Duration) {
        let now = Utc::now();
        let before = tasks.len();
        tasks.retain(|_, t| now - t.created_at <= ttl);
        let evicted = before - tasks.len();
        if evicted > 0 {
            counter!("task_evicted_total").increment(evicted as u64);
        }
    }

    /// Capacity pressure: drop the oldest half of terminal tasks. Live
    /// (pending/processing) tasks are never evicted here.
    fn evict_oldest_terminal(tasks: &mut HashMap<String, Task>) {
        let mut terminal: Vec<(String, DateTime<Utc>)> = tasks
            .values()
            .filter(|t| t.status.is_terminal())
            .map(|t| (t.id.clone(), t.created_at))
            .collect();
        terminal.sort_by_key(|(_, created)| *created);

        let to_drop = terminal.len() / 2;
        for (id, _) in terminal.into_iter().take(to_drop) {
            tasks.remove(&id);
        }
        if to_drop > 0 {
            counter!("task_evicted_total").increment(to_drop as u64);
        }
    }

    fn fire_terminal(&self, task_id: &str, snapshot: &Task) {
        let hook = self.on_terminal.lock().expect("hook mutex poisoned");
        if let Some(hook) = hook.as_ref() {
            hook(task_id, snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SearchResult;
    use std::collections::BTreeMap;

    fn empty_result() -> SearchResult {
        SearchResult::from_sources(BTreeMap::new())
    }

    #[test]
    fn progress_is_clamped_and_monotone() {
        let mgr = TaskManager::new(10, 24);
        let id = mgr.create_task("q");
        mgr.update_task(&id, None, Some(0.6), None);
        mgr.update_task(&id, None, Some(0.3), None);
        assert_eq!(mgr.get_task(&id).unwrap().progress, 0.6);
        mgr.update_task(&id, None, Some(7.0), None);
        assert_eq!(mgr.get_task(&id).unwrap().progress, 1.0);
    }

    #[test]
    fn unknown_id_update_is_noop() {
        let mgr = TaskManager::new(10, 24);
        mgr.update_task("missing", Some(TaskStatus::Processing), Some(0.5), None);
        assert!(mgr.is_empty());
    }

    #[test]
    fn terminal_tasks_ignore_updates() {
        let mgr = TaskManager::new(10, 24);
        let id = mgr.create_task("q");
        mgr.update_task(&id, None, Some(0.4), None);
        mgr.fail_task(&id, "boom");
        mgr.update_task(&id, Some(TaskStatus::Processing), Some(0.9), Some("late"));
        let t = mgr.get_task(&id).unwrap();
        assert_eq!(t.status, TaskStatus::Failed);
        // fail leaves progress at the last reported value
        assert_eq!(t.progress, 0.4);
        assert_eq!(t.error.as_deref(), Some("boom"));
    }

    #[test]
    fn terminal_hook_fires_with_snapshot() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mgr = TaskManager::new(10, 24);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        mgr.set_on_terminal(Box::new(move |_, task| {
            assert!(task.status.is_terminal());
            seen2.fetch_add(1, Ordering::SeqCst);
        }));

        let a = mgr.create_task("a");
        let b = mgr.create_task("b");
        mgr.complete_task(&a, empty_result());
        mgr.fail_task(&b, "x");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn ttl_expiry_runs_on_create() {
        let mgr = TaskManager::with_ttl(10, Duration::zero());
        let old = mgr.create_task("old");
        // Next create expires everything older than the zero TTL.
        let fresh = mgr.create_task("fresh");
        assert!(mgr.get_task(&old).is_none());
        assert!(mgr.get_task(&fresh).is_some());
    }
}
