// tests/task_lifecycle.rs
//
// Lifecycle semantics of the task manager: forward-only state machine,
// last-write-wins completion, failure leaving progress in place.

use std::collections::BTreeMap;

use biosearch_aggregator::record::{SearchResult, SourceResult};
use biosearch_aggregator::registry::SourceId;
use biosearch_aggregator::tasks::{TaskManager, TaskStatus};

fn result_with_raw_count(n: usize) -> SearchResult {
    let mut sources = BTreeMap::new();
    sources.insert(
        SourceId::Pubmed,
        SourceResult {
            source: SourceId::Pubmed,
            records: vec![],
            raw_count: n,
            error: None,
        },
    );
    SearchResult::from_sources(sources)
}

#[test]
fn fresh_task_starts_pending_with_zero_progress() {
    let mgr = TaskManager::new(10, 24);
    let id = mgr.create_task("meningococcal B");
    let task = mgr.get_task(&id).expect("task exists");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.progress, 0.0);
    assert_eq!(task.query, "meningococcal B");
    assert!(task.result.is_none());
    assert!(task.error.is_none());
}

#[test]
fn ids_are_unique_across_creates() {
    let mgr = TaskManager::new(100, 24);
    let mut ids: Vec<String> = (0..50).map(|_| mgr.create_task("q")).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}

#[test]
fn complete_twice_is_last_write_wins() {
    let mgr = TaskManager::new(10, 24);
    let id = mgr.create_task("q");

    mgr.complete_task(&id, result_with_raw_count(1));
    mgr.complete_task(&id, result_with_raw_count(7));

    let task = mgr.get_task(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 1.0);
    let result = task.result.expect("result present iff completed");
    assert_eq!(result.sources[&SourceId::Pubmed].raw_count, 7);
}

#[test]
fn failed_task_exposes_error_and_keeps_progress() {
    let mgr = TaskManager::new(10, 24);
    let id = mgr.create_task("q");
    mgr.update_task(&id, Some(TaskStatus::Processing), Some(0.55), Some("fetching"));
    mgr.fail_task(&id, "every source errored");

    let task = mgr.get_task(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("every source errored"));
    assert!(task.result.is_none());
    assert_eq!(task.progress, 0.55);
}

#[test]
fn no_transition_back_out_of_terminal() {
    let mgr = TaskManager::new(10, 24);
    let id = mgr.create_task("q");
    mgr.complete_task(&id, result_with_raw_count(0));

    mgr.update_task(&id, Some(TaskStatus::Pending), Some(0.1), Some("ghost update"));
    let task = mgr.get_task(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 1.0);
    assert_eq!(task.message, "search complete");
}

#[test]
fn list_tasks_filters_and_orders_newest_first() {
    let mgr = TaskManager::new(10, 24);
    let a = mgr.create_task("a");
    let b = mgr.create_task("b");
    mgr.fail_task(&a, "x");

    let failed = mgr.list_tasks(Some(TaskStatus::Failed), 10);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, a);

    let all = mgr.list_tasks(None, 10);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, b, "newest first");

    assert!(mgr.delete_task(&b));
    assert!(!mgr.delete_task(&b));
}

#[test]
fn task_snapshot_serializes_to_plain_json() {
    let mgr = TaskManager::new(10, 24);
    let id = mgr.create_task("q");
    mgr.complete_task(&id, result_with_raw_count(2));

    let v = serde_json::to_value(mgr.get_task(&id).unwrap()).unwrap();
    assert_eq!(v["status"], "completed");
    assert_eq!(v["progress"], 1.0);
    assert_eq!(v["result"]["sources"]["pubmed"]["raw_count"], 2);
    // plain scalars/maps/lists only: round-trip through a generic Value
    assert!(v.is_object());
}
