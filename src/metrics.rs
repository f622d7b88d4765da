use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register the task-lifecycle
    /// series (pipeline series register on first orchestrator run).
    pub fn init() -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!("task_created_total", "Search tasks created.");
        describe_counter!("task_completed_total", "Search tasks completed.");
        describe_counter!("task_failed_total", "Search tasks failed.");
        describe_counter!(
            "task_evicted_total",
            "Tasks removed by TTL expiry or capacity eviction."
        );
        describe_gauge!("task_table_size", "Tasks currently held in the table.");

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
