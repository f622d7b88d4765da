// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::fetch::FetchConfig;

const ENV_PATH: &str = "AGGREGATOR_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/aggregator.toml";

/// Service configuration. Every knob has a default so an empty file (or no
/// file at all) boots a working service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Task table capacity; above it the oldest half of terminal tasks is
    /// evicted on create.
    pub max_tasks: usize,
    pub task_ttl_hours: i64,
    pub request_timeout_secs: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub page_delay_ms: u64,
    pub enrich_open_access: bool,
    /// Contact email for polite API pools (Unpaywall, OpenAlex).
    pub contact_email: String,
    pub bind_addr: String,
    /// Upper bound a caller may request per search.
    pub max_results_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_tasks: 1000,
            task_ttl_hours: 24,
            request_timeout_secs: 30,
            retry_count: 3,
            retry_delay_ms: 2000,
            page_delay_ms: 300,
            enrich_open_access: true,
            contact_email: "bioinfo@example.com".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            max_results_cap: 1000,
        }
    }
}

impl AppConfig {
    /// Load using env var + fallbacks:
    /// 1) $AGGREGATOR_CONFIG_PATH
    /// 2) config/aggregator.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            return Self::load_from(&pb)
                .with_context(|| format!("{ENV_PATH} -> {}", pb.display()));
        }
        let default = PathBuf::from(DEFAULT_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::with_env_overrides(Self::default()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self::with_env_overrides(cfg))
    }

    /// A couple of knobs are deployment-specific enough to warrant direct
    /// env overrides on top of any file.
    fn with_env_overrides(mut cfg: Self) -> Self {
        if let Ok(addr) = std::env::var("AGGREGATOR_BIND_ADDR") {
            if !addr.is_empty() {
                cfg.bind_addr = addr;
            }
        }
        if let Ok(email) = std::env::var("AGGREGATOR_CONTACT_EMAIL") {
            if !email.is_empty() {
                cfg.contact_email = email;
            }
        }
        cfg
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout_secs: self.request_timeout_secs,
            retry_count: self.retry_count,
            retry_delay_ms: self.retry_delay_ms,
            page_delay_ms: self.page_delay_ms,
            enrich_open_access: self.enrich_open_access,
            contact_email: self.contact_email.clone(),
        }
    }
}
