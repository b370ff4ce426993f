//! Configuration structures
//!
//! Populated by the infrastructure loader (environment or file); the rest of
//! the workspace only reads them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INCREMENTAL_THRESHOLD, DEFAULT_INITIAL_BACKOFF_SECS, DEFAULT_INTERVAL_MINUTES,
    DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SOURCE_BASE_URL, DEFAULT_TARGET_BASE_URL, DEFAULT_TIMEZONE, MAX_ROWS_PER_REQUEST,
};

/// Retry and timeout knobs shared by both remote APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total physical attempts per logical request.
    pub max_retries: u32,
    pub initial_backoff_secs: f64,
    /// Per-call timeout, independent of the retry loop.
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_secs: DEFAULT_INITIAL_BACKOFF_SECS,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RetrySettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.initial_backoff_secs).unwrap_or(Duration::ZERO)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// ERP source connection.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: String,
    /// Restricts the inventory catalog to one warehouse.
    pub warehouse_id: Option<String>,
    pub page_size: usize,
    pub retry: RetrySettings,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
            api_key: String::new(),
            warehouse_id: None,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetrySettings::default(),
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("warehouse_id", &self.warehouse_id)
            .field("page_size", &self.page_size)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Sheet target connection.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    pub access_token: String,
    pub batch_size: usize,
    pub retry: RetrySettings,
    /// Workspace searched, then written to, for catalogs without a
    /// configured sheet id.
    pub workspace_id: Option<i64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TARGET_BASE_URL.to_string(),
            access_token: String::new(),
            batch_size: MAX_ROWS_PER_REQUEST,
            retry: RetrySettings::default(),
            workspace_id: None,
        }
    }
}

impl TargetConfig {
    /// Batch size clamped to what one row-write call accepts.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_ROWS_PER_REQUEST)
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &redact(&self.access_token))
            .field("batch_size", &self.batch_size)
            .field("retry", &self.retry)
            .field("workspace_id", &self.workspace_id)
            .finish()
    }
}

/// Run-level behaviour shared by every catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Global cap applied on top of per-catalog caps.
    pub max_records: Option<usize>,
    /// "Since" window used by incremental runs.
    pub lookback_days: i64,
    /// IANA zone used for sync timestamps and date filters.
    pub timezone: String,
    pub interval_minutes: u64,
    /// Sheets holding fewer keyed rows than this get a full load.
    pub incremental_threshold: usize,
    pub force_full_load: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_records: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            timezone: DEFAULT_TIMEZONE.to_string(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            incremental_threshold: DEFAULT_INCREMENTAL_THRESHOLD,
            force_full_load: false,
        }
    }
}

impl SyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub target: TargetConfig,
    pub sync: SyncSettings,
    /// Catalog name → target sheet id.
    pub targets: BTreeMap<String, i64>,
}

impl Config {
    /// Lists every missing or unusable setting; empty means usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.source.api_key.trim().is_empty() {
            problems.push("source api_key is not configured".to_string());
        }
        if self.target.access_token.trim().is_empty() {
            problems.push("target access_token is not configured".to_string());
        }
        if self.targets.is_empty() && self.target.workspace_id.is_none() {
            problems.push("no target sheets or workspace are configured".to_string());
        }
        if self.target.workspace_id.is_some_and(|id| id <= 0) {
            problems.push("target workspace id must be positive".to_string());
        }
        for (catalog, sheet_id) in &self.targets {
            if *sheet_id <= 0 {
                problems.push(format!("target sheet id for '{catalog}' must be positive"));
            }
        }
        if self.source.page_size == 0 {
            problems.push("source page_size must be greater than zero".to_string());
        }
        if self.sync.timezone.trim().is_empty() {
            problems.push("sync timezone is empty".to_string());
        }

        problems
    }

    /// Sheet configured for `catalog`, if any.
    pub fn sheet_for(&self, catalog: &str) -> Option<i64> {
        self.targets.get(catalog).copied()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}
