//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `SHEETSYNC_SOURCE_API_KEY`: ERP bearer key
//! - `SHEETSYNC_TARGET_ACCESS_TOKEN`: sheet API token
//!
//! Optional:
//! - `SHEETSYNC_SOURCE_BASE_URL`, `SHEETSYNC_TARGET_BASE_URL`
//! - `SHEETSYNC_WAREHOUSE_ID`
//! - `SHEETSYNC_PAGE_SIZE`, `SHEETSYNC_BATCH_SIZE`
//! - `SHEETSYNC_MAX_RETRIES`, `SHEETSYNC_INITIAL_BACKOFF`, `SHEETSYNC_TIMEOUT_SECS`
//!   (applied to both endpoints)
//! - `SHEETSYNC_MAX_RECORDS`, `SHEETSYNC_LOOKBACK_DAYS`, `SHEETSYNC_TIMEZONE`
//! - `SHEETSYNC_INTERVAL_MINUTES`, `SHEETSYNC_INCREMENTAL_THRESHOLD`
//! - `SHEETSYNC_FORCE_FULL_LOAD` (true/false)
//! - `SHEETSYNC_TARGET_<CATALOG>`: sheet id per catalog, e.g.
//!   `SHEETSYNC_TARGET_INVOICES=1234567890`
//! - `SHEETSYNC_TARGET_WORKSPACE_ID`: workspace where catalogs without a
//!   sheet id are looked up by name, or created
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./sheetsync.toml` or `./sheetsync.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use sheetsync_core::catalogs;
use sheetsync_domain::{Config, Result, SheetSyncError};

const FILE_NAMES: [&str; 4] = ["sheetsync.toml", "sheetsync.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `SheetSyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SheetSyncError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.source.api_key = env_var("SHEETSYNC_SOURCE_API_KEY")?;
    config.target.access_token = env_var("SHEETSYNC_TARGET_ACCESS_TOKEN")?;

    if let Some(url) = env_opt("SHEETSYNC_SOURCE_BASE_URL") {
        config.source.base_url = url;
    }
    if let Some(url) = env_opt("SHEETSYNC_TARGET_BASE_URL") {
        config.target.base_url = url;
    }
    config.source.warehouse_id = env_opt("SHEETSYNC_WAREHOUSE_ID");

    if let Some(size) = env_parse("SHEETSYNC_PAGE_SIZE")? {
        config.source.page_size = size;
    }
    if let Some(size) = env_parse("SHEETSYNC_BATCH_SIZE")? {
        config.target.batch_size = size;
    }
    if let Some(retries) = env_parse("SHEETSYNC_MAX_RETRIES")? {
        config.source.retry.max_retries = retries;
        config.target.retry.max_retries = retries;
    }
    if let Some(backoff) = env_parse("SHEETSYNC_INITIAL_BACKOFF")? {
        config.source.retry.initial_backoff_secs = backoff;
        config.target.retry.initial_backoff_secs = backoff;
    }
    if let Some(timeout) = env_parse("SHEETSYNC_TIMEOUT_SECS")? {
        config.source.retry.timeout_secs = timeout;
        config.target.retry.timeout_secs = timeout;
    }

    config.sync.max_records = env_parse("SHEETSYNC_MAX_RECORDS")?;
    if let Some(days) = env_parse("SHEETSYNC_LOOKBACK_DAYS")? {
        config.sync.lookback_days = days;
    }
    if let Some(zone) = env_opt("SHEETSYNC_TIMEZONE") {
        config.sync.timezone = zone;
    }
    if let Some(minutes) = env_parse("SHEETSYNC_INTERVAL_MINUTES")? {
        config.sync.interval_minutes = minutes;
    }
    if let Some(threshold) = env_parse("SHEETSYNC_INCREMENTAL_THRESHOLD")? {
        config.sync.incremental_threshold = threshold;
    }
    config.sync.force_full_load = env_bool("SHEETSYNC_FORCE_FULL_LOAD", false);
    config.target.workspace_id = env_parse("SHEETSYNC_TARGET_WORKSPACE_ID")?;

    for name in catalogs::names() {
        let key = format!("SHEETSYNC_TARGET_{}", name.to_ascii_uppercase());
        if let Some(sheet_id) = env_parse::<i64>(&key)? {
            config.targets.insert(name.to_string(), sheet_id);
        }
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SheetSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SheetSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SheetSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SheetSyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, format chosen by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SheetSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SheetSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SheetSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        SheetSyncError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| SheetSyncError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
