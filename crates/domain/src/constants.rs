//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! application.

// Source API defaults
pub const DEFAULT_SOURCE_BASE_URL: &str = "https://api.bind.com.mx/api";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const SOURCE_SKIP_PARAM: &str = "$skip";
pub const SOURCE_TOP_PARAM: &str = "$top";
pub const SOURCE_FILTER_PARAM: &str = "$filter";
pub const SOURCE_ORDER_BY_PARAM: &str = "$orderby";

// Target API defaults
pub const DEFAULT_TARGET_BASE_URL: &str = "https://api.smartsheet.com/2.0";
/// Maximum rows accepted by one row-write call.
pub const MAX_ROWS_PER_REQUEST: usize = 100;
/// Longest text a target cell accepts.
pub const MAX_CELL_TEXT_LEN: usize = 4000;

// Retry policy defaults
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF_SECS: f64 = 1.0;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Characters of a non-JSON error body kept in error reports.
pub const ERROR_BODY_PREVIEW_LEN: usize = 500;

// Sync defaults
pub const DEFAULT_TIMEZONE: &str = "America/Mexico_City";
pub const SYNC_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const SOURCE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;
/// Sheets with fewer keyed rows than this get a full load.
pub const DEFAULT_INCREMENTAL_THRESHOLD: usize = 10;
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;

// Scheduler
pub const JOB_HISTORY_CAPACITY: usize = 100;
