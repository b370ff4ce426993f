//! Tracing setup and structured report logging for the binary.

use sheetsync_domain::SyncReport;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Filter directive variable (`RUST_LOG` syntax).
pub const LOG_FILTER_ENV: &str = "SHEETSYNC_LOG";
/// Any truthy value switches output to JSON lines.
pub const LOG_JSON_ENV: &str = "SHEETSYNC_LOG_JSON";

/// Installs the global subscriber. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_JSON_ENV)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = if json { builder.json().try_init() } else { builder.try_init() };
    if result.is_err() {
        warn!("tracing subscriber already installed");
    }
}

/// Logs one finished run with the full report attached as JSON.
pub fn log_report(report: &SyncReport) {
    let payload = serde_json::to_string(report).unwrap_or_else(|err| {
        format!("{{\"serialization_error\":\"{err}\"}}")
    });

    if report.is_success() {
        info!(
            catalog = %report.catalog,
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            warnings = report.warnings.len(),
            report = %payload,
            "sync_report"
        );
    } else {
        error!(
            catalog = %report.catalog,
            errors = report.errors.len(),
            report = %payload,
            "sync_report"
        );
    }
}
