//! `sheetsync check`

use tracing::{info, warn};

use crate::utils::health::HealthStatus;
use crate::AppContext;

/// Probes both APIs and logs the outcome.
pub async fn run(context: &AppContext) -> HealthStatus {
    let status = context.health().await;
    for component in &status.components {
        if component.is_healthy {
            info!(component = %component.name, "healthy");
        } else {
            warn!(component = %component.name, message = ?component.message, "unhealthy");
        }
    }
    status
}
