//! Health check types for the remote APIs the application depends on

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Overall health status of the application
///
/// # Example
/// ```no_run
/// use sheetsync_app::utils::health::{ComponentHealth, HealthStatus};
///
/// let mut status = HealthStatus::new()
///     .add_component(ComponentHealth::healthy("source"))
///     .add_component(ComponentHealth::unhealthy("target", "401 unauthorized"));
/// status.calculate_score();
///
/// assert_eq!(status.score, 0.5);
/// assert!(!status.is_healthy);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// Healthy components over total, from 0.0 to 1.0
    pub score: f64,

    pub message: Option<String>,

    pub components: Vec<ComponentHealth>,

    /// Unix timestamp when health check was performed
    pub timestamp: i64,
}

impl HealthStatus {
    /// Healthy with score 1.0 and no components.
    pub fn new() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            message: None,
            components: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Every component must be healthy for the status to be healthy.
    pub fn calculate_score(&mut self) {
        if self.components.is_empty() {
            return;
        }

        let healthy_count = self.components.iter().filter(|c| c.is_healthy).count();

        self.score = healthy_count as f64 / self.components.len() as f64;
        self.is_healthy = healthy_count == self.components.len();
        self.message = (!self.is_healthy).then(|| {
            let failing: Vec<_> =
                self.components.iter().filter(|c| !c.is_healthy).map(|c| c.name.as_str()).collect();
            format!("unhealthy: {}", failing.join(", "))
        });
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Health status of an individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component identifier (e.g., "source", "target")
    pub name: String,

    pub is_healthy: bool,

    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_new() {
        let status = HealthStatus::new();
        assert!(status.is_healthy);
        assert_eq!(status.score, 1.0);
        assert!(status.message.is_none());
        assert!(status.components.is_empty());
    }

    #[test]
    fn test_calculate_score_all_healthy() {
        let mut status = HealthStatus::new()
            .add_component(ComponentHealth::healthy("source"))
            .add_component(ComponentHealth::healthy("target"));

        status.calculate_score();

        assert_eq!(status.score, 1.0);
        assert!(status.is_healthy);
        assert!(status.message.is_none());
    }

    #[test]
    fn test_calculate_score_one_failing() {
        let mut status = HealthStatus::new()
            .add_component(ComponentHealth::healthy("source"))
            .add_component(ComponentHealth::unhealthy("target", "probe failed"));

        status.calculate_score();

        assert_eq!(status.score, 0.5);
        assert!(!status.is_healthy);
        assert_eq!(status.message.as_deref(), Some("unhealthy: target"));
    }

    #[test]
    fn test_component_health_constructors() {
        let unhealthy = ComponentHealth::unhealthy("source", "timeout");
        assert!(!unhealthy.is_healthy);
        assert_eq!(unhealthy.name, "source");
        assert_eq!(unhealthy.message, Some("timeout".to_string()));
    }
}
