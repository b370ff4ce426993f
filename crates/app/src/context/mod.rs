//! Application context - dependency injection container

use std::sync::Arc;

use sheetsync_core::{
    catalogs, get_or_create_sheet, CatalogSpec, RunOptions, RunnerSettings, SyncRunner,
    SystemClock, TargetLocks,
};
use sheetsync_domain::{Config, Result, SheetId, SheetSyncError};
use sheetsync_infra::scheduling::{
    JobHistory, RunnerJob, SyncJob, SyncScheduler, SyncSchedulerConfig,
};
use sheetsync_infra::{ErpClient, SheetClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub source: Arc<ErpClient>,
    pub target: Arc<SheetClient>,
    pub runner: Arc<SyncRunner>,
    pub locks: TargetLocks,
    pub history: JobHistory,
    /// Shared by both clients; cancelled when a scheduler built here stops.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Wires clients and the runner from a validated configuration.
    ///
    /// # Errors
    /// `SheetSyncError::Config` listing every problem `Config::validate`
    /// reports, or when a client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(SheetSyncError::Config(problems.join("; ")));
        }
        for name in config.targets.keys() {
            if catalogs::find(name).is_err() {
                warn!(catalog = %name, "configured target does not match any catalog; ignoring");
            }
        }

        let shutdown = CancellationToken::new();
        let source =
            Arc::new(ErpClient::new(&config.source)?.with_cancellation(shutdown.clone()));
        let target =
            Arc::new(SheetClient::new(&config.target)?.with_cancellation(shutdown.clone()));
        let locks = TargetLocks::new();

        let settings = RunnerSettings {
            batch_size: config.target.effective_batch_size(),
            sync: config.sync.clone(),
            warehouse_id: config.source.warehouse_id.clone(),
        };
        let runner = Arc::new(SyncRunner::new(
            source.clone(),
            target.clone(),
            settings,
            Arc::new(SystemClock),
            locks.clone(),
        )?);

        info!(targets = config.targets.len(), "Application context initialized");

        Ok(Self {
            config,
            source,
            target,
            runner,
            locks,
            history: JobHistory::new(),
            shutdown,
        })
    }

    /// Resolves catalog names to their sheets, in registry order when
    /// `names` is empty. Without a workspace that means every catalog with a
    /// configured sheet id; with one, every catalog.
    ///
    /// # Errors
    /// `SheetSyncError::InvalidInput` for an unknown catalog or one with no
    /// sheet id and no workspace; any error from the workspace lookup.
    pub async fn targets(&self, names: &[String]) -> Result<Vec<(CatalogSpec, SheetId)>> {
        let specs: Vec<CatalogSpec> = if names.is_empty() {
            let workspace = self.config.target.workspace_id.is_some();
            catalogs::all()
                .into_iter()
                .filter(|spec| workspace || self.config.sheet_for(spec.name).is_some())
                .collect()
        } else {
            names.iter().map(|name| catalogs::find(name)).collect::<Result<_>>()?
        };

        let mut targets = Vec::with_capacity(specs.len());
        for spec in specs {
            let sheet = self.sheet_for(&spec).await?;
            targets.push((spec, sheet));
        }
        Ok(targets)
    }

    /// Configured sheet id, else the workspace sheet named after the catalog.
    async fn sheet_for(&self, spec: &CatalogSpec) -> Result<SheetId> {
        if let Some(sheet) = self.config.sheet_for(spec.name) {
            return Ok(SheetId(sheet));
        }
        let Some(workspace) = self.config.target.workspace_id else {
            return Err(SheetSyncError::InvalidInput(format!(
                "no target sheet configured for '{}'",
                spec.name
            )));
        };
        get_or_create_sheet(self.target.as_ref(), workspace, spec).await
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions { force_full_load: self.config.sync.force_full_load }
    }

    /// Job covering `names` (or every configured catalog).
    pub async fn job(&self, names: &[String]) -> Result<RunnerJob> {
        Ok(RunnerJob::new(self.runner.clone(), self.targets(names).await?, self.run_options()))
    }

    /// Interval scheduler for `job`, recording into the shared history.
    pub fn scheduler(&self, job: Arc<dyn SyncJob>) -> SyncScheduler {
        let config = SyncSchedulerConfig {
            interval: self.config.sync.interval(),
            run_on_start: true,
            ..SyncSchedulerConfig::default()
        };
        SyncScheduler::with_history(job, config, self.history.clone())
            .with_shutdown(self.shutdown.clone())
    }

    /// Probes both remote APIs.
    pub async fn health(&self) -> HealthStatus {
        let (source_ok, target_ok) =
            tokio::join!(self.source.health_check(), self.target.health_check());

        let mut status = HealthStatus::new()
            .add_component(component("source", source_ok))
            .add_component(component("target", target_ok));
        status.calculate_score();
        status
    }
}

fn component(name: &str, healthy: bool) -> ComponentHealth {
    if healthy {
        ComponentHealth::healthy(name)
    } else {
        ComponentHealth::unhealthy(name, "probe failed")
    }
}
