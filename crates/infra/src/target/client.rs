//! Sheet REST client implementing [`TargetStore`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use sheetsync_core::{NewColumn, SheetDirectory, TargetStore};
use sheetsync_domain::config::TargetConfig;
use sheetsync_domain::constants::MAX_ROWS_PER_REQUEST;
use sheetsync_domain::{
    ApiError, Cell, Result, RowPosition, RowUpdate, SheetId, SheetSnapshot, SheetSyncError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::wire::{NewRowDto, NewSheetDto, SheetDto, UpdateRowDto, WorkspaceDto, WriteResult};
use crate::http::{ApiRequest, ReqwestTransport, ResilientClient, RetryPolicy};

pub struct SheetClient {
    http: ResilientClient,
}

impl SheetClient {
    /// # Errors
    /// `SheetSyncError::Config` when the access token is missing or the
    /// transport cannot be built.
    pub fn new(config: &TargetConfig) -> Result<Self> {
        if config.access_token.trim().is_empty() {
            return Err(SheetSyncError::Config("target access token is required".into()));
        }
        let transport = ReqwestTransport::builder(config.base_url.clone())
            .bearer_token(config.access_token.clone())
            .timeout(config.retry.timeout())
            .build()?;
        Ok(Self::with_client(ResilientClient::new(
            Arc::new(transport),
            RetryPolicy::from(&config.retry),
        )))
    }

    pub fn with_client(http: ResilientClient) -> Self {
        Self { http }
    }

    /// Retry waits end with `ApiError::Cancelled` once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.http = self.http.with_cancellation(cancel);
        self
    }

    /// `GET /users/me` answers with the token's owner.
    pub async fn health_check(&self) -> bool {
        match self.http.get("/users/me", &[]).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "target health check failed");
                false
            }
        }
    }

    async fn write<T: Serialize + Sync>(
        &self,
        method: Method,
        sheet: SheetId,
        rows: &[T],
    ) -> Result<()> {
        if rows.len() > MAX_ROWS_PER_REQUEST {
            return Err(SheetSyncError::InvalidInput(format!(
                "{} rows exceed the {MAX_ROWS_PER_REQUEST}-row request limit",
                rows.len()
            )));
        }
        if rows.is_empty() {
            return Ok(());
        }

        let body = serde_json::to_value(rows)
            .map_err(|err| SheetSyncError::Internal(format!("row payload: {err}")))?;
        let request = ApiRequest::new(method, format!("/sheets/{sheet}/rows")).json(body);
        check_result(self.http.execute(&request).await?).map(|_| ())
    }
}

/// A write answered with a non-zero `resultCode` did not apply.
fn check_result(response: Value) -> Result<WriteResult> {
    let result: WriteResult = serde_json::from_value(response).unwrap_or_default();
    if result.result_code == 0 {
        Ok(result)
    } else {
        Err(SheetSyncError::Target(format!(
            "write rejected (resultCode {}): {}",
            result.result_code,
            result.message.unwrap_or_default()
        )))
    }
}

#[async_trait]
impl TargetStore for SheetClient {
    #[instrument(skip(self))]
    async fn load_sheet(&self, sheet: SheetId) -> Result<SheetSnapshot> {
        let value = self.http.get(&format!("/sheets/{sheet}"), &[]).await?;
        let dto: SheetDto = serde_json::from_value(value)
            .map_err(|err| SheetSyncError::Api(ApiError::Decode(format!("sheet {sheet}: {err}"))))?;
        let snapshot = SheetSnapshot::from(dto);
        debug!(columns = snapshot.columns.len(), rows = snapshot.rows.len(), "sheet loaded");
        Ok(snapshot)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn add_rows(&self, sheet: SheetId, position: RowPosition, rows: &[Vec<Cell>]) -> Result<()> {
        let payload: Vec<NewRowDto> =
            rows.iter().map(|cells| NewRowDto::new(position, cells)).collect();
        self.write(Method::POST, sheet, &payload).await
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn update_rows(&self, sheet: SheetId, rows: &[RowUpdate]) -> Result<()> {
        let payload: Vec<UpdateRowDto> = rows.iter().map(UpdateRowDto::from).collect();
        self.write(Method::PUT, sheet, &payload).await
    }
}

#[async_trait]
impl SheetDirectory for SheetClient {
    #[instrument(skip(self))]
    async fn find_sheet(&self, workspace: i64, name: &str) -> Result<Option<SheetId>> {
        let value = self.http.get(&format!("/workspaces/{workspace}"), &[]).await?;
        let dto: WorkspaceDto = serde_json::from_value(value).map_err(|err| {
            SheetSyncError::Api(ApiError::Decode(format!("workspace {workspace}: {err}")))
        })?;
        Ok(dto.sheets.into_iter().find(|sheet| sheet.name == name).map(|sheet| SheetId(sheet.id)))
    }

    #[instrument(skip(self, columns), fields(columns = columns.len()))]
    async fn create_sheet(
        &self,
        workspace: i64,
        name: &str,
        columns: &[NewColumn],
    ) -> Result<SheetId> {
        let body = serde_json::to_value(NewSheetDto::new(name, columns))
            .map_err(|err| SheetSyncError::Internal(format!("sheet payload: {err}")))?;
        let request =
            ApiRequest::new(Method::POST, format!("/workspaces/{workspace}/sheets")).json(body);
        let created = check_result(self.http.execute(&request).await?)?;

        created
            .result
            .as_ref()
            .and_then(|result| result.get("id"))
            .and_then(Value::as_i64)
            .map(SheetId)
            .ok_or_else(|| SheetSyncError::Target(format!("created sheet '{name}' has no id")))
    }
}
