//! ERP REST client: paginated catalogs, detail lookups, health probe.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use sheetsync_core::{RecordSource, SourceQuery};
use sheetsync_domain::config::SourceConfig;
use sheetsync_domain::constants::{SOURCE_FILTER_PARAM, SOURCE_ORDER_BY_PARAM, SOURCE_TOP_PARAM};
use sheetsync_domain::{Record, Result, SheetSyncError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::odata::ODataFilter;
use super::pagination::{normalize_page, Paginator};
use crate::http::{ReqwestTransport, ResilientClient, RetryPolicy};

pub struct ErpClient {
    http: ResilientClient,
    page_size: usize,
}

impl ErpClient {
    /// # Errors
    /// `SheetSyncError::Config` when the API key is missing or the transport
    /// cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(SheetSyncError::Config("source api key is required".into()));
        }
        let transport = ReqwestTransport::builder(config.base_url.clone())
            .bearer_token(config.api_key.clone())
            .timeout(config.retry.timeout())
            .build()?;
        let http = ResilientClient::new(Arc::new(transport), RetryPolicy::from(&config.retry));
        Ok(Self::with_client(http, config.page_size))
    }

    pub fn with_client(http: ResilientClient, page_size: usize) -> Self {
        Self { http, page_size: page_size.max(1) }
    }

    /// Retry waits end with `ApiError::Cancelled` once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.http = self.http.with_cancellation(cancel);
        self
    }

    pub fn http(&self) -> &ResilientClient {
        &self.http
    }

    /// Every record under `endpoint`, fetched page by page.
    pub fn paginate(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
        max_records: Option<usize>,
    ) -> BoxStream<'_, Result<Record>> {
        Paginator::new(&self.http, self.page_size)
            .fetch_all(endpoint, params, max_records)
            .map_err(SheetSyncError::from)
            .boxed()
    }

    /// `GET {endpoint}/{id}`.
    #[instrument(skip(self))]
    pub async fn get_record(&self, endpoint: &str, id: &str) -> Result<Record> {
        let path = format!("{}/{}", endpoint.trim_end_matches('/'), id);
        let value = self.http.get(&path, &[]).await?;
        Record::try_from(value)
    }

    /// First record matching `filter`, if any.
    #[instrument(skip(self, filter), fields(filter = %filter))]
    pub async fn find_one(&self, endpoint: &str, filter: &ODataFilter) -> Result<Option<Record>> {
        let params = vec![
            (SOURCE_FILTER_PARAM.to_string(), filter.to_string()),
            (SOURCE_TOP_PARAM.to_string(), "1".to_string()),
        ];
        let value = self.http.get(endpoint, &params).await?;
        let found = normalize_page(value)?.into_iter().next();
        if found.is_none() {
            debug!(endpoint, "no matching record");
        }
        Ok(found)
    }

    /// Cheap authenticated probe against the warehouse list.
    pub async fn health_check(&self) -> bool {
        let params = vec![(SOURCE_TOP_PARAM.to_string(), "1".to_string())];
        match self.http.get("/Warehouses", &params).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "source health check failed");
                false
            }
        }
    }
}

fn query_params(query: &SourceQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let filter = ODataFilter::from_query(query);
    if !filter.is_empty() {
        params.push((SOURCE_FILTER_PARAM.to_string(), filter.to_string()));
    }
    if let Some(order) = &query.order_by {
        params.push((SOURCE_ORDER_BY_PARAM.to_string(), order.clone()));
    }
    params
}

#[async_trait]
impl RecordSource for ErpClient {
    fn records(&self, query: SourceQuery) -> BoxStream<'_, Result<Record>> {
        let params = query_params(&query);
        info!(endpoint = %query.endpoint, params = ?params, max = ?query.max_records, "querying source");
        self.paginate(&query.endpoint, params, query.max_records)
    }

    async fn record_detail(&self, endpoint: &str, id: &str) -> Result<Record> {
        self.get_record(endpoint, id).await
    }
}
