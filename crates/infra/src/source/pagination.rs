//! Offset pagination (`$skip`/`$top`) as a lazy stream of records.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use sheetsync_domain::constants::{SOURCE_SKIP_PARAM, SOURCE_TOP_PARAM};
use sheetsync_domain::{ApiError, Record};
use tracing::{debug, info};

use crate::http::ResilientClient;

/// Walks `$skip` forward one page at a time until the source runs dry.
pub struct Paginator<'a> {
    client: &'a ResilientClient,
    page_size: usize,
}

struct Cursor {
    skip: usize,
    fetched: usize,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a ResilientClient, page_size: usize) -> Self {
        Self { client, page_size: page_size.max(1) }
    }

    /// Streams every record under `path`. A page is requested only when the
    /// previous one has been consumed; the stream ends after the first error.
    pub fn fetch_all(
        &self,
        path: &str,
        base_params: Vec<(String, String)>,
        max_records: Option<usize>,
    ) -> BoxStream<'a, Result<Record, ApiError>> {
        let client = self.client;
        let page_size = self.page_size;
        let path = path.to_string();
        let start = Cursor { skip: 0, fetched: 0, done: false };

        stream::try_unfold(start, move |cursor| {
            let path = path.clone();
            let base_params = base_params.clone();
            async move {
                if cursor.done {
                    return Ok(None);
                }

                let mut params = base_params;
                params.push((SOURCE_SKIP_PARAM.to_string(), cursor.skip.to_string()));
                params.push((SOURCE_TOP_PARAM.to_string(), page_size.to_string()));
                let response = client.get(&path, &params).await?;
                let mut page = normalize_page(response)?;
                let received = page.len();

                let mut next = Cursor {
                    skip: cursor.skip + page_size,
                    fetched: cursor.fetched + received,
                    done: received == 0 || received < page_size,
                };
                if let Some(max) = max_records {
                    if next.fetched >= max {
                        page.truncate(max.saturating_sub(cursor.fetched));
                        next.fetched = max;
                        next.done = true;
                    }
                }

                debug!(path = %path, skip = cursor.skip, received, total = next.fetched, "page fetched");
                if next.done {
                    info!(path = %path, total = next.fetched, "pagination complete");
                }
                if page.is_empty() {
                    return Ok(None);
                }
                Ok(Some((page, next)))
            }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }
}

/// Bare array, `{ "value": [...] }`, a single object, or nothing.
pub fn normalize_page(response: Value) -> Result<Vec<Record>, ApiError> {
    let items = match response {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("value") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(ApiError::Decode(format!("'value' is not an array: {other}")));
            }
            None if object.is_empty() => Vec::new(),
            None => vec![Value::Object(object)],
        },
        Value::Null => Vec::new(),
        other => return Err(ApiError::Decode(format!("unexpected page shape: {other}"))),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(Record::from(map)),
            other => Err(ApiError::Decode(format!("record is not an object: {other}"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::{ReqwestTransport, RetryPolicy};

    fn page(start: usize, len: usize) -> Value {
        Value::Array((start..start + len).map(|i| json!({ "ID": i.to_string() })).collect())
    }

    async fn client(server: &MockServer) -> ResilientClient {
        let transport = ReqwestTransport::builder(server.uri()).build().unwrap();
        ResilientClient::new(
            Arc::new(transport),
            RetryPolicy { max_retries: 2, initial_backoff: Duration::ZERO },
        )
    }

    async fn mount_page(server: &MockServer, skip: usize, body: Value) {
        Mock::given(method("GET"))
            .and(path("/Clients"))
            .and(query_param("$skip", skip.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn short_last_page_ends_without_extra_request() {
        let server = MockServer::start().await;
        mount_page(&server, 0, page(0, 2)).await;
        mount_page(&server, 2, json!({ "value": page(2, 2) })).await;
        mount_page(&server, 4, page(4, 1)).await;

        let client = client(&server).await;
        let records: Vec<Record> =
            Paginator::new(&client, 2).fetch_all("/Clients", Vec::new(), None).try_collect().await.unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, 0, page(0, 2)).await;
        mount_page(&server, 2, json!([])).await;

        let client = client(&server).await;
        let records: Vec<Record> =
            Paginator::new(&client, 2).fetch_all("/Clients", Vec::new(), None).try_collect().await.unwrap();

        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn max_records_truncates() {
        let server = MockServer::start().await;
        mount_page(&server, 0, page(0, 3)).await;
        mount_page(&server, 3, page(3, 3)).await;

        let client = client(&server).await;
        let records: Vec<Record> = Paginator::new(&client, 3)
            .fetch_all("/Clients", Vec::new(), Some(5))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(records[4].text("ID").as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn pages_are_fetched_lazily() {
        let server = MockServer::start().await;
        mount_page(&server, 0, page(0, 2)).await;

        let client = client(&server).await;
        let mut stream = Paginator::new(&client, 2).fetch_all("/Clients", Vec::new(), None);
        let first = stream.try_next().await.unwrap();

        assert!(first.is_some());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_ends_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad token"})))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let result: Result<Vec<Record>, ApiError> =
            Paginator::new(&client, 2).fetch_all("/Clients", Vec::new(), None).try_collect().await;

        assert!(matches!(result, Err(ApiError::Client { status: 401, .. })));
    }

    #[test]
    fn normalizes_response_shapes() {
        assert_eq!(normalize_page(json!([{"a": 1}])).unwrap().len(), 1);
        assert_eq!(normalize_page(json!({"value": [{"a": 1}, {"a": 2}]})).unwrap().len(), 2);
        assert_eq!(normalize_page(json!({"ID": "x"})).unwrap().len(), 1);
        assert!(normalize_page(json!({})).unwrap().is_empty());
        assert!(normalize_page(Value::Null).unwrap().is_empty());
        assert!(normalize_page(json!([1, 2])).is_err());
    }
}
