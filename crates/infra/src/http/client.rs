//! Retrying JSON client over a [`Transport`].
//!
//! Status handling:
//! - any 2xx: success, an empty body decodes to `{}`
//! - 429: wait `Retry-After` seconds when given, else the current backoff
//! - 5xx and transport failures: wait the current backoff
//! - any other status: terminal, never retried
//!
//! The backoff doubles after every wait. `RetryPolicy::max_retries` bounds
//! the physical attempts of one logical request.

use std::sync::Arc;

use serde_json::{json, Value};
use sheetsync_domain::constants::ERROR_BODY_PREVIEW_LEN;
use sheetsync_domain::ApiError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::retry::{RetryPolicy, RetryState, Sleeper, TokioSleeper};
use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            policy,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Backoff waits end early with [`ApiError::Cancelled`] once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        let mut request = ApiRequest::get(path);
        request.query = query.to_vec();
        self.execute(&request).await
    }

    /// Runs one logical request to a terminal outcome.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let attempts = self.policy.attempts();
        let mut state = RetryState::new(self.policy.initial_backoff);

        loop {
            state.attempt += 1;
            let exhausted = state.attempt >= attempts;
            debug!(attempt = state.attempt, "HTTP attempt");

            match self.transport.send(request).await {
                Ok(response) if response.is_success() => return decode_success(&response),
                Ok(response) if response.status == 429 => {
                    if exhausted {
                        return Err(ApiError::RateLimitExceeded { attempts: state.attempt });
                    }
                    let wait = response.retry_after.unwrap_or(state.backoff);
                    warn!(attempt = state.attempt, wait_secs = wait.as_secs_f64(), "rate limited");
                    self.pause(wait).await?;
                }
                Ok(response) if response.status >= 500 => {
                    if exhausted {
                        return Err(ApiError::Server {
                            status: response.status,
                            attempts: state.attempt,
                            body: preview(&response.body),
                        });
                    }
                    warn!(
                        attempt = state.attempt,
                        status = response.status,
                        wait_secs = state.backoff.as_secs_f64(),
                        "server error, retrying"
                    );
                    self.pause(state.backoff).await?;
                }
                Ok(response) => return Err(client_error(&response)),
                Err(TransportError::InvalidRequest(message)) => {
                    return Err(ApiError::InvalidRequest(message));
                }
                Err(err) => {
                    if exhausted {
                        return Err(ApiError::ConnectionExhausted {
                            attempts: state.attempt,
                            message: err.to_string(),
                        });
                    }
                    warn!(
                        attempt = state.attempt,
                        error = %err,
                        wait_secs = state.backoff.as_secs_f64(),
                        "transport failure, retrying"
                    );
                    self.pause(state.backoff).await?;
                }
            }

            state.double();
        }
    }

    async fn pause(&self, duration: std::time::Duration) -> Result<(), ApiError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ApiError::Cancelled),
            () = self.sleeper.sleep(duration) => Ok(()),
        }
    }
}

fn decode_success(response: &ApiResponse) -> Result<Value, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(&response.body).map_err(|err| ApiError::Decode(err.to_string()))
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW_LEN).collect()
}

fn client_error(response: &ApiResponse) -> ApiError {
    let body = serde_json::from_str::<Value>(&response.body)
        .unwrap_or_else(|_| json!({ "raw": preview(&response.body) }));
    let message = ["message", "error"]
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    warn!(status = response.status, %message, "request rejected");
    ApiError::Client { status: response.status, message, body }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    /// Replays canned outcomes in order and counts calls.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<ApiResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self { script: Mutex::new(script.into()), calls: Mutex::new(0) })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _request: &ApiRequest) -> Result<ApiResponse, TransportError> {
            *self.calls.lock() += 1;
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().push(duration);
        }
    }

    fn status(code: u16) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse::new(code, ""))
    }

    fn ok(body: &str) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse::new(200, body))
    }

    fn client(
        transport: Arc<ScriptedTransport>,
        max_retries: u32,
    ) -> (ResilientClient, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = ResilientClient::new(
            transport,
            RetryPolicy { max_retries, initial_backoff: Duration::from_secs(1) },
        )
        .with_sleeper(Arc::clone(&sleeper) as Arc<dyn Sleeper>);
        (client, sleeper)
    }

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_secs).collect()
    }

    #[tokio::test]
    async fn test_retry_after_overrides_backoff() {
        let mut limited = ApiResponse::new(429, "");
        limited.retry_after = Some(Duration::from_secs(7));
        let transport = ScriptedTransport::new(vec![Ok(limited), ok(r#"{"ok":true}"#)]);
        let (client, sleeper) = client(Arc::clone(&transport), 5);

        let value = client.get("/Clients", &[]).await.unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(*sleeper.slept.lock(), secs(&[7]));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_backoff_doubles_across_mixed_transient_failures() {
        let transport = ScriptedTransport::new(vec![
            status(500),
            status(429),
            Err(TransportError::Timeout("slow".into())),
            status(503),
            ok("[]"),
        ]);
        let (client, sleeper) = client(Arc::clone(&transport), 5);

        let value = client.get("/Orders", &[]).await.unwrap();

        assert_eq!(value, json!([]));
        assert_eq!(*sleeper.slept.lock(), secs(&[1, 2, 4, 8]));
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_budget() {
        let transport = ScriptedTransport::new(vec![
            status(502),
            status(502),
            status(502),
            Ok(ApiResponse::new(503, "down for maintenance")),
            ok("{}"),
        ]);
        let (client, sleeper) = client(Arc::clone(&transport), 4);

        let err = client.get("/Products", &[]).await.unwrap_err();

        assert_eq!(
            err,
            ApiError::Server { status: 503, attempts: 4, body: "down for maintenance".into() }
        );
        assert_eq!(transport.calls(), 4);
        assert_eq!(sleeper.slept.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion() {
        let transport = ScriptedTransport::new(vec![status(429), status(429)]);
        let (client, _) = client(Arc::clone(&transport), 2);

        let err = client.get("/Invoices", &[]).await.unwrap_err();
        assert_eq!(err, ApiError::RateLimitExceeded { attempts: 2 });
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn test_connection_failures_exhaust_budget() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
        ]);
        let (client, _) = client(Arc::clone(&transport), 2);

        let err = client.get("/Banks", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::ConnectionExhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(400, r#"{"message":"Invalid filter"}"#)),
            ok("{}"),
        ]);
        let (client, sleeper) = client(Arc::clone(&transport), 5);

        let err = client.get("/Clients", &[]).await.unwrap_err();

        match err {
            ApiError::Client { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid filter");
            }
            other => panic!("expected client error, got {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
        assert!(sleeper.slept.lock().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_client_error_keeps_raw_preview() {
        let long = "x".repeat(900);
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(404, long))]);
        let (client, _) = client(transport, 5);

        let ApiError::Client { body, .. } = client.get("/Nope", &[]).await.unwrap_err() else {
            panic!("expected client error");
        };
        assert_eq!(body["raw"].as_str().map(str::len), Some(ERROR_BODY_PREVIEW_LEN));
    }

    #[tokio::test]
    async fn test_empty_success_body_is_empty_object() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(204, ""))]);
        let (client, _) = client(transport, 5);
        assert_eq!(client.get("/x", &[]).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let transport = ScriptedTransport::new(vec![ok("<html>")]);
        let (client, _) = client(transport, 5);
        assert!(matches!(client.get("/x", &[]).await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let transport = ScriptedTransport::new(vec![status(500), ok("{}")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (client, _) = client(Arc::clone(&transport), 5);
        let client = client.with_cancellation(cancel);

        assert_eq!(client.get("/x", &[]).await, Err(ApiError::Cancelled));
        assert_eq!(transport.calls(), 1);
    }
}
