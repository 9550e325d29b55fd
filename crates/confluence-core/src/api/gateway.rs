//! The single choke point for calls to the remote API.
//!
//! Every request goes through [`Gateway::send`], which attaches the session
//! credential, dispatches through the [`Transport`], and turns failures into
//! an [`ApiError`]. Each failed call produces one notification; a 401 also
//! tears the session down and, unless the request opted out, navigates to the
//! login route.
//!
//! A caller that abandons a request does not cancel these side effects: a 401
//! arriving late still logs the user out.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Url;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionManager;
use crate::navigation::{routes, Navigator};
use crate::notify::Notifier;

use super::request::{RequestDescriptor, RetryPolicy};
use super::transport::{OutboundRequest, RawResponse, Transport};
use super::ApiError;

pub struct Gateway {
    transport: Arc<dyn Transport>,
    base_url: String,
    sessions: Arc<SessionManager>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    default_timeout: Option<Duration>,
    default_retry: RetryPolicy,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        sessions: Arc<SessionManager>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sessions,
            notifier,
            navigator,
            default_timeout: None,
            default_retry: RetryPolicy::none(),
        }
    }

    /// Deadline applied to requests that don't set their own.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_default_retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = policy;
        self
    }

    /// Dispatch a request and decode the JSON success body.
    pub async fn send<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let navigate = descriptor.navigate_on_unauthorized;
        match self.dispatch(&descriptor).await.and_then(|r| Self::decode(&r)) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.handle_failure(&err, navigate);
                Err(err)
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(RequestDescriptor::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let descriptor = self.with_body(RequestDescriptor::post(path), body)?;
        self.send(descriptor).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let descriptor = self.with_body(RequestDescriptor::put(path), body)?;
        self.send(descriptor).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let descriptor = self.with_body(RequestDescriptor::patch(path), body)?;
        self.send(descriptor).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(RequestDescriptor::delete(path)).await
    }

    fn with_body<B: Serialize + ?Sized>(
        &self,
        descriptor: RequestDescriptor,
        body: &B,
    ) -> Result<RequestDescriptor, ApiError> {
        descriptor.json(body).map_err(|err| {
            self.handle_failure(&err, true);
            err
        })
    }

    /// Send with retries, returning the first success or the final failure.
    async fn dispatch(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        let policy = descriptor.retry.unwrap_or(self.default_retry);
        let mut retries = 0;
        let mut backoff = policy.initial_backoff;

        loop {
            let request = self.build(descriptor)?;
            let url = request.url.to_string();

            let result = match self.transport.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => Err(ApiError::from_status(response.status, &response.body)),
                Err(e) => Err(ApiError::Network(e.to_string())),
            };

            match result {
                Err(err) if err.is_retryable() && retries < policy.max_retries => {
                    retries += 1;
                    warn!(url = %url, retry = retries, backoff_ms = backoff.as_millis() as u64, error = %err, "Retrying request");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                other => return other,
            }
        }
    }

    fn build(&self, descriptor: &RequestDescriptor) -> Result<OutboundRequest, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, descriptor.path)).map_err(|e| {
            ApiError::Unknown {
                status: None,
                message: format!("Invalid request URL for {}: {}", descriptor.path, e),
            }
        })?;
        if !descriptor.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&descriptor.query);
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        self.sessions.authorize(&mut headers);

        let body = match descriptor.body {
            Some(ref value) => Some(serde_json::to_vec(value).map_err(|e| ApiError::Unknown {
                status: None,
                message: format!("Failed to serialize request body: {}", e),
            })?),
            None => None,
        };

        debug!(method = %descriptor.method, url = %url, "Sending request");
        Ok(OutboundRequest {
            method: descriptor.method.clone(),
            url,
            headers,
            body,
            timeout: descriptor.timeout.or(self.default_timeout),
        })
    }

    /// Empty bodies (204) decode as JSON `null`, which suits `()` and `Option<T>`.
    /// Callers that don't care about the body should ask for `IgnoredAny`,
    /// which accepts any payload.
    fn decode<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ApiError> {
        let parsed = if response.body.trim().is_empty() {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_str(&response.body)
        };
        parsed.map_err(|e| ApiError::Unknown {
            status: Some(response.status),
            message: format!("Failed to parse response: {}", e),
        })
    }

    fn handle_failure(&self, err: &ApiError, navigate: bool) {
        if err.is_unauthorized() {
            if let Err(e) = self.sessions.logout() {
                warn!(error = %e, "Failed to clear credential after 401");
            }
            if navigate {
                self.navigator.navigate(routes::LOGIN);
            }
        }
        warn!(error = %err, "API request failed");
        self.notifier.notify(err.notification());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use serde::de::IgnoredAny;
    use serde_json::{json, Value};

    use crate::api::transport::TransportError;
    use crate::auth::token::encode_for_test;
    use crate::auth::{MemoryTokenStore, TokenStore};
    use crate::navigation::RecordingNavigator;
    use crate::notify::RecordingNotifier;

    /// Replays canned results and records what it was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        sent: Mutex<Vec<OutboundRequest>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::default(),
            })
        }

        fn sent(&self) -> Vec<OutboundRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
            self.sent.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RawResponse::new(200, "{}")))
        }
    }

    struct Harness {
        gateway: Gateway,
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryTokenStore>,
        sessions: Arc<SessionManager>,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness(replies: Vec<Result<RawResponse, TransportError>>) -> Harness {
        let transport = ScriptedTransport::replying(replies);
        let store = Arc::new(MemoryTokenStore::new());
        let sessions = Arc::new(SessionManager::new(store.clone()));
        sessions.initialize();
        let notifier = Arc::new(RecordingNotifier::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let gateway = Gateway::new(
            transport.clone(),
            "http://api.test/v1/",
            sessions.clone(),
            notifier.clone(),
            navigator.clone(),
        );
        Harness {
            gateway,
            transport,
            store,
            sessions,
            notifier,
            navigator,
        }
    }

    fn credential() -> String {
        encode_for_test(&json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "exp": (Utc::now() + ChronoDuration::hours(1)).timestamp(),
        }))
    }

    #[tokio::test]
    async fn test_success_attaches_credential_and_query() {
        let h = harness(vec![Ok(RawResponse::new(200, r#"{"ok": true}"#))]);
        let token = credential();
        h.sessions.login(&token).unwrap();

        let value: Value = h
            .gateway
            .send(RequestDescriptor::get("/documents").query("spaceId", "s 1"))
            .await
            .unwrap();
        assert_eq!(value, json!({ "ok": true }));

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url.as_str(), "http://api.test/v1/documents?spaceId=s+1");
        assert_eq!(
            sent[0].headers.get(header::AUTHORIZATION).unwrap().to_str().unwrap(),
            format!("Bearer {}", token)
        );
        assert!(h.notifier.notifications().is_empty());
        assert!(h.navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_request_has_no_authorization() {
        let h = harness(vec![Ok(RawResponse::new(204, ""))]);

        let () = h.gateway.delete("/documents/d1").await.unwrap();

        let sent = h.transport.sent();
        assert!(sent[0].headers.get(header::AUTHORIZATION).is_none());
        assert_eq!(sent[0].method, reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn test_unauthorized_tears_down_and_navigates() {
        let h = harness(vec![Ok(RawResponse::new(401, r#"{"message":"expired"}"#))]);
        h.sessions.login(&credential()).unwrap();

        let result: Result<Value, _> = h.gateway.get("/documents").await;

        assert_eq!(result, Err(ApiError::Unauthorized));
        assert!(!h.sessions.is_authenticated());
        assert_eq!(h.store.load().unwrap(), None);
        assert_eq!(h.navigator.visited(), vec![routes::LOGIN.to_string()]);
        assert_eq!(h.notifier.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_opt_out_skips_navigation_only() {
        let h = harness(vec![Ok(RawResponse::new(401, ""))]);
        h.sessions.login(&credential()).unwrap();

        let result: Result<Value, _> = h
            .gateway
            .send(RequestDescriptor::get("/me").without_auth_redirect())
            .await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert!(!h.sessions.is_authenticated());
        assert!(h.navigator.visited().is_empty());
        assert_eq!(h.notifier.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_unauthorized_while_anonymous() {
        let h = harness(vec![
            Ok(RawResponse::new(401, "")),
            Ok(RawResponse::new(401, "")),
        ]);

        for _ in 0..2 {
            let result: Result<Value, _> = h.gateway.get("/documents").await;
            assert!(result.is_err());
        }
        assert!(!h.sessions.is_authenticated());
        assert_eq!(h.notifier.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_forbidden_notifies_and_keeps_session() {
        let h = harness(vec![Ok(RawResponse::new(403, r#"{"message":"Not your document"}"#))]);
        h.sessions.login(&credential()).unwrap();

        let result: Result<Value, _> = h.gateway.get("/documents/d1").await;

        let err = result.unwrap_err();
        assert!(err.is_forbidden());
        let notes = h.notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Forbidden");
        assert_eq!(notes[0].description, "Not your document");
        assert!(h.sessions.is_authenticated());
        assert!(h.store.load().unwrap().is_some());
        assert!(h.navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn test_not_found() {
        let h = harness(vec![Ok(RawResponse::new(404, r#"{"message":"No such document"}"#))]);

        let result: Result<Value, _> = h.gateway.get("/documents/missing").await;

        assert_eq!(result, Err(ApiError::NotFound("No such document".to_string())));
        let notes = h.notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Not Found");
        assert!(h.navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn test_error_message_survives_null_errors_field() {
        let h = harness(vec![Ok(RawResponse::new(
            500,
            r#"{"message":"db down","errors":null}"#,
        ))]);

        let result: Result<Value, _> = h.gateway.get("/documents").await;

        assert_eq!(
            result,
            Err(ApiError::Server {
                status: 500,
                message: "db down".to_string()
            })
        );
        assert_eq!(h.notifier.notifications()[0].description, "db down");
    }

    #[tokio::test]
    async fn test_delete_ignoring_body_accepts_any_payload() {
        let h = harness(vec![
            Ok(RawResponse::new(200, "{}")),
            Ok(RawResponse::new(200, r#"{"message":"Document deleted"}"#)),
            Ok(RawResponse::new(204, "")),
        ]);

        for _ in 0..3 {
            let _: IgnoredAny = h.gateway.delete("/documents/d1").await.unwrap();
        }
        assert!(h.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure() {
        let h = harness(vec![Err(TransportError::NoResponse("connection refused".into()))]);

        let result: Result<Value, _> = h.gateway.get("/documents").await;

        assert!(matches!(result, Err(ApiError::Network(_))));
        let notes = h.notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Network Error");
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let h = harness(vec![Ok(RawResponse::new(200, "<html>"))]);

        let result: Result<Value, _> = h.gateway.get("/documents").await;

        assert!(matches!(result, Err(ApiError::Unknown { status: Some(200), .. })));
        assert_eq!(h.notifier.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let h = harness(vec![
            Ok(RawResponse::new(503, "")),
            Ok(RawResponse::new(200, "{}")),
        ]);

        let result: Result<Value, _> = h.gateway.get("/documents").await;

        assert!(result.is_err());
        assert_eq!(h.transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_policy_recovers() {
        let h = harness(vec![
            Err(TransportError::NoResponse("reset".into())),
            Ok(RawResponse::new(429, "")),
            Ok(RawResponse::new(200, r#"[1, 2]"#)),
        ]);

        let value: Vec<u32> = h
            .gateway
            .send(
                RequestDescriptor::get("/documents")
                    .retry(RetryPolicy::exponential(3, Duration::from_millis(1))),
            )
            .await
            .unwrap();

        assert_eq!(value, vec![1, 2]);
        assert_eq!(h.transport.sent().len(), 3);
        assert!(h.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_retry_exhausted_notifies_once() {
        let h = harness(vec![
            Ok(RawResponse::new(502, "")),
            Ok(RawResponse::new(502, "")),
        ]);

        let result: Result<Value, _> = h
            .gateway
            .send(
                RequestDescriptor::get("/documents")
                    .retry(RetryPolicy::exponential(1, Duration::from_millis(1))),
            )
            .await;

        assert!(matches!(result, Err(ApiError::Server { status: 502, .. })));
        assert_eq!(h.transport.sent().len(), 2);
        assert_eq!(h.notifier.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_defaults() {
        let h = harness(vec![Ok(RawResponse::new(200, "{}")), Ok(RawResponse::new(200, "{}"))]);
        let gateway = h.gateway.with_default_timeout(Some(Duration::from_secs(5)));

        let _: Value = gateway.get("/a").await.unwrap();
        let _: Value = gateway
            .send(RequestDescriptor::get("/b").timeout(Duration::from_secs(1)))
            .await
            .unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent[0].timeout, Some(Duration::from_secs(5)));
        assert_eq!(sent[1].timeout, Some(Duration::from_secs(1)));
    }
}
