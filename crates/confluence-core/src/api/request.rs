use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use super::ApiError;

/// Initial backoff delay for retried requests.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Retry behaviour for retryable failures (network errors, 429, 502-504).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }

    /// Retry up to `max_retries` times, doubling the delay each time.
    pub const fn exponential(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// A single API call, built per request and never persisted.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Whether a 401 should send the user to the login route.
    pub navigate_on_unauthorized: bool,
    pub timeout: Option<Duration>,
    pub retry: Option<RetryPolicy>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            navigate_on_unauthorized: true,
            timeout: None,
            retry: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn query_pairs<K, V, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Unknown {
            status: None,
            message: format!("Failed to serialize request body: {}", e),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Leave the redirect on 401 to the caller, e.g. on the login page itself.
    pub fn without_auth_redirect(mut self) -> Self {
        self.navigate_on_unauthorized = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let desc = RequestDescriptor::get("/documents");
        assert_eq!(desc.method, Method::GET);
        assert!(desc.navigate_on_unauthorized);
        assert!(desc.query.is_empty());
        assert!(desc.body.is_none());
        assert!(desc.timeout.is_none());
        assert!(desc.retry.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let desc = RequestDescriptor::post("/documents")
            .query("spaceId", "s1")
            .query("page", 2)
            .json(&json!({ "title": "Notes" }))
            .expect("serializable")
            .without_auth_redirect()
            .retry(RetryPolicy::exponential(2, Duration::from_millis(10)));

        assert_eq!(
            desc.query,
            vec![
                ("spaceId".to_string(), "s1".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
        assert_eq!(desc.body, Some(json!({ "title": "Notes" })));
        assert!(!desc.navigate_on_unauthorized);
        assert_eq!(desc.retry.map(|r| r.max_retries), Some(2));
    }
}
