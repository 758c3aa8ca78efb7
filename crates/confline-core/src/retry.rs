//! Rate-limited request client with bounded linear backoff

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::http::{HttpRequest, HttpResponse, SharedTransport};

/// Rate limited (429) and gateway timeout (504) are the only retryable statuses.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 504)
}

/// Bounded retry schedule: `initial_delay + attempt * backoff` before each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(2),
            backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts (tests)
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            backoff: Duration::ZERO,
        }
    }

    /// Sleep before retrying after failed attempt `attempt` (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial_delay + self.backoff * attempt
    }
}

/// Terminal result of a request after retries.
#[derive(Debug)]
pub enum Outcome {
    Success(HttpResponse),
    /// Non-retryable status or transport error; `None` status means no response
    Failed { status: Option<u16> },
    /// Every attempt was rate limited / timed out
    Exhausted { status: Option<u16> },
}

impl Outcome {
    pub fn into_success(self) -> Option<HttpResponse> {
        match self {
            Self::Success(resp) => Some(resp),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Client for one external API.
///
/// Every call goes through [`ApiClient::request`], which applies the retry
/// policy and never returns an error: callers get an [`Outcome`] and decide
/// whether to null out the item's fields.
#[derive(Clone)]
pub struct ApiClient {
    label: &'static str,
    base_url: String,
    transport: SharedTransport,
    policy: RetryPolicy,
    headers: Vec<(String, String)>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("label", &self.label)
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        label: &'static str,
        base_url: &str,
        transport: SharedTransport,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            label,
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            policy,
            headers: Vec::new(),
        }
    }

    /// Header sent with every request (e.g. an API key)
    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/{path}`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `request`, retrying rate-limit and timeout failures.
    ///
    /// `item` names what is being fetched (title, identifier) for the log.
    pub fn request(&self, request: HttpRequest, item: &str) -> Outcome {
        let mut request = request;
        request.headers.extend(self.headers.iter().cloned());

        let max = self.policy.max_retries;
        let mut attempt = 0u32;
        loop {
            let status = match self.transport.send(&request) {
                Ok(resp) if resp.is_success() => return Outcome::Success(resp),
                Ok(resp) if is_retryable_status(resp.status) => Some(resp.status),
                Ok(resp) => {
                    log::error!("{}: HTTP {} for {item}", self.label, resp.status);
                    return Outcome::Failed {
                        status: Some(resp.status),
                    };
                }
                Err(e) if e.is_retryable() => e.status(),
                Err(e) => {
                    log::error!("{}: request for {item} failed: {e}", self.label);
                    return Outcome::Failed { status: e.status() };
                }
            };

            if attempt >= max {
                log::error!(
                    "{}: giving up on {item} after {} attempts (last status {})",
                    self.label,
                    attempt + 1,
                    fmt_status(status)
                );
                return Outcome::Exhausted { status };
            }

            let delay = self.policy.delay(attempt);
            attempt += 1;
            log::warn!(
                "{}: {} for {item}, retry {attempt}/{max} in {delay:?}",
                self.label,
                fmt_status(status)
            );
            std::thread::sleep(delay);
        }
    }

    /// GET `{base_url}/{path}` with query parameters
    pub fn get(&self, path: &str, query: &[(&str, &str)], item: &str) -> Outcome {
        let mut req = HttpRequest::get(self.url(path));
        for (k, v) in query {
            req = req.query(k, *v);
        }
        self.request(req, item)
    }

    /// GET and decode the JSON body; `None` on any failure (already logged)
    pub fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        item: &str,
    ) -> Option<T> {
        let resp = self.get(path, query, item).into_success()?;
        self.decode(&resp, item)
    }

    /// Decode a successful response body, logging malformed payloads
    pub fn decode<T: DeserializeOwned>(&self, resp: &HttpResponse, item: &str) -> Option<T> {
        match serde_json::from_str(&resp.body) {
            Ok(v) => Some(v),
            Err(e) => {
                log::error!("{}: malformed response for {item}: {e}", self.label);
                None
            }
        }
    }
}

fn fmt_status(status: Option<u16>) -> String {
    status.map_or_else(|| "timeout".to_string(), |s| format!("HTTP {s}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::MockTransport;

    fn client(mock: &Arc<MockTransport>, retries: u32) -> ApiClient {
        ApiClient::new(
            "test",
            "https://api.example.org/",
            mock.clone(),
            RetryPolicy::immediate(retries),
        )
    }

    #[test]
    fn linear_backoff_schedule() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_secs(2),
            backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.delay(0), Duration::from_secs(2));
        assert_eq!(policy.delay(1), Duration::from_secs(7));
        assert_eq!(policy.delay(2), Duration::from_secs(12));
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay(0), Duration::from_secs(2));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(504));
        assert!(!is_retryable_status(500));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn success_first_try() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("https://api.example.org/works/W1", 200, r#"{"id":"W1"}"#);
        let outcome = client(&mock, 2).get("works/W1", &[], "W1");
        assert!(outcome.is_success());
        assert_eq!(mock.hits("https://api.example.org/works/W1"), 1);
    }

    #[test]
    fn retries_rate_limit_then_succeeds() {
        let mock = Arc::new(MockTransport::new());
        let url = "https://api.example.org/paper/x";
        mock.on_get(url, 429, "");
        mock.on_get(url, 504, "");
        mock.on_get(url, 200, "{}");
        let outcome = client(&mock, 2).get("paper/x", &[], "x");
        assert!(outcome.is_success());
        assert_eq!(mock.hits(url), 3);
    }

    #[test]
    fn exhausted_after_max_retries() {
        let mock = Arc::new(MockTransport::new());
        let url = "https://api.example.org/paper/x";
        mock.on_get(url, 429, "");
        let outcome = client(&mock, 2).get("paper/x", &[], "x");
        assert!(matches!(outcome, Outcome::Exhausted { status: Some(429) }));
        // first attempt + 2 retries
        assert_eq!(mock.hits(url), 3);
    }

    #[test]
    fn timeout_is_retried() {
        let mock = Arc::new(MockTransport::new());
        let url = "https://api.example.org/paper/x";
        mock.on_get_timeout(url).on_get(url, 200, "{}");
        let outcome = client(&mock, 2).get("paper/x", &[], "x");
        assert!(outcome.is_success());
        assert_eq!(mock.hits(url), 2);
    }

    #[test]
    fn repeated_timeouts_exhaust() {
        let mock = Arc::new(MockTransport::new());
        let url = "https://api.example.org/paper/x";
        mock.on_get_timeout(url);
        let outcome = client(&mock, 2).get("paper/x", &[], "x");
        assert!(matches!(outcome, Outcome::Exhausted { status: None }));
        assert_eq!(mock.hits(url), 3);
    }

    #[test]
    fn other_status_stops_immediately() {
        let mock = Arc::new(MockTransport::new());
        let url = "https://api.example.org/paper/x";
        mock.on_get(url, 404, "");
        mock.on_get(url, 200, "{}");
        let outcome = client(&mock, 2).get("paper/x", &[], "x");
        assert!(matches!(outcome, Outcome::Failed { status: Some(404) }));
        assert_eq!(mock.hits(url), 1);
    }

    #[test]
    fn zero_retries_single_attempt() {
        let mock = Arc::new(MockTransport::new());
        let url = "https://api.example.org/a";
        mock.on_get(url, 504, "");
        let outcome = client(&mock, 0).get("a", &[], "a");
        assert!(matches!(outcome, Outcome::Exhausted { .. }));
        assert_eq!(mock.hits(url), 1);
    }

    #[test]
    fn headers_attached_to_every_request() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("https://api.example.org/a", 200, "{}");
        let api = client(&mock, 0).with_header("x-api-key", "secret");
        api.get("a", &[("fields", "title")], "a");
        let sent = mock.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].headers,
            vec![("x-api-key".to_string(), "secret".to_string())]
        );
        assert_eq!(sent[0].query_value("fields"), Some("title"));
    }

    #[test]
    fn get_json_malformed_is_none() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("https://api.example.org/a", 200, "not json");
        let value: Option<serde_json::Value> = client(&mock, 0).get_json("a", &[], "a");
        assert!(value.is_none());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let mock = Arc::new(MockTransport::new());
        let api = client(&mock, 0);
        assert_eq!(api.base_url(), "https://api.example.org");
        assert_eq!(api.url("/works/W1"), "https://api.example.org/works/W1");
    }
}
