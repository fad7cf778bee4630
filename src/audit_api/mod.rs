//! Client for the Cato GraphQL API.
//!
//! Requests go through a [`Transport`] and are retried according to a
//! [`RetryPolicy`]:
//!
//! - HTTP 429, or a GraphQL error starting with `rate limit for operation`,
//!   waits and retries the same request.
//! - Transport failures and HTTP 5xx are retried the same way.
//! - HTTP 401/403 and authorization-flavoured GraphQL errors fail at once.
//! - Any other 4xx or GraphQL error fails at once.
//! - A body that is not the expected JSON shape fails at once.
//!
//! Once the retry budget is spent the last failure kind decides between
//! [`ExportError::RateLimit`] and [`ExportError::TransientNetwork`].

pub mod pager;
pub mod transport;

use crate::audit::types::{AuditFeed, GraphQlResponse, Page};
use crate::error::{ExportError, Result};
use log::{debug, info, warn};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub use pager::AuditFeedPager;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

/// Production GraphQL endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.catonetworks.com/api/v1/graphql2";

/// Operation name used in logs and errors
pub const AUDIT_FEED_OPERATION: &str = "auditFeed";

pub const AUDIT_FEED_QUERY: &str = r#"query auditFeed($accountIDs: [ID!], $timeFrame: TimeFrame!, $marker: String) {
  auditFeed(accountIDs: $accountIDs, timeFrame: $timeFrame, marker: $marker) {
    marker
    fetchedCount
    hasMore
    accounts {
      id
      records {
        time
        fieldsMap
      }
    }
  }
}"#;

const RATE_LIMIT_PREFIX: &str = "rate limit for operation";

const AUTH_ERROR_HINTS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "authentication",
    "not authorized",
    "permission denied",
    "forbidden",
    "invalid api key",
];

/// Why a request is being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    RateLimit,
    Transient,
}

impl RetryKind {
    fn describe(self) -> &'static str {
        match self {
            RetryKind::RateLimit => "rate limited",
            RetryKind::Transient => "failed",
        }
    }
}

/// Bounded exponential backoff.
///
/// `max_retries` counts retries after the first attempt, so a request is sent
/// at most `max_retries + 1` times.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub rate_limit_delay: Duration,
    pub transient_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            rate_limit_delay: Duration::from_secs(5),
            transient_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping; meant for tests and dry runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            rate_limit_delay: Duration::ZERO,
            transient_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, kind: RetryKind, retry: u32) -> Duration {
        let base = match kind {
            RetryKind::RateLimit => self.rate_limit_delay,
            RetryKind::Transient => self.transient_delay,
        };
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = base.as_secs_f64() * self.backoff_multiplier.max(1.0).powi(exponent);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Result of a single request attempt
enum Attempt {
    Done(Value),
    Retry {
        kind: RetryKind,
        status: Option<u16>,
        message: String,
    },
}

/// GraphQL client holding the credential and retry policy.
pub struct AuditApiClient<T> {
    transport: T,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
    api_calls: AtomicU32,
}

impl<T: Transport> AuditApiClient<T> {
    pub fn new(transport: T, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
            api_calls: AtomicU32::new(0),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of HTTP requests sent so far, retries included
    pub fn api_calls(&self) -> u32 {
        self.api_calls.load(Ordering::Relaxed)
    }

    /// Run a GraphQL query and return its `data` member.
    pub async fn query(&self, operation: &str, query: &str, variables: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables }).to_string();
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match self.send(body.clone()).await {
                Ok(response) => classify(operation, response)?,
                Err(e) => Attempt::Retry {
                    kind: RetryKind::Transient,
                    status: None,
                    message: e.to_string(),
                },
            };

            let (kind, status, message) = match outcome {
                Attempt::Done(data) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(data);
                }
                Attempt::Retry {
                    kind,
                    status,
                    message,
                } => (kind, status, message),
            };

            if attempt >= max_attempts {
                return Err(match kind {
                    RetryKind::RateLimit => ExportError::RateLimit {
                        operation: operation.to_string(),
                        attempts: attempt,
                    },
                    RetryKind::Transient => ExportError::TransientNetwork {
                        operation: operation.to_string(),
                        attempts: attempt,
                        status,
                        last_error: message,
                    },
                });
            }

            let delay = self.retry.delay_for(kind, attempt);
            warn!(
                "{} {} on attempt {}/{}: {}; retrying in {}ms",
                operation,
                kind.describe(),
                attempt,
                max_attempts,
                message,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Fetch one page of the audit feed starting at `marker`.
    pub async fn fetch_audit_page(
        &self,
        account_id: &str,
        timeframe: &str,
        marker: Option<&str>,
    ) -> Result<Page> {
        let variables = json!({
            "accountIDs": [account_id],
            "timeFrame": timeframe,
            "marker": marker.unwrap_or(""),
        });

        let data = self
            .query(AUDIT_FEED_OPERATION, AUDIT_FEED_QUERY, variables)
            .await?;

        let feed = match data {
            Value::Object(mut fields) => fields.remove("auditFeed"),
            _ => None,
        }
        .filter(|feed| !feed.is_null())
        .ok_or_else(|| ExportError::malformed(AUDIT_FEED_OPERATION, "missing data.auditFeed"))?;

        let feed: AuditFeed = serde_json::from_value(feed)
            .map_err(|e| ExportError::malformed(AUDIT_FEED_OPERATION, e.to_string()))?;

        Ok(Page::from(feed))
    }

    /// Lazily page through every record of `timeframe`.
    pub fn pager(&self, account_id: &str, timeframe: &str) -> AuditFeedPager<'_, T> {
        AuditFeedPager::new(self, account_id, timeframe)
    }

    async fn send(&self, body: String) -> std::result::Result<HttpResponse, TransportError> {
        let request = HttpRequest {
            url: self.endpoint.clone(),
            method: Method::POST,
            headers: vec![
                ("x-api-key".to_string(), self.api_key.clone()),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body,
        };

        let call = self.api_calls.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        debug!("POST {} (call #{})", self.endpoint, call);
        self.transport.send(request).await
    }
}

/// Decide what one HTTP response means for the retry loop.
fn classify(operation: &str, response: HttpResponse) -> Result<Attempt> {
    let status = response.status;

    match status {
        429 => {
            return Ok(Attempt::Retry {
                kind: RetryKind::RateLimit,
                status: Some(status),
                message: "HTTP 429 Too Many Requests".to_string(),
            })
        }
        401 | 403 => {
            return Err(ExportError::Authorization {
                operation: operation.to_string(),
                status,
                message: snippet(&response.body),
            })
        }
        500..=599 => {
            return Ok(Attempt::Retry {
                kind: RetryKind::Transient,
                status: Some(status),
                message: format!("HTTP {}: {}", status, snippet(&response.body)),
            })
        }
        200..=299 => {}
        _ => {
            return Err(ExportError::Api {
                operation: operation.to_string(),
                status,
                message: snippet(&response.body),
            })
        }
    }

    let parsed: GraphQlResponse = serde_json::from_str(&response.body)
        .map_err(|e| ExportError::malformed(operation, format!("invalid JSON: {e}")))?;

    if !parsed.errors.is_empty() {
        let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
        let joined = messages.join("; ");

        if messages
            .iter()
            .any(|m| m.to_ascii_lowercase().starts_with(RATE_LIMIT_PREFIX))
        {
            return Ok(Attempt::Retry {
                kind: RetryKind::RateLimit,
                status: Some(status),
                message: joined,
            });
        }

        let auth_related = messages.iter().any(|m| {
            let lower = m.to_ascii_lowercase();
            AUTH_ERROR_HINTS.iter().any(|hint| lower.contains(hint))
        });
        if auth_related {
            return Err(ExportError::Authorization {
                operation: operation.to_string(),
                status,
                message: joined,
            });
        }

        return Err(ExportError::Api {
            operation: operation.to_string(),
            status,
            message: joined,
        });
    }

    parsed
        .data
        .filter(|data| !data.is_null())
        .map(Attempt::Done)
        .ok_or_else(|| ExportError::malformed(operation, "response has neither data nor errors"))
}

/// First part of a response body, for error messages
fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_ok(status: u16, body: &str) -> Attempt {
        match classify("auditFeed", HttpResponse::new(status, body)) {
            Ok(attempt) => attempt,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(RetryKind::Transient, 1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(RetryKind::Transient, 2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(RetryKind::RateLimit, 1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(RetryKind::RateLimit, 3), Duration::from_secs(20));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(RetryKind::RateLimit, 10), Duration::from_secs(60));
        assert_eq!(
            policy.delay_for(RetryKind::RateLimit, u32::MAX),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_immediate_policy_never_sleeps() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for(RetryKind::RateLimit, 3), Duration::ZERO);
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_classify_success() {
        match classify_ok(200, r#"{"data":{"auditFeed":null}}"#) {
            Attempt::Done(data) => assert!(data.get("auditFeed").is_some()),
            Attempt::Retry { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn test_classify_rate_limits() {
        assert!(matches!(
            classify_ok(429, ""),
            Attempt::Retry { kind: RetryKind::RateLimit, status: Some(429), .. }
        ));
        assert!(matches!(
            classify_ok(
                200,
                r#"{"errors":[{"message":"rate limit for operation: auditFeed"}]}"#
            ),
            Attempt::Retry { kind: RetryKind::RateLimit, .. }
        ));
    }

    #[test]
    fn test_classify_server_error_is_transient() {
        assert!(matches!(
            classify_ok(503, "upstream unavailable"),
            Attempt::Retry { kind: RetryKind::Transient, status: Some(503), .. }
        ));
    }

    #[test]
    fn test_classify_auth_failures() {
        for status in [401, 403] {
            let err = classify("auditFeed", HttpResponse::new(status, "denied")).err();
            assert!(matches!(err, Some(ExportError::Authorization { .. })));
        }

        let err = classify(
            "auditFeed",
            HttpResponse::new(200, r#"{"errors":[{"message":"Unauthorized: invalid API key"}]}"#),
        )
        .err();
        assert!(matches!(err, Some(ExportError::Authorization { status: 200, .. })));
    }

    #[test]
    fn test_classify_other_client_error() {
        let err = classify("auditFeed", HttpResponse::new(400, "bad request")).err();
        assert!(matches!(err, Some(ExportError::Api { status: 400, .. })));
    }

    #[test]
    fn test_classify_graphql_error() {
        let err = classify(
            "auditFeed",
            HttpResponse::new(200, r#"{"errors":[{"message":"Cannot query field \"foo\""}]}"#),
        )
        .err();
        assert!(matches!(err, Some(ExportError::Api { .. })));
    }

    #[test]
    fn test_classify_malformed() {
        for body in ["not json", "{}", r#"{"data":null}"#, "[]"] {
            let err = classify("auditFeed", HttpResponse::new(200, body)).err();
            assert!(
                matches!(err, Some(ExportError::MalformedResponse { .. })),
                "body {:?} should be malformed",
                body
            );
        }
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(500);
        let short = snippet(&long);
        assert_eq!(short.len(), 203);
        assert!(short.ends_with("..."));
        assert_eq!(snippet("  short  "), "short");
    }
}
