//! Resolved export configuration.
//!
//! [`ExportConfig`] is a plain value: the library never reads environment
//! variables or files on its own. The CLI layer resolves flags and environment
//! fallbacks and hands the finished value to
//! [`export_audit_logs`](crate::pipeline::export_audit_logs).

use crate::audit_api::{RetryPolicy, DEFAULT_ENDPOINT};
use crate::error::{ExportError, Result};
use crate::output::{ExportFormat, ExportTarget};
use crate::utils::time::validate_iso_duration;
use std::path::PathBuf;
use std::time::Duration;

/// Look back one day unless told otherwise
pub const DEFAULT_TIMEFRAME: &str = "last.P1D";

/// Per-request deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Sent as the `x-api-key` header
    pub api_key: String,
    pub account_id: String,
    /// `last.<ISO-8601 duration>`, `utc.<range>`, or a bare duration like `P2D`
    pub timeframe: String,
    pub output_path: PathBuf,
    pub format: ExportFormat,
    pub endpoint: String,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    /// Accept invalid TLS certificates
    pub skip_verify: bool,
}

impl ExportConfig {
    /// Configuration with defaults for everything but the required settings.
    pub fn new(
        api_key: impl Into<String>,
        account_id: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            account_id: account_id.into().trim().to_string(),
            timeframe: DEFAULT_TIMEFRAME.to_string(),
            output_path: output_path.into(),
            format: ExportFormat::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_TIMEOUT,
            skip_verify: false,
        }
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_csv_mode(self, csv_mode: bool) -> Self {
        self.with_format(ExportFormat::from_csv_mode(csv_mode))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_skip_verify(mut self, skip_verify: bool) -> Self {
        self.skip_verify = skip_verify;
        self
    }

    pub fn csv_mode(&self) -> bool {
        self.format == ExportFormat::Csv
    }

    pub fn target(&self) -> ExportTarget {
        ExportTarget::new(self.output_path.clone(), self.format)
    }

    /// The account ID as sent to the API.
    pub fn account_expression(&self) -> &str {
        self.account_id.trim()
    }

    /// The timeframe as sent to the API.
    pub fn timeframe_expression(&self) -> Result<String> {
        normalize_timeframe(&self.timeframe)
    }

    /// Check every setting; nothing touches the network before this passes.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(config_error("API key is required"));
        }

        let account = self.account_expression();
        if account.is_empty() {
            return Err(config_error("account ID is required"));
        }
        if !account.bytes().all(|b| b.is_ascii_digit()) {
            return Err(config_error(format!(
                "account ID '{}' must be numeric",
                self.account_id
            )));
        }

        self.timeframe_expression()?;

        if self.output_path.as_os_str().is_empty() {
            return Err(config_error("output path is required"));
        }

        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(config_error(format!(
                "endpoint '{}' must be an http(s) URL",
                self.endpoint
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(config_error("request timeout must be greater than zero"));
        }

        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(config_error("backoff multiplier must be at least 1.0"));
        }

        Ok(())
    }
}

/// Canonicalise a timeframe for the API.
///
/// ```
/// use cato_audit_feed::config::normalize_timeframe;
///
/// assert_eq!(normalize_timeframe("P2D").unwrap(), "last.P2D");
/// assert_eq!(normalize_timeframe("last.PT12H").unwrap(), "last.PT12H");
/// assert!(normalize_timeframe("yesterday").is_err());
/// ```
pub fn normalize_timeframe(timeframe: &str) -> Result<String> {
    let timeframe = timeframe.trim();

    if let Some(duration) = timeframe.strip_prefix("last.") {
        validate_iso_duration(duration)
            .map_err(|e| config_error(format!("invalid timeframe '{timeframe}': {e}")))?;
        return Ok(timeframe.to_string());
    }

    if timeframe.starts_with('P') {
        validate_iso_duration(timeframe)
            .map_err(|e| config_error(format!("invalid timeframe '{timeframe}': {e}")))?;
        return Ok(format!("last.{timeframe}"));
    }

    if let Some(range) = timeframe.strip_prefix("utc.") {
        if range.is_empty() {
            return Err(config_error("timeframe 'utc.' is missing its range"));
        }
        return Ok(timeframe.to_string());
    }

    Err(config_error(format!(
        "invalid timeframe '{timeframe}': expected last.<ISO-8601 duration> (e.g. last.P2D) or utc.<range>"
    )))
}

fn config_error(message: impl Into<String>) -> ExportError {
    ExportError::Configuration(message.into())
}
