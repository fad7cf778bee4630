//! Audit feed export command.
//!
//! Pages through the Cato `auditFeed` for one account and writes every record
//! to a single file. Nothing is written unless every page was fetched.
//!
//! # Usage
//!
//! ```bash
//! # Last day of events as text
//! cato-audit export --account-id 4242 --output audit.txt
//!
//! # Two days as CSV, credential from a file
//! cato-audit export --account-id 4242 --api-key-file ~/.cato/key \
//!     --timeframe last.P2D --csv --output audit.csv
//!
//! # Compressed JSON
//! cato-audit export --account-id 4242 --format json --output audit.json.gz
//! ```
//!
//! # Credentials
//!
//! The API key is taken from the first of `--api-key`, `--api-key-file`,
//! `CATO_API_KEY` or `CATO_API_KEY_FILE`. The account ID falls back to
//! `CATO_ACCOUNT_ID`.

use crate::audit_api::{ReqwestTransport, RetryPolicy};
use crate::config::ExportConfig;
use crate::output::ExportFormat;
use crate::pipeline::{export_with_transport, ExportSummary};
use crate::utils::format::format_number;
use crate::utils::progress::ProgressBar;
use crate::utils::time::duration_human;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::warn;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "CATO_API_KEY";
pub const API_KEY_FILE_ENV: &str = "CATO_API_KEY_FILE";
pub const ACCOUNT_ID_ENV: &str = "CATO_ACCOUNT_ID";

/// Command-line options for `export`, before environment fallbacks
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub account_id: Option<String>,
    pub timeframe: String,
    pub output: PathBuf,
    pub format: ExportFormat,
    pub endpoint: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub insecure: bool,
    /// Draw the progress spinner
    pub show_progress: bool,
}

/// Resolve the API key from flags first, then the environment.
pub fn resolve_api_key(flag: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(key) = flag.filter(|k| !k.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }
    if let Some(path) = file {
        return read_key_file(path);
    }
    if let Some(key) = env_value(API_KEY_ENV) {
        return Ok(key);
    }
    if let Some(path) = env_value(API_KEY_FILE_ENV) {
        return read_key_file(Path::new(&path));
    }
    bail!(
        "No API key given. Use --api-key, --api-key-file, or set {} / {}",
        API_KEY_ENV,
        API_KEY_FILE_ENV
    )
}

/// Resolve the account ID from the flag, then `CATO_ACCOUNT_ID`.
pub fn resolve_account_id(flag: Option<&str>) -> Result<String> {
    flag.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| env_value(ACCOUNT_ID_ENV))
        .with_context(|| format!("No account ID given. Use --account-id or set {ACCOUNT_ID_ENV}"))
}

fn read_key_file(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read API key file {}", path.display()))?;
    let key = contents.trim();
    if key.is_empty() {
        bail!("API key file {} is empty", path.display());
    }
    Ok(key.to_string())
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the library configuration from resolved options.
pub fn build_config(options: &ExportOptions) -> Result<ExportConfig> {
    let api_key = resolve_api_key(options.api_key.as_deref(), options.api_key_file.as_deref())?;
    let account_id = resolve_account_id(options.account_id.as_deref())?;

    let retry = RetryPolicy {
        max_retries: options.max_retries,
        ..RetryPolicy::default()
    };

    let config = ExportConfig::new(api_key, account_id, &options.output)
        .with_timeframe(&options.timeframe)
        .with_format(options.format)
        .with_endpoint(&options.endpoint)
        .with_retry_policy(retry)
        .with_request_timeout(Duration::from_secs(options.timeout_secs))
        .with_skip_verify(options.insecure);

    config.validate()?;
    Ok(config)
}

pub async fn run(options: ExportOptions) -> Result<()> {
    let config = build_config(&options)?;
    let timeframe = config.timeframe_expression()?;

    if config.skip_verify {
        warn!("TLS certificate verification is disabled");
    }

    eprintln!(
        "Exporting audit feed for account {} ({})",
        config.account_id, timeframe
    );

    let transport = ReqwestTransport::new(config.request_timeout, config.skip_verify)
        .context("Failed to create HTTP client")?;

    let progress = if options.show_progress {
        ProgressBar::new_spinner("Fetching")
    } else {
        ProgressBar::hidden()
    };

    let started = Utc::now();
    let result = export_with_transport(&config, transport, |page| {
        progress.update(page.total_records);
        progress.set_message(format!("page {}", page.page));
    })
    .await;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            progress.abandon();
            return Err(e).context("Audit feed export failed");
        }
    };

    progress.finish_with_message("done");
    print_summary(&summary, &duration_human(&started, &Utc::now()));
    Ok(())
}

fn print_summary(summary: &ExportSummary, elapsed: &str) {
    eprintln!("\n{}", "=".repeat(60));
    eprintln!("Export Summary");
    eprintln!("{}", "=".repeat(60));
    eprintln!("Records:    {}", format_number(summary.records));
    eprintln!("Pages:      {}", format_number(summary.pages));
    eprintln!("API calls:  {}", format_number(summary.api_calls as usize));
    eprintln!("Format:     {}", summary.format);
    eprintln!("Output:     {}", summary.output_path.display());
    eprintln!("Elapsed:    {}", elapsed);
}
