//! The fetch → normalize → export pipeline.
//!
//! Pages are fetched one at a time; each page is normalized and appended to
//! the in-memory record list before the next request goes out. Nothing is
//! written until the last page has arrived, so a failed run never produces a
//! partial export.

use crate::audit::normalize::normalize_record;
use crate::audit::types::NormalizedRecord;
use crate::audit_api::{AuditApiClient, ReqwestTransport, Transport};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::output::{self, ExportFormat};
use log::info;
use std::path::PathBuf;

/// Progress after each page, for callers that want to report it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based page number
    pub page: usize,
    pub page_records: usize,
    pub total_records: usize,
    pub has_more: bool,
}

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub records: usize,
    pub pages: usize,
    pub api_calls: u32,
    pub output_path: PathBuf,
    pub format: ExportFormat,
}

/// Fetch every record in the configured timeframe and write the export.
///
/// Returns the number of records written.
pub async fn export_audit_logs(config: &ExportConfig) -> Result<usize> {
    config.validate()?;

    let transport = ReqwestTransport::new(config.request_timeout, config.skip_verify)
        .map_err(|e| ExportError::Configuration(format!("failed to create HTTP client: {e}")))?;

    let summary = export_with_transport(config, transport, |_| {}).await?;
    Ok(summary.records)
}

/// [`export_audit_logs`] over an arbitrary [`Transport`], reporting each page
/// to `on_page`.
pub async fn export_with_transport<T, F>(
    config: &ExportConfig,
    transport: T,
    mut on_page: F,
) -> Result<ExportSummary>
where
    T: Transport,
    F: FnMut(&PageProgress),
{
    config.validate()?;
    let timeframe = config.timeframe_expression()?;

    let client = AuditApiClient::new(transport, config.endpoint.as_str(), config.api_key.as_str())
        .with_retry_policy(config.retry.clone());

    let account_id = config.account_expression();
    info!("Fetching audit feed for account {} ({})", account_id, timeframe);

    let records = fetch_normalized(&client, account_id, &timeframe, &mut on_page).await?;
    let output_path = output::write_records(&records.records, &config.target())?;

    info!(
        "OK {} events from {} API calls",
        records.records.len(),
        client.api_calls()
    );

    Ok(ExportSummary {
        records: records.records.len(),
        pages: records.pages,
        api_calls: client.api_calls(),
        output_path,
        format: config.format,
    })
}

struct Fetched {
    records: Vec<NormalizedRecord>,
    pages: usize,
}

async fn fetch_normalized<T, F>(
    client: &AuditApiClient<T>,
    account_id: &str,
    timeframe: &str,
    on_page: &mut F,
) -> Result<Fetched>
where
    T: Transport,
    F: FnMut(&PageProgress),
{
    let mut pager = client.pager(account_id, timeframe);
    let mut records = Vec::new();

    while let Some(page) = pager.next_page().await? {
        let page_records = page.records.len();
        let has_more = page.has_more;
        records.extend(page.records.into_iter().map(normalize_record));

        on_page(&PageProgress {
            page: pager.pages_fetched(),
            page_records,
            total_records: records.len(),
            has_more,
        });
    }

    Ok(Fetched {
        records,
        pages: pager.pages_fetched(),
    })
}
