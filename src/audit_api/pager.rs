//! Marker-based pagination over the audit feed.
//!
//! The pager is pull-based: nothing is requested until [`AuditFeedPager::next_page`]
//! is awaited, and each call issues exactly one (possibly retried) request. It
//! cannot be rewound; a new pager starts again from the beginning of the
//! timeframe.

use super::{AuditApiClient, Transport, AUDIT_FEED_OPERATION};
use crate::audit::types::{Page, RawRecord, EVENT_TIMESTAMP_KEY};
use crate::error::{ExportError, Result};
use crate::utils::format::render_scalar;
use log::{debug, info};

pub struct AuditFeedPager<'a, T> {
    client: &'a AuditApiClient<T>,
    account_id: String,
    timeframe: String,
    marker: Option<String>,
    pages: usize,
    records: usize,
    finished: bool,
}

impl<'a, T: Transport> AuditFeedPager<'a, T> {
    pub(crate) fn new(client: &'a AuditApiClient<T>, account_id: &str, timeframe: &str) -> Self {
        Self {
            client,
            account_id: account_id.to_string(),
            timeframe: timeframe.to_string(),
            marker: None,
            pages: 0,
            records: 0,
            finished: false,
        }
    }

    /// Fetch the next page, or `None` once the API has reported the end.
    ///
    /// After an error the pager is exhausted and keeps returning `None`.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.finished {
            return Ok(None);
        }

        let fetched = self
            .client
            .fetch_audit_page(&self.account_id, &self.timeframe, self.marker.as_deref())
            .await;
        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        self.pages += 1;
        self.records += page.records.len();
        self.log_page(&page);

        if !page.has_more {
            self.finished = true;
            return Ok(Some(page));
        }

        match page.marker.clone() {
            None => {
                self.finished = true;
                Err(ExportError::malformed(
                    AUDIT_FEED_OPERATION,
                    "hasMore is true but no marker was returned",
                ))
            }
            Some(next)
                if page.records.is_empty() && self.marker.as_deref() == Some(next.as_str()) =>
            {
                self.finished = true;
                Err(ExportError::malformed(
                    AUDIT_FEED_OPERATION,
                    format!("pagination stalled: marker {next} returned no records"),
                ))
            }
            Some(next) => {
                debug!("Next marker: {}", next);
                self.marker = Some(next);
                Ok(Some(page))
            }
        }
    }

    /// Drain the pager into a flat list of records, in page order.
    pub async fn collect_records(mut self) -> Result<Vec<RawRecord>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page.records);
        }
        Ok(all)
    }

    /// Pages received so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Records received so far
    pub fn records_fetched(&self) -> usize {
        self.records
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn log_page(&self, page: &Page) {
        let mut line = format!(
            "iteration:{} count:{} total_count:{} hasMore:{}",
            self.pages, page.fetched_count, self.records, page.has_more
        );

        let event_time = |record: &RawRecord| {
            record
                .get(EVENT_TIMESTAMP_KEY)
                .map(render_scalar)
                .unwrap_or_default()
        };
        if let (Some(first), Some(last)) = (page.records.first(), page.records.last()) {
            line.push_str(&format!(" {} {}", event_time(first), event_time(last)));
        }

        info!("{}", line);
    }
}
