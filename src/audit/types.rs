//! Data structures for the Cato `auditFeed` GraphQL query.
//!
//! The wire types mirror the JSON the API returns so they deserialize directly
//! with serde. [`RawRecord`], [`NormalizedRecord`] and [`Page`] are what the rest
//! of the crate works with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the record's top-level `time` is copied into its fields.
pub const EVENT_TIMESTAMP_KEY: &str = "event_timestamp";

/// One audit event as returned by the API: flat, dotted keys to scalar values.
pub type RawRecord = Map<String, Value>;

/// Top-level GraphQL response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// A single entry of a GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// `data.auditFeed` payload for one page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFeed {
    /// Continuation marker for the next request
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub fetched_count: Option<u64>,
    pub has_more: bool,
    #[serde(default)]
    pub accounts: Vec<AccountRecords>,
}

/// Records grouped under one account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecords {
    #[serde(default)]
    pub records: Vec<AuditRecord>,
}

/// A single audit event on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditRecord {
    #[serde(default)]
    pub time: Value,
    #[serde(rename = "fieldsMap")]
    pub fields_map: Map<String, Value>,
}

impl AuditRecord {
    /// Flatten into a [`RawRecord`], carrying `time` along as `event_timestamp`.
    pub fn into_raw(self) -> RawRecord {
        let mut fields = self.fields_map;
        if !self.time.is_null() {
            fields.insert(EVENT_TIMESTAMP_KEY.to_string(), self.time);
        }
        fields
    }
}

/// One page of results plus continuation state.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<RawRecord>,
    pub marker: Option<String>,
    pub has_more: bool,
    /// Count the API claims for this page (falls back to `records.len()`)
    pub fetched_count: usize,
}

impl From<AuditFeed> for Page {
    fn from(feed: AuditFeed) -> Self {
        let records: Vec<RawRecord> = feed
            .accounts
            .into_iter()
            .flat_map(|account| account.records)
            .map(AuditRecord::into_raw)
            .collect();

        let fetched_count = feed
            .fetched_count
            .map_or(records.len(), |count| count as usize);

        Self {
            records,
            marker: feed.marker.filter(|m| !m.is_empty()),
            has_more: feed.has_more,
            fetched_count,
        }
    }
}

/// An audit event after timestamp normalization and key-path reconstruction.
///
/// Keys at every level are free of the `.` separator. The record is read-only
/// once built; see [`crate::audit::normalize::normalize_record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord(Map<String, Value>);

impl NormalizedRecord {
    pub(crate) fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a value by dotted path, e.g. `"admin.name"`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(crate::audit::keypath::SEPARATOR);
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
