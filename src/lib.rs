//! # Cato Audit Feed
//!
//! Export the Cato Networks audit trail to a local file.
//!
//! ## Overview
//!
//! The Cato GraphQL API hands out audit events one page at a time through the
//! `auditFeed` query. This crate pages through every event in a timeframe,
//! turns each record into a nested document, and writes the whole set to a
//! single text, CSV or JSON file.
//!
//! Each record arrives as a flat `fieldsMap` whose keys may be dotted
//! (`"actor.email"`). Normalization:
//!
//! - rebuilds the nesting implied by the dots
//! - converts epoch-millisecond timestamps to ISO-8601 UTC strings
//! - keeps the record's `time` under `event_timestamp`
//!
//! ## Features
//!
//! - **Bounded retries** with exponential backoff for rate limits and transient
//!   failures; authorization errors fail immediately
//! - **Atomic output** - the destination only appears once the export completed
//! - **Compressed output** - `.gz` and `.zst` destinations are compressed on the fly
//! - **Shell completion** for bash, zsh, fish, powershell, and elvish
//!
//! ## Architecture
//!
//! - [`audit`] - Record types, key-path reconstruction and timestamp normalization
//! - [`audit_api`] - GraphQL client, retry policy, pagination and HTTP transport
//! - [`output`] - Text, CSV and JSON exporters
//! - [`config`] - Export configuration and validation
//! - [`pipeline`] - Fetch, normalize and export in one call
//! - [`commands`] - CLI command implementations
//! - [`utils`] - Shared utilities (time, progress, formatting, output files)
//!
//! ## Example Usage
//!
//! ```bash
//! export CATO_API_KEY=...
//! cato-audit export --account-id 4242 --timeframe last.P2D --output audit.csv --csv
//! ```
//!
//! ```no_run
//! use cato_audit_feed::{export_audit_logs, ExportConfig};
//!
//! # async fn run() -> Result<(), cato_audit_feed::ExportError> {
//! let config = ExportConfig::new("api-key", "4242", "audit.txt").with_timeframe("last.P2D");
//! let count = export_audit_logs(&config).await?;
//! println!("exported {count} events");
//! # Ok(())
//! # }
//! ```
//!
//! ## Installation
//!
//! ```bash
//! cargo install --path .
//! ```

pub mod audit;
pub mod audit_api;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod utils;

pub use config::ExportConfig;
pub use error::ExportError;
pub use pipeline::{export_audit_logs, export_with_transport, ExportSummary, PageProgress};
