//! Command implementations.
//!
//! - [`export`] - Page through the audit feed and write every record to a file
//!
//! Commands resolve flags and environment fallbacks into an
//! [`ExportConfig`](crate::config::ExportConfig), drive the library, and print a
//! human-readable summary to stderr.

pub mod export;
