//! Utility functions and helpers.
//!
//! - [`format`] - Number formatting and cell rendering
//! - [`progress`] - Progress spinner for the fetch loop
//! - [`time`] - Epoch/ISO-8601 conversion and duration helpers
//! - [`writer`] - Output files with atomic replace and compression by extension
//!
//! # Examples
//!
//! ## Converting epoch milliseconds
//!
//! ```
//! use cato_audit_feed::utils::time::{epoch_millis_to_iso, iso_to_epoch_millis};
//!
//! let iso = epoch_millis_to_iso(1_728_000_000_000).unwrap();
//! assert_eq!(iso_to_epoch_millis(&iso), Some(1_728_000_000_000));
//! ```
//!
//! ## Writing a compressed export
//!
//! ```no_run
//! use cato_audit_feed::utils::writer::OutputFile;
//! use std::io::Write;
//!
//! // `.gz` and `.zst` destinations are compressed on the fly
//! let mut out = OutputFile::create("audit.txt.gz").unwrap();
//! writeln!(out, "event_type: Login").unwrap();
//! out.commit().unwrap();
//! ```

pub mod format;
pub mod progress;
pub mod time;
pub mod writer;
