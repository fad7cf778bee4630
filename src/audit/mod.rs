//! Audit feed records and their normalization.
//!
//! - [`types`] - Wire types for the `auditFeed` query plus the record/page model
//! - [`keypath`] - Dot-notation expansion and export-time flattening
//! - [`normalize`] - Timestamp conversion and the per-record normalization step

pub mod keypath;
pub mod normalize;
pub mod types;
