//! Number and text formatting utilities.
//!
//! Shared by the export summary and the progress spinner.

/// Formats a number with comma separators for thousands.
///
/// # Examples
///
/// ```
/// use cato_audit_feed::utils::format::format_number;
///
/// assert_eq!(format_number(1234), "1,234");
/// assert_eq!(format_number(1234567), "1,234,567");
/// assert_eq!(format_number(42), "42");
/// ```
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Render a scalar JSON value the way it should appear in a text or CSV cell.
///
/// Strings are written without quotes, `null` becomes an empty cell, and
/// compound values fall back to compact JSON.
pub fn render_scalar(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
