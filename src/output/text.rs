use crate::audit::keypath::flatten;
use crate::audit::types::NormalizedRecord;
use crate::utils::format::render_scalar;
use std::io::{self, Write};

/// Write records as blank-line separated blocks of `dotted.path: value` lines.
///
/// Line breaks inside values are escaped so every field stays on one line.
/// Records without fields have no lines to write and are skipped. Zero
/// records produce an empty file.
pub fn write_text<W: Write>(writer: &mut W, records: &[NormalizedRecord]) -> io::Result<()> {
    for (idx, record) in records.iter().filter(|r| !r.is_empty()).enumerate() {
        if idx > 0 {
            writeln!(writer)?;
        }
        for (path, value) in flatten(record.fields()) {
            let rendered = escape_line_breaks(&render_scalar(&value));
            writeln!(writer, "{}: {}", path, rendered)?;
        }
    }
    writer.flush()
}

fn escape_line_breaks(value: &str) -> String {
    value.replace('\r', "\\r").replace('\n', "\\n")
}
