use crate::audit::keypath::{flatten, leaf_paths};
use crate::audit::types::NormalizedRecord;
use crate::utils::format::render_scalar;
use std::collections::HashSet;
use std::io::{self, Write};

/// Union of flattened column names across `records`, in first-seen order.
pub fn column_set(records: &[NormalizedRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        for path in leaf_paths(record.fields()) {
            if seen.insert(path.clone()) {
                columns.push(path);
            }
        }
    }
    columns
}

/// Write records as CSV with a header of dotted column names.
///
/// Records without fields are skipped. With no columns (zero records, or only
/// empty ones) the file is left empty, header included.
pub fn write_csv<W: Write>(writer: &mut W, records: &[NormalizedRecord]) -> io::Result<()> {
    let columns = column_set(records);
    if columns.is_empty() {
        return writer.flush();
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&columns)?;

    for record in records.iter().filter(|r| !r.is_empty()) {
        let flat = flatten(record.fields());
        let row = columns
            .iter()
            .map(|column| flat.get(column).map(render_scalar).unwrap_or_default());
        csv_writer.write_record(row)?;
    }

    csv_writer.flush()
}
