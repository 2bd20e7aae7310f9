//! CSV and TSV output.

use std::io::{self, Write};

use crate::model::ResultSet;

/// Writes a header record and one record per row, separated by `delimiter`.
pub(super) fn write(rs: &ResultSet, delimiter: u8, out: &mut dyn Write) -> io::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(out);

    writer.write_record(rs.columns.iter().map(|c| c.name.as_str()))?;
    for row in &rs.rows {
        writer.write_record(row.iter().map(|v| v.to_text()))?;
    }
    writer.flush()
}
