//! Raw output: tab-joined values, no header.

use std::io::{self, Write};

use crate::model::ResultSet;

pub(super) fn write(rs: &ResultSet, out: &mut dyn Write) -> io::Result<()> {
    for row in &rs.rows {
        let line: Vec<String> = row.iter().map(|v| v.to_text()).collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    Ok(())
}
