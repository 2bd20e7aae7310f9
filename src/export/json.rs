//! JSON and JSON Lines output.

use std::io::{self, Write};

use serde_json::{Map, Value as JsonValue};

use crate::model::ResultSet;

/// Builds one JSON object per row, keyed by column name in header order.
fn row_objects(rs: &ResultSet) -> impl Iterator<Item = JsonValue> + '_ {
    rs.rows.iter().map(|row| {
        let object: Map<String, JsonValue> = rs
            .columns
            .iter()
            .zip(row)
            .map(|(col, value)| (col.name.clone(), value.to_json()))
            .collect();
        JsonValue::Object(object)
    })
}

/// Writes a JSON array with one indented object per row.
pub(super) fn write_array(rs: &ResultSet, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "[")?;

    let mut rows = row_objects(rs).peekable();
    while let Some(object) = rows.next() {
        let doc = serde_json::to_string_pretty(&object)?;
        let indented: Vec<String> = doc.lines().map(|l| format!("  {l}")).collect();
        let comma = if rows.peek().is_some() { "," } else { "" };
        writeln!(out, "{}{comma}", indented.join("\n"))?;
    }

    writeln!(out, "]")
}

/// Writes one compact JSON object per line.
pub(super) fn write_lines(rs: &ResultSet, out: &mut dyn Write) -> io::Result<()> {
    for object in row_objects(rs) {
        serde_json::to_writer(&mut *out, &object)?;
        writeln!(out)?;
    }
    Ok(())
}
