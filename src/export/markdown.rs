//! Markdown tables.

use std::io::{self, Write};

use super::{column_widths, display_cells, pad};
use crate::model::{Align, ResultSet};

/// Writes `rs` as a Markdown table with padded, aligned cells.
pub(super) fn write(rs: &ResultSet, out: &mut dyn Write) -> io::Result<()> {
    if rs.columns.is_empty() {
        return Ok(());
    }

    let headers: Vec<String> = rs.headers().iter().map(|h| escape(h)).collect();
    let cells: Vec<Vec<String>> = display_cells(rs)
        .into_iter()
        .map(|row| row.iter().map(|c| escape(c)).collect())
        .collect();
    let widths = column_widths(&headers, &cells);
    let aligns: Vec<Align> = rs.columns.iter().map(|c| c.column_type.alignment()).collect();

    let padded = |row: &[String]| -> Vec<String> {
        row.iter()
            .zip(&widths)
            .zip(&aligns)
            .map(|((cell, w), a)| pad(cell, *w, *a))
            .collect()
    };

    let marks: Vec<String> = widths
        .iter()
        .zip(&aligns)
        .map(|(w, a)| separator(*a, *w))
        .collect();

    emit(out, &padded(&headers))?;
    emit(out, &marks)?;
    for row in &cells {
        emit(out, &padded(row))?;
    }

    Ok(())
}

fn emit(out: &mut dyn Write, row: &[String]) -> io::Result<()> {
    writeln!(out, "| {} |", row.join(" | "))
}

/// Builds the alignment mark for a column of the given width.
fn separator(align: Align, width: usize) -> String {
    match align {
        Align::Center => format!(":{}:", "-".repeat(width.saturating_sub(2).max(1))),
        Align::Left => format!(":{}", "-".repeat(width.saturating_sub(1).max(1))),
        Align::Right => format!("{}:", "-".repeat(width.saturating_sub(1).max(1))),
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}
