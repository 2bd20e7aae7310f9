//! Fixed-width boxed tables.

use std::io::{self, Write};

use super::{column_widths, display_cells, pad};
use crate::model::{Align, ResultSet};

/// Border characters for boxed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxStyle {
    /// Box-drawing characters.
    #[default]
    Unicode,
    /// Plain `+`, `-` and `|`.
    Ascii,
}

struct Border {
    horizontal: char,
    vertical: char,
    top: [char; 3],
    middle: [char; 3],
    bottom: [char; 3],
}

impl BoxStyle {
    fn border(&self) -> Border {
        match self {
            BoxStyle::Unicode => Border {
                horizontal: '─',
                vertical: '│',
                top: ['┌', '┬', '┐'],
                middle: ['├', '┼', '┤'],
                bottom: ['└', '┴', '┘'],
            },
            BoxStyle::Ascii => Border {
                horizontal: '-',
                vertical: '|',
                top: ['+', '+', '+'],
                middle: ['+', '+', '+'],
                bottom: ['+', '+', '+'],
            },
        }
    }
}

/// Writes `rs` as a boxed table.
pub(super) fn write(rs: &ResultSet, style: BoxStyle, out: &mut dyn Write) -> io::Result<()> {
    if rs.columns.is_empty() {
        return Ok(());
    }

    let border = style.border();
    let headers = rs.headers();
    let cells = display_cells(rs);
    let widths = column_widths(&headers, &cells);
    let aligns: Vec<Align> = rs.columns.iter().map(|c| c.column_type.alignment()).collect();

    let rule = |[left, junction, right]: [char; 3]| {
        let segments: Vec<String> = widths
            .iter()
            .map(|w| border.horizontal.to_string().repeat(w + 2))
            .collect();
        format!("{left}{}{right}", segments.join(&junction.to_string()))
    };
    let line = |row: &[String]| {
        let sep = format!(" {} ", border.vertical);
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .zip(&aligns)
            .map(|((cell, w), a)| pad(cell, *w, *a))
            .collect();
        format!("{v} {} {v}", cells.join(&sep), v = border.vertical)
    };

    writeln!(out, "{}", rule(border.top))?;
    writeln!(out, "{}", line(&headers))?;
    writeln!(out, "{}", rule(border.middle))?;
    for row in &cells {
        writeln!(out, "{}", line(row))?;
    }
    writeln!(out, "{}", rule(border.bottom))
}
