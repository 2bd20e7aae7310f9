//! Result set exporters.
//!
//! Each [`ExportFormat`] renders a [`ResultSet`] to a [`Sink`]. Text formats
//! write to stdout or a file, the spreadsheet format adds one worksheet per
//! result set to a workbook that is saved when the sink is finished.

mod delimited;
mod json;
mod markdown;
mod raw;
mod sink;
mod table;
mod xlsx;

pub use sink::{Sink, TextSink};
pub use table::BoxStyle;
pub use xlsx::Workbook;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::error::{Result, SqlrunError};
use crate::model::{Align, ResultSet};

/// Output format for result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Fixed-width boxed table.
    #[default]
    Fmt,
    /// Comma separated values.
    Csv,
    /// Tab separated values.
    Tsv,
    /// Markdown table.
    Md,
    /// Tab delimited values without a header.
    Raw,
    /// MS Excel workbook.
    Xls,
    /// JSON array of row objects.
    Json,
    /// One JSON object per line.
    Jsonl,
}

impl ExportFormat {
    /// All formats, in flag order.
    pub const ALL: [ExportFormat; 8] = [
        Self::Fmt,
        Self::Csv,
        Self::Tsv,
        Self::Md,
        Self::Raw,
        Self::Xls,
        Self::Json,
        Self::Jsonl,
    ];

    /// Returns the format name as used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fmt => "fmt",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Md => "md",
            Self::Raw => "raw",
            Self::Xls => "xls",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }

    /// Returns true if the format writes a workbook instead of text.
    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, Self::Xls)
    }

    /// Returns true if statements are echoed by default for this format.
    pub fn echoes_by_default(&self) -> bool {
        matches!(self, Self::Fmt | Self::Md)
    }

    /// Returns the file extension for per-source output files.
    pub fn output_extension(&self) -> &'static str {
        if self.is_spreadsheet() {
            "xlsx"
        } else {
            "log"
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = SqlrunError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                SqlrunError::config(format!(
                    "unknown output format '{}'; expected one of: fmt, csv, tsv, md, raw, xls, json, jsonl",
                    s
                ))
            })
    }
}

/// Renders result sets in one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Exporter {
    format: ExportFormat,
    style: BoxStyle,
}

impl Exporter {
    /// Creates an exporter for the given format.
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            style: BoxStyle::default(),
        }
    }

    /// Sets the box style used by the tabular format.
    pub fn with_style(mut self, style: BoxStyle) -> Self {
        self.style = style;
        self
    }

    /// Returns the output format.
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Writes `rs` to `sink`.
    pub fn export(&self, rs: &ResultSet, sink: &mut Sink) -> Result<()> {
        match sink {
            Sink::Text(text) => {
                let out = text.writer();
                self.write_text(rs, out).map_err(|e| SqlrunError::sink(e.to_string()))
            }
            Sink::Spreadsheet(book) => {
                if !self.format.is_spreadsheet() {
                    return Err(SqlrunError::internal(format!(
                        "{} output cannot be written to a workbook",
                        self.format
                    )));
                }
                book.add_result(rs)
            }
        }
    }

    /// Writes `rs` as text to `out`.
    pub fn write_text(&self, rs: &ResultSet, out: &mut dyn Write) -> std::io::Result<()> {
        match self.format {
            ExportFormat::Fmt => table::write(rs, self.style, out),
            ExportFormat::Csv => delimited::write(rs, b',', out),
            ExportFormat::Tsv => delimited::write(rs, b'\t', out),
            ExportFormat::Md => markdown::write(rs, out),
            ExportFormat::Raw => raw::write(rs, out),
            ExportFormat::Json => json::write_array(rs, out),
            ExportFormat::Jsonl => json::write_lines(rs, out),
            ExportFormat::Xls => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "spreadsheet output requires an output file",
            )),
        }
    }
}

/// Pads `text` to `width` characters with the given alignment.
///
/// Centering puts the odd pad space on the left.
pub(crate) fn pad(text: &str, width: usize, align: Align) -> String {
    let len = text.chars().count();
    let fill = width.saturating_sub(len);
    match align {
        Align::Left => format!("{text}{}", " ".repeat(fill)),
        Align::Right => format!("{}{text}", " ".repeat(fill)),
        Align::Center => {
            let left = fill - fill / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(fill / 2))
        }
    }
}

/// Formats every cell for fixed-width display.
pub(crate) fn display_cells(rs: &ResultSet) -> Vec<Vec<String>> {
    rs.rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_text()).collect())
        .collect()
}

/// Computes column widths from headers and display cells.
pub(crate) fn column_widths(headers: &[String], cells: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}
