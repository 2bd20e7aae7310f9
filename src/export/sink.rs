//! Output destinations.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::xlsx::Workbook;
use super::ExportFormat;
use crate::error::{Result, SqlrunError};

/// Where rendered output goes.
pub enum Sink {
    /// A text stream (stdout or a file).
    Text(TextSink),
    /// A workbook saved to a file when the sink is finished.
    Spreadsheet(Workbook),
}

impl Sink {
    /// Creates a sink writing to stdout.
    pub fn stdout() -> Self {
        Self::text(Box::new(io::stdout()))
    }

    /// Creates a sink writing to the given writer.
    pub fn text(out: Box<dyn Write>) -> Self {
        Self::Text(TextSink {
            out,
            written: false,
        })
    }

    /// Opens the sink for `format`.
    ///
    /// `None` or `-` means stdout. Spreadsheets always need a file path.
    pub fn create(format: ExportFormat, path: Option<&Path>) -> Result<Self> {
        let path = path.filter(|p| p.as_os_str() != "-");

        if format.is_spreadsheet() {
            let path = path.ok_or_else(|| {
                SqlrunError::sink("spreadsheet export requires an output file")
            })?;
            return Ok(Self::Spreadsheet(Workbook::new(path)));
        }

        match path {
            None => Ok(Self::stdout()),
            Some(path) => {
                let file = File::create(path).map_err(|e| {
                    SqlrunError::sink(format!("cannot create '{}': {}", path.display(), e))
                })?;
                debug!(path = %path.display(), "Opened output file");
                Ok(Self::text(Box::new(BufWriter::new(file))))
            }
        }
    }

    /// Writes a blank line if this text sink already holds output.
    pub fn separate(&mut self) -> Result<()> {
        match self {
            Self::Text(text) if text.written => {
                writeln!(text.out).map_err(write_error)
            }
            _ => Ok(()),
        }
    }

    /// Writes a line of text. Workbooks ignore it.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        match self {
            Self::Text(text) => writeln!(text.writer(), "{line}").map_err(write_error),
            Self::Spreadsheet(_) => Ok(()),
        }
    }

    /// Flushes text output or saves the workbook.
    ///
    /// A workbook with no sheets is not saved.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Text(mut text) => text.out.flush().map_err(write_error),
            Self::Spreadsheet(book) => book.save(),
        }
    }

    /// Returns the workbook path for spreadsheet sinks.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Text(_) => None,
            Self::Spreadsheet(book) => Some(book.path()),
        }
    }
}

/// A text stream that remembers whether anything was written.
pub struct TextSink {
    out: Box<dyn Write>,
    written: bool,
}

impl TextSink {
    /// Returns the writer. Any write through it marks the sink as used.
    pub fn writer(&mut self) -> &mut dyn Write {
        self
    }
}

impl Write for TextSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.out.write(buf)?;
        if n > 0 {
            self.written = true;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn write_error(e: io::Error) -> SqlrunError {
    SqlrunError::sink(e.to_string())
}
