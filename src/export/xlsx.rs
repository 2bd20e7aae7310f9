//! MS Excel workbooks.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{
    DocProperties, ExcelDateTime, Format, Workbook as XlsxWorkbook, Worksheet, XlsxError,
};
use tracing::debug;

use crate::error::{Result, SqlrunError};
use crate::model::{ColumnType, ResultSet, Value};

const FONT: &str = "Hack";

/// A workbook receiving one worksheet per result set.
pub struct Workbook {
    path: PathBuf,
    book: XlsxWorkbook,
    sheets: usize,
    rows: usize,
}

impl Workbook {
    pub(super) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            book: XlsxWorkbook::new(),
            sheets: 0,
            rows: 0,
        }
    }

    /// Returns the file the workbook is saved to.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Adds `rs` as a new worksheet.
    pub fn add_result(&mut self, rs: &ResultSet) -> Result<()> {
        let sheet = self.book.add_worksheet();
        write_sheet(sheet, rs).map_err(xlsx_error)?;
        self.sheets += 1;
        self.rows += rs.row_count();
        Ok(())
    }

    /// Returns the number of data rows written across all sheets.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Saves the workbook if at least one sheet was written.
    pub(super) fn save(mut self) -> Result<()> {
        if self.sheets == 0 {
            debug!(path = %self.path.display(), "No result sets; workbook not saved");
            return Ok(());
        }

        // fixed, like the zip entry timestamps
        let created = ExcelDateTime::from_ymd(1980, 1, 1).map_err(xlsx_error)?;
        self.book
            .set_properties(&DocProperties::new().set_creation_datetime(&created));

        self.book.save(&self.path).map_err(|e| {
            SqlrunError::sink(format!("cannot save '{}': {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), sheets = self.sheets, rows = self.rows, "Saved workbook");
        Ok(())
    }
}

fn xlsx_error(e: XlsxError) -> SqlrunError {
    SqlrunError::sink(e.to_string())
}

/// Number format for a column type, if it has one.
fn number_format(column_type: ColumnType) -> Option<&'static str> {
    match column_type {
        ColumnType::Integer => Some("#,##0"),
        ColumnType::Float | ColumnType::Decimal { .. } => Some("#,##0.00"),
        ColumnType::Timestamp | ColumnType::TimestampTz => Some("yyyy-mm-dd hh:mm:ss"),
        ColumnType::Date => Some("yyyy-mm-dd"),
        ColumnType::Time => Some("hh:mm:ss"),
        _ => None,
    }
}

fn write_sheet(sheet: &mut Worksheet, rs: &ResultSet) -> std::result::Result<(), XlsxError> {
    let header = Format::new().set_bold().set_font_name(FONT);
    let formats: Vec<Format> = rs
        .columns
        .iter()
        .map(|c| {
            let format = Format::new().set_font_name(FONT);
            match number_format(c.column_type) {
                Some(num) => format.set_num_format(num),
                None => format,
            }
        })
        .collect();

    for (col, meta) in rs.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, meta.name.as_str(), &header)?;
    }

    for (r, row) in rs.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, (value, format)) in row.iter().zip(&formats).enumerate() {
            write_cell(sheet, r, c as u16, value, format)?;
        }
    }

    if !rs.columns.is_empty() {
        sheet.set_freeze_panes(1, 0)?;
        sheet.autofilter(0, 0, 0, (rs.columns.len() - 1) as u16)?;
    }

    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: &Format,
) -> std::result::Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean_with_format(row, col, *b, format)?;
        }
        Value::Int(i) => {
            sheet.write_number_with_format(row, col, *i as f64, format)?;
        }
        Value::Float(f) => {
            sheet.write_number_with_format(row, col, *f, format)?;
        }
        Value::Decimal(d) => match d.to_f64() {
            Some(f) => {
                sheet.write_number_with_format(row, col, f, format)?;
            }
            None => {
                sheet.write_string_with_format(row, col, d.to_string(), format)?;
            }
        },
        Value::Date(_) | Value::Time(_) | Value::Timestamp(_) | Value::TimestampTz(_) => {
            match excel_datetime(value) {
                Some(dt) => sheet.write_datetime_with_format(row, col, &dt, format)?,
                None => sheet.write_string_with_format(row, col, value.to_text(), format)?,
            };
        }
        other => {
            sheet.write_string_with_format(row, col, other.to_text(), format)?;
        }
    }
    Ok(())
}

/// Converts a temporal value to an Excel date, or `None` when Excel cannot
/// represent it (years before 1900).
fn excel_datetime(value: &Value) -> Option<ExcelDateTime> {
    match value {
        Value::Date(d) => excel_date(*d),
        Value::Time(t) => {
            ExcelDateTime::from_hms(t.hour() as u16, t.minute() as u8, seconds(*t)).ok()
        }
        Value::Timestamp(ts) => excel_timestamp(*ts),
        Value::TimestampTz(ts) => excel_timestamp(ts.naive_utc()),
        _ => None,
    }
}

fn excel_date(date: NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok()?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

fn excel_timestamp(ts: NaiveDateTime) -> Option<ExcelDateTime> {
    let time = ts.time();
    excel_date(ts.date())?
        .and_hms(time.hour() as u16, time.minute() as u8, seconds(time))
        .ok()
}

fn seconds(time: NaiveTime) -> f64 {
    time.second() as f64 + time.nanosecond() as f64 / 1e9
}
