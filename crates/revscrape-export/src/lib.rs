//! Spreadsheet export for collected reviews.
//!
//! One worksheet, a bold header row, one row per matching review. The column
//! layout depends on the platform the reviews came from.

mod path;

use std::path::{Path, PathBuf};

use revscrape_core::{CollectionResult, Platform, ReviewMatch};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use path::write_new;

const SHEET_NAME: &str = "Reviews";

const TRUSTPILOT_COLUMNS: [&str; 5] = ["Review", "Rating", "Keyword", "Date", "Link to Review"];
const GOOGLE_COLUMNS: [&str; 7] = [
    "Platform", "Reviewer", "Review", "Rating", "Date", "Link", "Keywords",
];

/// Placeholder for the Trustpilot keyword column when nothing matched.
const NO_KEYWORDS: &str = "N/A";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no reviews to export")]
    Empty,

    #[error("spreadsheet serialization failed: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// File name used when the caller does not pick one.
#[must_use]
pub fn default_file_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Trustpilot => "trustpilot_reviews.xlsx",
        Platform::Google => "google_reviews.xlsx",
    }
}

/// Writes `result` as an `.xlsx` file under `dir` and returns its path.
///
/// `base_name` is the preferred file name; if it is taken, `stem (n).ext` is
/// used instead. Existing files are never replaced. `dir` is created if
/// missing.
///
/// # Errors
///
/// - [`ExportError::Empty`] if `result` has no records.
/// - [`ExportError::Xlsx`] if the workbook cannot be serialized.
/// - [`ExportError::Io`] if the directory or file cannot be written.
pub fn export_xlsx(
    result: &CollectionResult,
    dir: &Path,
    base_name: &str,
) -> Result<PathBuf, ExportError> {
    if result.is_empty() {
        return Err(ExportError::Empty);
    }

    let bytes = render_workbook(result.platform(), result.matches())?;
    std::fs::create_dir_all(dir)?;
    let path = write_new(dir, base_name, &bytes)?;

    tracing::info!(
        path = %path.display(),
        platform = result.platform().as_str(),
        rows = result.len(),
        "exported reviews"
    );
    Ok(path)
}

/// One spreadsheet cell. Absent values are `None` in a [`rows`] table and
/// stay empty in the workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

/// Serializes the rows to an in-memory `.xlsx` document.
///
/// # Errors
///
/// Returns [`XlsxError`] if any cell write or the final serialization fails.
pub fn render_workbook(
    platform: Platform,
    matches: &[ReviewMatch],
) -> Result<Vec<u8>, XlsxError> {
    let (columns, cells) = rows(platform, matches);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (col, title) in (0u16..).zip(columns) {
        sheet.write_string_with_format(0, col, *title, &header)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (row, values) in (1u32..).zip(&cells) {
        for (col, value) in (0u16..).zip(values) {
            write_cell(sheet, row, col, value.as_ref())?;
        }
    }

    widen_columns(sheet, platform)?;
    workbook.save_to_buffer()
}

/// The header and cell values the workbook for `platform` is built from, in
/// input order.
#[must_use]
pub fn rows(
    platform: Platform,
    matches: &[ReviewMatch],
) -> (&'static [&'static str], Vec<Vec<Option<CellValue>>>) {
    let (header, row): (&'static [&'static str], fn(&ReviewMatch) -> Vec<Option<CellValue>>) =
        match platform {
            Platform::Trustpilot => (&TRUSTPILOT_COLUMNS, trustpilot_row),
            Platform::Google => (&GOOGLE_COLUMNS, google_row),
        };
    (header, matches.iter().map(row).collect())
}

fn trustpilot_row(review: &ReviewMatch) -> Vec<Option<CellValue>> {
    let record = &review.record;
    let keywords = if review.matched_keywords.is_empty() {
        NO_KEYWORDS.to_owned()
    } else {
        review.matched_keywords.join(", ")
    };

    vec![
        text(&record.text),
        rating(record.rating),
        Some(CellValue::Text(keywords)),
        text(&record.date),
        record.source_link.as_deref().and_then(text),
    ]
}

fn google_row(review: &ReviewMatch) -> Vec<Option<CellValue>> {
    let record = &review.record;
    vec![
        Some(CellValue::Text(record.platform.to_string())),
        text(&record.reviewer_name),
        text(&record.text),
        rating(record.rating),
        text(&record.date),
        record.source_link.as_deref().and_then(text),
        text(&review.matched_keywords.join(", ")),
    ]
}

fn text(value: &str) -> Option<CellValue> {
    (!value.is_empty()).then(|| CellValue::Text(value.to_owned()))
}

fn rating(value: Option<u8>) -> Option<CellValue> {
    value.map(|r| CellValue::Number(f64::from(r)))
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<&CellValue>,
) -> Result<(), XlsxError> {
    match value {
        Some(CellValue::Text(value)) => {
            sheet.write_string(row, col, value)?;
        }
        Some(CellValue::Number(number)) => {
            sheet.write_number(row, col, *number)?;
        }
        None => {}
    }
    Ok(())
}

fn widen_columns(sheet: &mut Worksheet, platform: Platform) -> Result<(), XlsxError> {
    let review_col = match platform {
        Platform::Trustpilot => 0,
        Platform::Google => 2,
    };
    sheet.set_column_width(review_col, 80)?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
