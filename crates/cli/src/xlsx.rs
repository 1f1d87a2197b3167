//! Excel report output.

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use slidescript_core::report::Cell;
use slidescript_core::{Error, Report, ReportWriter, Result};
use std::path::Path;

/// Longest string Excel accepts in a cell, in characters.
const MAX_CELL_CHARS: usize = 32_767;

/// Writes reports as single-sheet `.xlsx` workbooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxReportWriter;

impl XlsxReportWriter {
    pub fn new() -> Self {
        Self
    }

    fn fill(worksheet: &mut Worksheet, report: &Report) -> std::result::Result<(), XlsxError> {
        let bold = Format::new().set_bold();

        worksheet.set_name(&report.sheet_name)?;
        worksheet.set_column_width(0, 14)?;
        worksheet.set_column_width(1, 60)?;

        for (col, title) in report.header.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, title, &bold)?;
        }

        for (i, row) in report.rows.iter().enumerate() {
            let r = i as u32 + 1;
            match &row.key {
                Cell::Slide(number) => worksheet.write_number(r, 0, *number as f64)?,
                Cell::Label(label) => worksheet.write_string(r, 0, label)?,
            };
            worksheet.write_string(r, 1, cell_text(&row.text, r))?;
        }

        Ok(())
    }
}

/// Cut text that would not fit in a cell.
fn cell_text(text: &str, row: u32) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            log::warn!(
                "row {}: text of {} chars truncated to {}",
                row,
                text.chars().count(),
                MAX_CELL_CHARS
            );
            &text[..end]
        }
        None => text,
    }
}

impl ReportWriter for XlsxReportWriter {
    fn extension(&self) -> &str {
        "xlsx"
    }

    fn write(&self, report: &Report, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        Self::fill(worksheet, report)
            .map_err(|e| Error::Report(format!("Failed to build worksheet: {}", e)))?;
        workbook
            .save(path)
            .map_err(|e| Error::Report(format!("Failed to save '{}': {}", path.display(), e)))?;

        log::debug!("wrote {} rows to '{}'", report.rows.len(), path.display());
        Ok(())
    }
}
