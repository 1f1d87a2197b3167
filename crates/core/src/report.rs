//! Tabular report assembly.
//!
//! A report is a header row followed by two-column data rows. The builder is
//! an explicit value owned by the per-document processing step, so rows added
//! before a failure are still available for the error report.

use crate::types::ExtractionResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Worksheet title.
pub const SHEET_NAME: &str = "Extracted Texts";

/// Column headers: slide number, extracted text.
pub const HEADER: [&str; 2] = ["슬라이드 번호", "추출된 텍스트"];

/// Text cell for a valid slide that had no text in the region.
pub const NO_TEXT: &str = "텍스트 없음";

/// Label/message for a document where no requested slide existed.
pub const INFO_LABEL: &str = "정보";
pub const NO_SLIDES_MESSAGE: &str = "지정된 슬라이드에 텍스트를 찾을 수 없음";

/// Label/message for a document that could not be opened.
pub const ERROR_LABEL: &str = "오류";
pub const OPEN_FAILED_MESSAGE: &str = "PPT 파일을 열 수 없음 (손상 또는 형식 문제)";

/// Label for an unexpected failure while processing a document.
pub const PROCESSING_ERROR_LABEL: &str = "처리 오류";

/// Suffix added to the report name when processing failed.
pub const ERROR_SUFFIX: &str = "_ERROR";

/// First column of a data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// 1-based slide number.
    Slide(usize),
    /// A marker such as "오류".
    Label(String),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Slide(n) => write!(f, "{}", n),
            Cell::Label(s) => f.write_str(s),
        }
    }
}

/// One data row of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: Cell,
    pub text: String,
}

impl Row {
    pub fn slide(number: usize, text: impl Into<String>) -> Self {
        Self {
            key: Cell::Slide(number),
            text: text.into(),
        }
    }

    pub fn label(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: Cell::Label(label.into()),
            text: text.into(),
        }
    }
}

/// A finished report ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub sheet_name: String,
    pub header: [String; 2],
    pub rows: Vec<Row>,
}

/// Accumulates rows for one document's report.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    rows: Vec<Row>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append rows for an extraction result: one row per text, a "no text"
    /// row for an empty slide, or a single info row if no slide was valid.
    pub fn push_result(&mut self, result: &ExtractionResult) {
        if result.is_empty() {
            self.push(Row::label(INFO_LABEL, NO_SLIDES_MESSAGE));
            return;
        }

        for slide in &result.slides {
            if slide.texts.is_empty() {
                self.push(Row::slide(slide.number, NO_TEXT));
            } else {
                for text in &slide.texts {
                    self.push(Row::slide(slide.number, text.clone()));
                }
            }
        }
    }

    /// Append the row recorded when a document cannot be opened.
    pub fn push_open_error(&mut self) {
        self.push(Row::label(ERROR_LABEL, OPEN_FAILED_MESSAGE));
    }

    /// Append the row recorded when processing failed unexpectedly.
    pub fn push_processing_error(&mut self, message: &str) {
        self.push(Row::label(
            PROCESSING_ERROR_LABEL,
            format!("처리 중 오류 발생: {}", message),
        ));
    }

    /// Finish the report with the standard sheet name and header.
    pub fn build(&self) -> Report {
        Report {
            sheet_name: SHEET_NAME.to_string(),
            header: HEADER.map(str::to_string),
            rows: self.rows.clone(),
        }
    }
}

/// Persists reports in some tabular file format.
pub trait ReportWriter {
    /// File extension for written reports, without the dot.
    fn extension(&self) -> &str;

    /// Write `report` to `path`, replacing any existing file.
    fn write(&self, report: &Report, path: &Path) -> crate::Result<()>;
}
