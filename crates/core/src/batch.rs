//! Batch processing: find documents in a directory and write one report each.
//!
//! Documents are processed one at a time. A failure in one document only
//! affects that document's report.

use crate::extract::{DocumentReader, ExtractError, RegionExtractor};
use crate::report::{ReportBuilder, ReportWriter, ERROR_SUFFIX};
use crate::types::PresentationFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures that end the whole run.
#[derive(Error, Debug)]
pub enum BatchError {
    /// No presentation files in the scanned directory.
    #[error("no .pptx or .ppt files found in '{}'", .0.display())]
    NoInputFiles(PathBuf),

    /// The directory could not be listed.
    #[error("failed to scan '{}': {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// List presentation files directly inside `dir`, sorted by file name.
///
/// Matches `.pptx` and `.ppt` in any letter case. Subdirectories are not
/// searched.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let to_err = |source: std::io::Error| BatchError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(to_err)? {
        let path = entry.map_err(to_err)?.path();
        if !path.is_file() {
            continue;
        }
        let is_presentation = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(PresentationFormat::from_extension)
            .is_some();
        if is_presentation {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(BatchError::NoInputFiles(dir.to_path_buf()));
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Report written under its normal name. This includes documents that
    /// could not be opened, whose report holds a single error row.
    Written { report: PathBuf, open_failed: bool },

    /// Processing failed; the partial report was written with the error suffix.
    ErrorReport { report: PathBuf, error: String },

    /// Processing failed and the error report could not be written either.
    Unsaved { error: String, save_error: String },
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub documents: usize,
    pub written: usize,
    pub open_failures: usize,
    pub error_reports: usize,
    pub unsaved: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &DocumentOutcome) {
        self.documents += 1;
        match outcome {
            DocumentOutcome::Written { open_failed, .. } => {
                self.written += 1;
                if *open_failed {
                    self.open_failures += 1;
                }
            }
            DocumentOutcome::ErrorReport { .. } => self.error_reports += 1,
            DocumentOutcome::Unsaved { .. } => self.unsaved += 1,
        }
    }
}

/// Runs extraction over many documents and writes their reports.
pub struct BatchRunner<'a> {
    extractor: &'a RegionExtractor,
    reader: &'a dyn DocumentReader,
    writer: &'a dyn ReportWriter,
    output_dir: PathBuf,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        extractor: &'a RegionExtractor,
        reader: &'a dyn DocumentReader,
        writer: &'a dyn ReportWriter,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            reader,
            writer,
            output_dir: output_dir.into(),
        }
    }

    /// Report path for `input`: its base name with the writer's extension.
    pub fn report_path(&self, input: &Path, failed: bool) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let suffix = if failed { ERROR_SUFFIX } else { "" };
        self.output_dir
            .join(format!("{}{}.{}", stem, suffix, self.writer.extension()))
    }

    /// Process every file in order and return the totals.
    pub fn run(&self, files: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for path in files {
            let name = display_name(path);
            log::info!("===== processing '{}' =====", name);

            let outcome = self.process(path);
            match &outcome {
                DocumentOutcome::Written { report, .. } => {
                    log::info!("saved '{}'", report.display());
                }
                DocumentOutcome::ErrorReport { report, error } => {
                    log::error!("'{}' failed: {}", name, error);
                    log::error!("partial report with error details saved to '{}'", report.display());
                }
                DocumentOutcome::Unsaved { error, save_error } => {
                    log::error!("'{}' failed: {}", name, error);
                    log::error!(
                        "could not save the error report either: {} (is the report open in another program?)",
                        save_error
                    );
                }
            }
            summary.record(&outcome);

            log::info!("===== finished '{}' =====", name);
        }

        summary
    }

    /// Process one document with a fresh report.
    pub fn process(&self, path: &Path) -> DocumentOutcome {
        let (mut report, result) = self.process_document(path, ReportBuilder::new());

        let error = match result {
            Ok(outcome) => return outcome,
            Err(e) => e,
        };

        report.push_processing_error(&error);
        let error_path = self.report_path(path, true);
        match self.writer.write(&report.build(), &error_path) {
            Ok(()) => DocumentOutcome::ErrorReport {
                report: error_path,
                error,
            },
            Err(save_error) => DocumentOutcome::Unsaved {
                error,
                save_error: save_error.to_string(),
            },
        }
    }

    /// Extract one document into `report` and save it under its normal name.
    ///
    /// The builder is always handed back so the caller can add an error row
    /// to whatever was collected before a failure.
    pub fn process_document(
        &self,
        path: &Path,
        mut report: ReportBuilder,
    ) -> (ReportBuilder, Result<DocumentOutcome, String>) {
        let mut open_failed = false;

        match self.extractor.extract(self.reader, path) {
            Ok(result) => {
                for slide in &result.slides {
                    log::info!(
                        "slide {}: {} text(s) in region",
                        slide.number,
                        slide.texts.len()
                    );
                }
                log::info!(
                    "{} text(s) from {} slide(s)",
                    result.text_count(),
                    result.slides.len()
                );
                report.push_result(&result);
            }
            Err(ExtractError::Open(e)) => {
                log::error!("cannot open '{}': {}", display_name(path), e);
                report.push_open_error();
                open_failed = true;
            }
            Err(e) => return (report, Err(e.to_string())),
        }

        let report_path = self.report_path(path, false);
        if let Err(e) = self.writer.write(&report.build(), &report_path) {
            return (report, Err(e.to_string()));
        }

        (
            report,
            Ok(DocumentOutcome::Written {
                report: report_path,
                open_failed,
            }),
        )
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
