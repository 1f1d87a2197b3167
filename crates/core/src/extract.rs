//! Region extraction: collect cleaned text from shapes overlapping a
//! fixed rectangle on selected slides.

use crate::geometry::Rect;
use crate::normalize::TextNormalizer;
use crate::types::{Document, ExtractionResult};
use std::path::Path;
use thiserror::Error;

/// Opens presentation files.
pub trait DocumentReader {
    /// Open and parse the document at `path`.
    fn open(&self, path: &Path) -> crate::Result<Document>;
}

/// Why extraction of one document failed.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The document could not be opened or parsed.
    #[error("failed to open document: {0}")]
    Open(#[source] crate::Error),

    /// A text shape has no position, so it cannot be tested against the region.
    #[error("slide {slide_number}: shape '{shape}' has text but no position")]
    MissingBounds { slide_number: usize, shape: String },
}

/// Extracts text from shapes that overlap a region on a fixed set of slides.
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    slide_indices: Vec<i64>,
    region: Rect,
    normalizer: TextNormalizer,
}

impl RegionExtractor {
    /// Create an extractor for zero-based `slide_indices` and a region in inches.
    pub fn new(slide_indices: Vec<i64>, region: Rect) -> Self {
        Self {
            slide_indices,
            region,
            normalizer: TextNormalizer::new(),
        }
    }

    /// Use a custom normalization chain.
    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn slide_indices(&self) -> &[i64] {
        &self.slide_indices
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    /// Open the document at `path` and extract from it.
    ///
    /// An open failure is reported as [`ExtractError::Open`] and is distinct
    /// from a successful extraction that found nothing.
    pub fn extract(
        &self,
        reader: &dyn DocumentReader,
        path: &Path,
    ) -> Result<ExtractionResult, ExtractError> {
        let document = reader.open(path).map_err(ExtractError::Open)?;
        self.extract_document(&document)
    }

    /// Extract from an already opened document.
    pub fn extract_document(&self, document: &Document) -> Result<ExtractionResult, ExtractError> {
        let mut result = ExtractionResult::new();

        for &index in &self.slide_indices {
            let Some(slide) = document.slide(index) else {
                log::warn!(
                    "'{}': slide index {} is out of range ({} slides), skipping",
                    document.filename,
                    index,
                    document.slide_count()
                );
                result.skipped.push(index);
                continue;
            };

            // In range, so index >= 0
            let slide_number = index as usize + 1;
            let mut texts = Vec::new();

            for shape in slide.shapes.iter().filter(|s| s.is_candidate()) {
                let bounds = shape.bounds.ok_or_else(|| ExtractError::MissingBounds {
                    slide_number,
                    shape: shape.name.clone(),
                })?;

                if !self.region.overlaps(&bounds) {
                    continue;
                }

                let raw = shape.text.as_deref().unwrap_or_default().trim();
                let cleaned = self.normalizer.normalize(raw);
                if cleaned.is_empty() {
                    continue;
                }

                log::debug!(
                    "  found: '{}' (original: '{}', bounds: {})",
                    cleaned,
                    raw,
                    bounds
                );
                texts.push(cleaned);
            }

            result.insert(slide_number, texts);
        }

        Ok(result)
    }
}
