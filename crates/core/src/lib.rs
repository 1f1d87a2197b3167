//! Core domain types, region extraction, text normalization and report
//! assembly for slide script extraction.

pub mod batch;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod normalize;
pub mod report;
pub mod types;

pub use batch::{discover_documents, BatchError, BatchRunner, BatchSummary, DocumentOutcome};
pub use error::{Error, Result};
pub use extract::{DocumentReader, ExtractError, RegionExtractor};
pub use geometry::Rect;
pub use normalize::{Rule, TextNormalizer};
pub use report::{Report, ReportBuilder, ReportWriter, Row};
pub use types::{Document, ExtractionResult, PresentationFormat, Shape, Slide, SlideTexts};
