//! PPTX (Office Open XML) reader for slide script extraction.
//!
//! Parses .pptx files which are ZIP archives containing XML documents, and
//! returns every slide's top-level shapes with text and bounds in inches.

pub mod parser;
mod shapes;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixture;

pub use parser::PptxParser;
