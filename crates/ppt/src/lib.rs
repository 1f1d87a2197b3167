//! Legacy PPT (OLE/CFB) reader for slide script extraction.
//!
//! Parses .ppt files which use the Microsoft Compound File Binary (CFB) format,
//! keeping each top-level shape's anchor so text can be filtered by region.

pub mod parser;

pub use parser::PptParser;
