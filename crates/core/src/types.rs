//! Domain types for opened presentations and extraction results.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// An opened presentation: slides in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Original filename (without path).
    pub filename: String,

    /// Detected format of the source file.
    pub format: PresentationFormat,

    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Document {
    /// Create a new document with the given filename and format.
    pub fn new(filename: impl Into<String>, format: PresentationFormat) -> Self {
        Self {
            filename: filename.into(),
            format,
            slides: Vec::new(),
        }
    }

    /// Add a slide to the document.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Look up a slide by a zero-based index that may be negative or too large.
    pub fn slide(&self, index: i64) -> Option<&Slide> {
        usize::try_from(index).ok().and_then(|i| self.slides.get(i))
    }
}

/// The format of the source presentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary).
    Ppt,
}

impl PresentationFormat {
    /// File extensions (lowercase) recognised as presentations.
    pub const EXTENSIONS: [&'static str; 2] = ["pptx", "ppt"];

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }
}

/// A single slide and its shapes in native traversal order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slide {
    pub shapes: Vec<Shape>,
}

impl Slide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}

/// A positioned element on a slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shape {
    /// Shape name as stored in the file (may be empty).
    pub name: String,

    /// Text frame content. `None` for shapes that cannot hold text.
    pub text: Option<String>,

    /// Position and size in inches. `None` if the file does not say.
    pub bounds: Option<Rect>,
}

impl Shape {
    /// A shape with a text frame.
    pub fn text_box(name: impl Into<String>, text: impl Into<String>, bounds: Option<Rect>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            bounds,
        }
    }

    /// A shape without a text frame (picture, group, table, connector).
    pub fn graphic(name: impl Into<String>, bounds: Option<Rect>) -> Self {
        Self {
            name: name.into(),
            text: None,
            bounds,
        }
    }

    /// A candidate carries a non-blank text payload.
    pub fn is_candidate(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Cleaned texts found on one requested slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideTexts {
    /// 1-based slide number.
    pub number: usize,

    /// Accepted texts in shape traversal order.
    pub texts: Vec<String>,
}

/// Per-document extraction output.
///
/// Holds an entry for every valid requested slide (possibly with no texts)
/// and no entry for out-of-range indices, which are listed in `skipped`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub slides: Vec<SlideTexts>,

    /// Requested zero-based indices that had no slide.
    pub skipped: Vec<i64>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the texts for a slide. A repeated slide number keeps its
    /// original position but takes the new texts.
    pub fn insert(&mut self, number: usize, texts: Vec<String>) {
        match self.slides.iter_mut().find(|s| s.number == number) {
            Some(existing) => existing.texts = texts,
            None => self.slides.push(SlideTexts { number, texts }),
        }
    }

    /// Texts for a 1-based slide number, if that slide was extracted.
    pub fn get(&self, number: usize) -> Option<&[String]> {
        self.slides
            .iter()
            .find(|s| s.number == number)
            .map(|s| s.texts.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Total number of accepted texts across all slides.
    pub fn text_count(&self) -> usize {
        self.slides.iter().map(|s| s.texts.len()).sum()
    }
}
