//! Opens presentation files with the parser matching their format.

use slidescript_core::{Document, DocumentReader, Error, PresentationFormat, Result};
use slidescript_ppt::PptParser;
use slidescript_pptx::PptxParser;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Reads `.pptx` and `.ppt` files, detecting the format from the file header.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatReader;

impl FormatReader {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentReader for FormatReader {
    fn open(&self, path: &Path) -> Result<Document> {
        let mut file = File::open(path)?;

        // Read magic bytes to detect format
        let mut magic = [0u8; 8];
        let read = file.read(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;

        let format = detect_format(&magic[..read], path).ok_or_else(|| {
            Error::UnsupportedFormat(format!("Could not detect format of '{}'", path.display()))
        })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        let reader = BufReader::new(file);

        match format {
            PresentationFormat::Pptx => {
                log::debug!("Parsing '{}' as PPTX", filename);
                PptxParser::new().parse(reader, filename)
            }
            PresentationFormat::Ppt => {
                log::debug!("Parsing '{}' as legacy PPT", filename);
                PptParser::new().parse(reader, filename)
            }
        }
    }
}

/// Magic bytes first, then the file extension.
fn detect_format(magic: &[u8], path: &Path) -> Option<PresentationFormat> {
    PresentationFormat::from_magic(magic).or_else(|| {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(PresentationFormat::from_extension)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidescript_pptx::fixture::{DeckBuilder, ShapeXml};

    #[test]
    fn test_detect_format_prefers_magic() {
        let zip_magic = [0x50, 0x4B, 0x03, 0x04, 0, 0, 0, 0];
        assert_eq!(
            detect_format(&zip_magic, Path::new("renamed.ppt")),
            Some(PresentationFormat::Pptx)
        );
        assert_eq!(
            detect_format(b"junk", Path::new("deck.PPT")),
            Some(PresentationFormat::Ppt)
        );
        assert_eq!(detect_format(b"junk", Path::new("notes.txt")), None);
    }

    #[test]
    fn test_open_pptx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lesson.pptx");
        let bytes = DeckBuilder::new()
            .slide(vec![ShapeXml::text_box("TextBox 1", &["대사"], (0.0, 6.0, 2.0, 0.5))])
            .build();
        std::fs::write(&path, bytes).unwrap();

        let doc = FormatReader::new().open(&path).unwrap();
        assert_eq!(doc.filename, "lesson.pptx");
        assert_eq!(doc.format, PresentationFormat::Pptx);
        assert_eq!(doc.slide_count(), 1);
    }

    #[test]
    fn test_open_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pptx");
        std::fs::write(&path, b"not really a presentation").unwrap();

        assert!(FormatReader::new().open(&path).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let result = FormatReader::new().open(Path::new("/nonexistent/deck.pptx"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
