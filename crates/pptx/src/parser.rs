//! PPTX file parser implementation.

use crate::shapes::{attr, local_name, parse_shape_tree, Geometry, RawShape};
use quick_xml::events::Event;
use quick_xml::Reader;
use slidescript_core::{Document, Error, PresentationFormat, Result, Shape, Slide};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::rc::Rc;
use zip::result::ZipError;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

const REL_SLIDE: &str = "/slide";
const REL_SLIDE_LAYOUT: &str = "/slideLayout";
const REL_SLIDE_MASTER: &str = "/slideMaster";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Document> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;
        let mut package = Package::new(archive);

        let mut document = Document::new(filename, PresentationFormat::Pptx);

        for slide_path in package.slide_order()? {
            let slide = package.parse_slide(&slide_path)?;
            document.add_slide(slide);
        }

        log::debug!("'{}': {} slides", filename, document.slide_count());
        Ok(document)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A package relationship with its target resolved to a part name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Layout placeholder geometry by `idx`, already merged with the master.
type LayoutPlaceholders = Rc<HashMap<u32, Geometry>>;

/// Master placeholder geometry by base type.
type MasterPlaceholders = Rc<HashMap<String, Geometry>>;

/// An open package plus the layout and master data read so far.
struct Package<R> {
    archive: ZipArchive<R>,
    layouts: HashMap<String, LayoutPlaceholders>,
    masters: HashMap<String, MasterPlaceholders>,
}

impl<R: Read + Seek> Package<R> {
    fn new(archive: ZipArchive<R>) -> Self {
        Self {
            archive,
            layouts: HashMap::new(),
            masters: HashMap::new(),
        }
    }

    /// Slide part names in presentation order.
    ///
    /// Uses `p:sldIdLst` from presentation.xml. Packages without one fall
    /// back to the numbering in the relationship ids/targets.
    fn slide_order(&mut self) -> Result<Vec<String>> {
        let rels = self.relationships(PRESENTATION_PART)?.ok_or_else(|| {
            Error::PptxParseError("Missing ppt/_rels/presentation.xml.rels".to_string())
        })?;

        let presentation = self.read_part(PRESENTATION_PART)?;
        let slide_ids = parse_slide_id_list(&presentation)?;

        if !slide_ids.is_empty() {
            let mut order = Vec::with_capacity(slide_ids.len());
            for id in slide_ids {
                match rels.iter().find(|r| r.id == id) {
                    Some(rel) => order.push(rel.target.clone()),
                    None => log::warn!("Slide relationship '{}' not found, skipping", id),
                }
            }
            return Ok(order);
        }

        let mut slides: Vec<(String, Option<usize>)> = rels
            .into_iter()
            .filter(|r| r.rel_type.ends_with(REL_SLIDE))
            .map(|r| {
                let order_num = extract_slide_number(&r.id).or_else(|| extract_slide_number(&r.target));
                (r.target, order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a slide part into shapes with bounds in inches.
    fn parse_slide(&mut self, slide_path: &str) -> Result<Slide> {
        let content = self.read_part(slide_path)?;
        let raw_shapes = parse_shape_tree(&content)?;

        let needs_layout = raw_shapes
            .iter()
            .any(|s| s.placeholder.is_some() && !s.geometry.is_complete());
        let layout = if needs_layout {
            self.layout_for_slide(slide_path)?
        } else {
            None
        };

        let mut slide = Slide::new();
        for raw in raw_shapes {
            let geometry = match (&raw.placeholder, &layout) {
                (Some(ph), Some(layout)) => raw
                    .geometry
                    .or(layout.get(&ph.idx).copied().unwrap_or_default()),
                _ => raw.geometry,
            };
            slide.add_shape(Shape {
                name: raw.name,
                text: raw.text,
                bounds: geometry.to_rect(),
            });
        }

        Ok(slide)
    }

    /// Placeholder geometry of the layout a slide uses.
    fn layout_for_slide(&mut self, slide_path: &str) -> Result<Option<LayoutPlaceholders>> {
        let layout_path = match self.related_part(slide_path, REL_SLIDE_LAYOUT)? {
            Some(path) => path,
            None => {
                log::warn!("'{}' has no slide layout relationship", slide_path);
                return Ok(None);
            }
        };

        if let Some(cached) = self.layouts.get(&layout_path) {
            return Ok(Some(Rc::clone(cached)));
        }

        let shapes = parse_shape_tree(&self.read_part(&layout_path)?)?;
        let master = match self.related_part(&layout_path, REL_SLIDE_MASTER)? {
            Some(master_path) => Some(self.master(&master_path)?),
            None => None,
        };

        let mut placeholders = HashMap::new();
        for shape in shapes {
            let Some(ph) = shape.placeholder else { continue };
            let base = master
                .as_ref()
                .and_then(|m| m.get(ph.base_kind()).copied())
                .unwrap_or_default();
            placeholders.entry(ph.idx).or_insert(shape.geometry.or(base));
        }

        let placeholders = Rc::new(placeholders);
        self.layouts.insert(layout_path, Rc::clone(&placeholders));
        Ok(Some(placeholders))
    }

    /// Placeholder geometry of a slide master, keyed by placeholder type.
    fn master(&mut self, master_path: &str) -> Result<MasterPlaceholders> {
        if let Some(cached) = self.masters.get(master_path) {
            return Ok(Rc::clone(cached));
        }

        let shapes = parse_shape_tree(&self.read_part(master_path)?)?;
        let mut placeholders = HashMap::new();
        for RawShape {
            placeholder,
            geometry,
            ..
        } in shapes
        {
            if let Some(ph) = placeholder {
                placeholders.entry(ph.kind).or_insert(geometry);
            }
        }

        let placeholders = Rc::new(placeholders);
        self.masters
            .insert(master_path.to_string(), Rc::clone(&placeholders));
        Ok(placeholders)
    }

    /// First related part of the given relationship type.
    fn related_part(&mut self, part: &str, rel_type: &str) -> Result<Option<String>> {
        Ok(self
            .relationships(part)?
            .and_then(|rels| rels.into_iter().find(|r| r.rel_type.ends_with(rel_type)))
            .map(|r| r.target))
    }

    /// Relationships of a part, or `None` if it has no rels part.
    fn relationships(&mut self, part: &str) -> Result<Option<Vec<Relationship>>> {
        let rels_path = rels_path_for(part);
        match self.read_optional_part(&rels_path)? {
            Some(content) => Ok(Some(parse_relationships(&content, part_dir(part))?)),
            None => Ok(None),
        }
    }

    /// Read a file from the ZIP archive.
    fn read_part(&mut self, path: &str) -> Result<String> {
        self.read_optional_part(path)?.ok_or_else(|| {
            Error::ZipError(format!("File not found in archive '{}'", path))
        })
    }

    fn read_optional_part(&mut self, path: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(Error::ZipError(format!("Failed to open '{}': {}", path, e)));
            }
        };

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(Some(content))
    }
}

/// Parse a relationships part, resolving targets against `base_dir`.
fn parse_relationships(xml: &str, base_dir: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                // External targets (hyperlinks) are not package parts
                if attr(e, b"TargetMode").as_deref() == Some("External") {
                    continue;
                }
                let id = attr(e, b"Id").unwrap_or_default();
                let rel_type = attr(e, b"Type").unwrap_or_default();
                let target = attr(e, b"Target").unwrap_or_default();
                rels.push(Relationship {
                    id,
                    rel_type,
                    target: resolve_target(base_dir, &target),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationship ids listed in `p:sldIdLst`, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                // The prefixed `r:id`, not the numeric `id`
                let rel_id = e.attributes().flatten().find(|a| {
                    let key = a.key.as_ref();
                    key != b"id" && local_name(key) == b"id"
                });
                if let Some(value) = rel_id.and_then(|a| a.unescape_value().ok()) {
                    ids.push(value.into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Directory of a part name (`ppt/slides/slide1.xml` -> `ppt/slides`).
fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target relative to the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{inches, DeckBuilder, ShapeXml};
    use slidescript_core::Rect;
    use std::io::Cursor;

    fn parse(bytes: Vec<u8>) -> Result<Document> {
        PptxParser::new().parse(Cursor::new(bytes), "deck.pptx")
    }

    fn texts(slide: &Slide) -> Vec<Option<&str>> {
        slide.shapes.iter().map(|s| s.text.as_deref()).collect()
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(
            resolve_target("ppt/slides", "../slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/slideLayout2.xml"
        );
        assert_eq!(resolve_target("ppt/slides", "/ppt/media/a.png"), "ppt/media/a.png");
        assert_eq!(resolve_target("", "ppt/presentation.xml"), "ppt/presentation.xml");
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(
            rels_path_for("ppt/slides/slide1.xml"),
            "ppt/slides/_rels/slide1.xml.rels"
        );
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

        let rels = parse_relationships(xml, "ppt/slides").unwrap();
        assert_eq!(
            rels,
            vec![Relationship {
                id: "rId1".into(),
                rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout".into(),
                target: "ppt/slideLayouts/slideLayout1.xml".into(),
            }]
        );
    }

    #[test]
    fn test_parse_slide_id_list() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="257" r:id="rId7"/><p:sldId id="256" r:id="rId2"/></p:sldIdLst></p:presentation>"#;
        assert_eq!(parse_slide_id_list(xml).unwrap(), vec!["rId7", "rId2"]);
    }

    #[test]
    fn test_parse_basic_deck() {
        let bytes = DeckBuilder::new()
            .slide(vec![ShapeXml::text_box(
                "TextBox 1",
                &["강사: 홍길동 #3"],
                (0.0, 6.0, 2.0, 0.5),
            )])
            .slide(vec![])
            .build();

        let doc = parse(bytes).unwrap();
        assert_eq!(doc.format, PresentationFormat::Pptx);
        assert_eq!(doc.slide_count(), 2);

        let shape = &doc.slides[0].shapes[0];
        assert_eq!(shape.name, "TextBox 1");
        assert_eq!(shape.text.as_deref(), Some("강사: 홍길동 #3"));
        assert_eq!(shape.bounds, Some(Rect::new(0.0, 6.0, 2.0, 6.5)));
        assert!(doc.slides[1].shapes.is_empty());
    }

    #[test]
    fn test_slide_order_follows_id_list() {
        let bytes = DeckBuilder::new()
            .slide(vec![ShapeXml::text_box("A", &["first file"], (0.0, 0.0, 1.0, 1.0))])
            .slide(vec![ShapeXml::text_box("B", &["second file"], (0.0, 0.0, 1.0, 1.0))])
            .order(vec![1, 0])
            .build();

        let doc = parse(bytes).unwrap();
        assert_eq!(texts(&doc.slides[0]), vec![Some("second file")]);
        assert_eq!(texts(&doc.slides[1]), vec![Some("first file")]);
    }

    #[test]
    fn test_shape_kinds_in_traversal_order() {
        let bytes = DeckBuilder::new()
            .slide(vec![
                ShapeXml::picture("Picture 1", (0.0, 6.0, 1.0, 1.0)),
                ShapeXml::text_box("TextBox 2", &["줄 하나", "줄\u{0B}둘"], (1.0, 6.0, 1.0, 1.0)),
                ShapeXml::group(
                    "Group 3",
                    vec![ShapeXml::text_box("Inner", &["nested"], (0.0, 6.0, 1.0, 1.0))],
                ),
            ])
            .build();

        let doc = parse(bytes).unwrap();
        let slide = &doc.slides[0];
        assert_eq!(
            texts(slide),
            vec![None, Some("줄 하나\n줄\u{0B}둘"), None]
        );
    }

    #[test]
    fn test_placeholder_inherits_layout_and_master_bounds() {
        let bytes = DeckBuilder::new()
            .layout(vec![
                ShapeXml::placeholder("Title 1", Some("title"), None, &[], None),
                ShapeXml::placeholder(
                    "Caption 2",
                    Some("body"),
                    Some(13),
                    &[],
                    Some((0.5, 6.0, 9.0, 0.75)),
                ),
            ])
            .master(vec![ShapeXml::placeholder(
                "Title Placeholder 1",
                Some("title"),
                None,
                &[],
                Some((0.5, 0.25, 9.0, 1.25)),
            )])
            .slide(vec![
                ShapeXml::placeholder("Title 1", Some("title"), None, &["제목"], None),
                ShapeXml::placeholder("Caption 2", Some("body"), Some(13), &["자막"], None),
                ShapeXml::placeholder("Unknown 3", Some("body"), Some(99), &["고아"], None),
            ])
            .build();

        let doc = parse(bytes).unwrap();
        let shapes = &doc.slides[0].shapes;

        assert_eq!(shapes[0].bounds, Some(Rect::new(0.5, 0.25, 9.5, 1.5)));
        assert_eq!(shapes[1].bounds, Some(Rect::new(0.5, 6.0, 9.5, 6.75)));
        assert_eq!(shapes[2].bounds, None);
    }

    #[test]
    fn test_own_transform_wins_over_layout() {
        let bytes = DeckBuilder::new()
            .layout(vec![ShapeXml::placeholder(
                "Body",
                Some("body"),
                Some(1),
                &[],
                Some((0.0, 0.0, 5.0, 5.0)),
            )])
            .slide(vec![ShapeXml::placeholder(
                "Body",
                Some("body"),
                Some(1),
                &["본문"],
                Some((1.0, 6.0, 2.0, 0.5)),
            )])
            .build();

        let doc = parse(bytes).unwrap();
        assert_eq!(doc.slides[0].shapes[0].bounds, Some(Rect::new(1.0, 6.0, 3.0, 6.5)));
    }

    #[test]
    fn test_not_a_zip() {
        let result = parse(b"definitely not a zip archive".to_vec());
        assert!(matches!(result, Err(Error::ZipError(_))));
    }

    #[test]
    fn test_missing_presentation_rels() {
        let bytes = DeckBuilder::new().slide(vec![]).without_presentation_rels().build();
        let result = parse(bytes);
        assert!(matches!(result, Err(Error::PptxParseError(_))));
    }

    #[test]
    fn test_inches_helper() {
        assert_eq!(inches(1.0), 914_400);
        assert_eq!(inches(5.673), 5_187_391);
    }
}
