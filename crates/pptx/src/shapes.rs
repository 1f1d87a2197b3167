//! Shape tree walker shared by slide, layout and master parts.
//!
//! Only direct children of `p:spTree` are shapes; anything nested in a group
//! belongs to the group and is not visited on its own.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slidescript_core::geometry::emu_to_inches;
use slidescript_core::{Error, Rect, Result};

/// Element names that are shapes when they sit directly under `p:spTree`.
const SHAPE_ELEMENTS: [&[u8]; 6] = [
    b"sp",
    b"grpSp",
    b"graphicFrame",
    b"cxnSp",
    b"pic",
    b"contentPart",
];

/// Vertical tab, used for `a:br` soft line breaks inside a paragraph.
const LINE_BREAK: char = '\u{000B}';

/// Offset and extent in EMU. Either may be missing on placeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub offset: Option<(i64, i64)>,
    pub extent: Option<(i64, i64)>,
}

impl Geometry {
    /// Fill missing values from `base`.
    pub fn or(self, base: Geometry) -> Geometry {
        Geometry {
            offset: self.offset.or(base.offset),
            extent: self.extent.or(base.extent),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.offset.is_some() && self.extent.is_some()
    }

    /// Bounds in inches, if both offset and extent are known.
    pub fn to_rect(self) -> Option<Rect> {
        let (x, y) = self.offset?;
        let (cx, cy) = self.extent?;
        Some(Rect::from_origin_size(
            emu_to_inches(x),
            emu_to_inches(y),
            emu_to_inches(cx),
            emu_to_inches(cy),
        ))
    }
}

/// Placeholder reference from `p:nvPr/p:ph`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placeholder {
    /// `type` attribute, `obj` when absent.
    pub kind: String,
    /// `idx` attribute, 0 when absent.
    pub idx: u32,
}

impl Placeholder {
    /// The master placeholder type a layout placeholder of this type inherits from.
    pub fn base_kind(&self) -> &str {
        match self.kind.as_str() {
            "title" | "ctrTitle" => "title",
            "dt" => "dt",
            "ftr" => "ftr",
            "sldNum" => "sldNum",
            "hdr" => "hdr",
            _ => "body",
        }
    }
}

/// A top-level shape as read from XML.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawShape {
    pub name: String,
    /// Text frame content: paragraphs joined by `\n`. `None` without `p:txBody`.
    pub text: Option<String>,
    pub geometry: Geometry,
    pub placeholder: Option<Placeholder>,
}

/// Collects one shape while its subtree is being read.
struct ShapeBuilder {
    /// Index of the shape element in the element stack.
    depth: usize,
    is_sp: bool,
    shape: RawShape,
    paragraphs: Option<Vec<String>>,
    /// Index of `p:txBody` in the element stack while inside it.
    text_body: Option<usize>,
}

impl ShapeBuilder {
    fn new(depth: usize, element: &[u8]) -> Self {
        Self {
            depth,
            is_sp: element == b"sp",
            shape: RawShape::default(),
            paragraphs: None,
            text_body: None,
        }
    }

    fn in_text_body(&self, stack: &[Vec<u8>]) -> bool {
        self.text_body.is_some_and(|d| stack.len() > d)
    }

    /// Handle an element opening inside the shape. `stack` holds its ancestors.
    fn open(&mut self, e: &BytesStart, name: &[u8], stack: &[Vec<u8>]) {
        let rel = stack.len() - self.depth;
        let parent = stack.last().map(Vec::as_slice);

        match name {
            b"cNvPr" if rel == 2 => {
                self.shape.name = attr(e, b"name").unwrap_or_default();
            }
            b"ph" if rel == 3 => {
                self.shape.placeholder = Some(Placeholder {
                    kind: attr(e, b"type").unwrap_or_else(|| "obj".to_string()),
                    idx: attr(e, b"idx").and_then(|v| v.parse().ok()).unwrap_or(0),
                });
            }
            b"off" | b"ext" if parent == Some(b"xfrm".as_slice()) && self.is_own_xfrm(stack) => {
                let pair = if name == b"off" {
                    (attr_i64(e, b"x"), attr_i64(e, b"y"))
                } else {
                    (attr_i64(e, b"cx"), attr_i64(e, b"cy"))
                };
                if let (Some(a), Some(b)) = pair {
                    if name == b"off" {
                        self.shape.geometry.offset = Some((a, b));
                    } else {
                        self.shape.geometry.extent = Some((a, b));
                    }
                }
            }
            b"txBody" if rel == 1 && self.is_sp => {
                self.paragraphs = Some(Vec::new());
                self.text_body = Some(stack.len());
            }
            b"p" if self.in_text_body(stack) && parent == Some(b"txBody".as_slice()) => {
                if let Some(paragraphs) = self.paragraphs.as_mut() {
                    paragraphs.push(String::new());
                }
            }
            b"br" if self.in_text_body(stack) && parent == Some(b"p".as_slice()) => {
                self.push_text(&LINE_BREAK.to_string());
            }
            _ => {}
        }
    }

    /// `a:xfrm` directly under the shape's own properties (or the shape itself
    /// for graphic frames), not one belonging to a child.
    fn is_own_xfrm(&self, stack: &[Vec<u8>]) -> bool {
        match stack.len() - self.depth {
            2 => true,
            3 => matches!(stack[self.depth + 1].as_slice(), b"spPr" | b"grpSpPr"),
            _ => false,
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(last) = self.paragraphs.as_mut().and_then(|p| p.last_mut()) {
            last.push_str(text);
        }
    }

    fn finish(mut self) -> RawShape {
        self.shape.text = self.paragraphs.map(|p| p.join("\n"));
        self.shape
    }
}

/// Read the top-level shapes of a slide, layout or master part.
pub(crate) fn parse_shape_tree(xml: &str) -> Result<Vec<RawShape>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut shapes = Vec::new();
    let mut current: Option<ShapeBuilder> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name().as_ref()).to_vec();
                if let Some(builder) = current.as_mut() {
                    builder.open(e, &name, &stack);
                } else if is_top_level_shape(&name, &stack) {
                    current = Some(ShapeBuilder::new(stack.len(), &name));
                }
                stack.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name().as_ref()).to_vec();
                if let Some(builder) = current.as_mut() {
                    builder.open(e, &name, &stack);
                } else if is_top_level_shape(&name, &stack) {
                    shapes.push(RawShape::default());
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(builder) = current.as_mut() {
                    let in_run = stack.last().map(Vec::as_slice) == Some(b"t".as_slice());
                    if in_run && builder.in_text_body(&stack) {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?;
                        builder.push_text(&text);
                    }
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
                if current.as_ref().is_some_and(|b| b.depth == stack.len()) {
                    if let Some(builder) = current.take() {
                        shapes.push(builder.finish());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing shape tree at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

fn is_top_level_shape(name: &[u8], stack: &[Vec<u8>]) -> bool {
    stack.last().map(Vec::as_slice) == Some(b"spTree".as_slice()) && SHAPE_ELEMENTS.contains(&name)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Unescaped value of an unprefixed attribute.
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}
