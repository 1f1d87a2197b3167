//! In-memory PPTX decks for tests.
//!
//! Builds the minimum set of parts the parser reads: presentation.xml and its
//! relationships, slides, one slide layout and one slide master.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Convert inches to EMU.
pub fn inches(value: f64) -> i64 {
    (value * 914_400.0).round() as i64
}

/// Left, top, width, height in inches.
pub type Bounds = (f64, f64, f64, f64);

/// XML for one top-level shape.
#[derive(Debug, Clone)]
pub struct ShapeXml(String);

impl ShapeXml {
    /// A plain text box. Each entry is a paragraph; `\u{0B}` becomes `a:br`.
    pub fn text_box(name: &str, paragraphs: &[&str], bounds: Bounds) -> Self {
        Self(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}</p:spPr>{}</p:sp>"#,
            escape(name),
            xfrm(bounds),
            text_body(paragraphs)
        ))
    }

    /// A placeholder shape, optionally without its own transform.
    pub fn placeholder(
        name: &str,
        kind: Option<&str>,
        idx: Option<u32>,
        paragraphs: &[&str],
        bounds: Option<Bounds>,
    ) -> Self {
        let mut ph = String::from("<p:ph");
        if let Some(kind) = kind {
            ph.push_str(&format!(r#" type="{}""#, kind));
        }
        if let Some(idx) = idx {
            ph.push_str(&format!(r#" idx="{}""#, idx));
        }
        ph.push_str("/>");

        Self(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="{}"/><p:cNvSpPr/><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr>{}</p:spPr>{}</p:sp>"#,
            escape(name),
            ph,
            bounds.map(xfrm).unwrap_or_default(),
            text_body(paragraphs)
        ))
    }

    /// A picture (no text frame).
    pub fn picture(name: &str, bounds: Bounds) -> Self {
        Self(format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="4" name="{}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr>{}</p:spPr></p:pic>"#,
            escape(name),
            xfrm(bounds)
        ))
    }

    /// A group wrapping other shapes.
    pub fn group(name: &str, children: Vec<ShapeXml>) -> Self {
        let inner: String = children.into_iter().map(|c| c.0).collect();
        Self(format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="5" name="{}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:grpSp>"#,
            escape(name),
            inner
        ))
    }
}

fn xfrm((left, top, width, height): Bounds) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        inches(left),
        inches(top),
        inches(width),
        inches(height)
    )
}

fn text_body(paragraphs: &[&str]) -> String {
    let mut xml = String::from("<p:txBody><a:bodyPr/><a:lstStyle/>");
    if paragraphs.is_empty() {
        xml.push_str("<a:p/>");
    }
    for paragraph in paragraphs {
        if paragraph.is_empty() {
            xml.push_str("<a:p/>");
            continue;
        }
        xml.push_str("<a:p>");
        for (i, line) in paragraph.split('\u{0B}').enumerate() {
            if i > 0 {
                xml.push_str("<a:br/>");
            }
            if !line.is_empty() {
                xml.push_str(&format!(r#"<a:r><a:rPr lang="ko-KR"/><a:t>{}</a:t></a:r>"#, escape(line)));
            }
        }
        xml.push_str("</a:p>");
    }
    xml.push_str("</p:txBody>");
    xml
}

fn part(root: &str, shapes: &[ShapeXml]) -> String {
    let inner: String = shapes.iter().map(|s| s.0.as_str()).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:{root} {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{inner}</p:spTree></p:cSld></p:{root}>"#
    )
}

fn relationships(rels: &[(String, &str, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL_BASE, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Builds a .pptx file in memory.
#[derive(Debug, Clone, Default)]
pub struct DeckBuilder {
    slides: Vec<Vec<ShapeXml>>,
    layout: Vec<ShapeXml>,
    master: Vec<ShapeXml>,
    order: Option<Vec<usize>>,
    skip_presentation_rels: bool,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide part (`slideN.xml`, in call order).
    pub fn slide(mut self, shapes: Vec<ShapeXml>) -> Self {
        self.slides.push(shapes);
        self
    }

    pub fn layout(mut self, shapes: Vec<ShapeXml>) -> Self {
        self.layout = shapes;
        self
    }

    pub fn master(mut self, shapes: Vec<ShapeXml>) -> Self {
        self.master = shapes;
        self
    }

    /// Presentation order as indices into the added slides.
    pub fn order(mut self, order: Vec<usize>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn without_presentation_rels(mut self) -> Self {
        self.skip_presentation_rels = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut add = |name: &str, content: &str| {
            zip.start_file(name, FileOptions::default())
                .expect("start zip entry");
            zip.write_all(content.as_bytes()).expect("write zip entry");
        };

        let order = self
            .order
            .clone()
            .unwrap_or_else(|| (0..self.slides.len()).collect());
        let id_list: String = order
            .iter()
            .enumerate()
            .map(|(pos, &i)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + pos, i + 2))
            .collect();
        add(
            "ppt/presentation.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{id_list}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#
            ),
        );

        if !self.skip_presentation_rels {
            let mut rels = vec![(
                "rId1".to_string(),
                "slideMaster",
                "slideMasters/slideMaster1.xml".to_string(),
            )];
            for i in 0..self.slides.len() {
                rels.push((
                    format!("rId{}", i + 2),
                    "slide",
                    format!("slides/slide{}.xml", i + 1),
                ));
            }
            add("ppt/_rels/presentation.xml.rels", &relationships(&rels));
        }

        for (i, shapes) in self.slides.iter().enumerate() {
            add(&format!("ppt/slides/slide{}.xml", i + 1), &part("sld", shapes));
            add(
                &format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
                &relationships(&[(
                    "rId1".to_string(),
                    "slideLayout",
                    "../slideLayouts/slideLayout1.xml".to_string(),
                )]),
            );
        }

        add("ppt/slideLayouts/slideLayout1.xml", &part("sldLayout", &self.layout));
        add(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &relationships(&[(
                "rId1".to_string(),
                "slideMaster",
                "../slideMasters/slideMaster1.xml".to_string(),
            )]),
        );
        add("ppt/slideMasters/slideMaster1.xml", &part("sldMaster", &self.master));

        zip.finish().expect("finish zip").into_inner()
    }
}
