//! PPT file parser implementation.
//!
//! Parses legacy PowerPoint files using the OLE/CFB container format. Slides
//! are located through the persist directory of the latest user edit, and
//! each slide's shapes come from the top level of its OfficeArt drawing.
//!
//! ## Compatibility
//!
//! This parser is designed for PowerPoint 97-2003 (.ppt) files. Shape
//! positions are read from client anchors in master units (576 per inch).

use cfb::CompoundFile;
use slidescript_core::geometry::master_units_to_inches;
use slidescript_core::{Document, Error, PresentationFormat, Rect, Result, Shape, Slide};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};

const POWERPOINT_DOCUMENT: &str = "/PowerPoint Document";
const CURRENT_USER: &str = "/Current User";

/// `fPatriarch` bit in OfficeArtFSP flags: the drawing's own group shape.
const FSP_PATRIARCH: u32 = 0x0004;

/// Record type constants for PPT file format.
mod record_types {
    pub const RT_DOCUMENT: u16 = 0x03E8;
    pub const RT_SLIDE: u16 = 0x03EE;
    pub const RT_SLIDE_PERSIST_ATOM: u16 = 0x03F3;
    pub const RT_PP_DRAWING: u16 = 0x040C;
    pub const RT_OUTLINE_TEXT_REF_ATOM: u16 = 0x0F9E;
    pub const RT_TEXT_HEADER_ATOM: u16 = 0x0F9F;
    pub const RT_TEXT_CHARS_ATOM: u16 = 0x0FA0;
    pub const RT_TEXT_BYTES_ATOM: u16 = 0x0FA8;
    pub const RT_SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;
    pub const RT_USER_EDIT_ATOM: u16 = 0x0FF5;
    pub const RT_CURRENT_USER_ATOM: u16 = 0x0FF6;
    pub const RT_PERSIST_DIRECTORY_ATOM: u16 = 0x1772;

    pub const OFFICE_ART_DG_CONTAINER: u16 = 0xF002;
    pub const OFFICE_ART_SPGR_CONTAINER: u16 = 0xF003;
    pub const OFFICE_ART_SP_CONTAINER: u16 = 0xF004;
    pub const OFFICE_ART_FSP: u16 = 0xF00A;
    pub const OFFICE_ART_CLIENT_TEXTBOX: u16 = 0xF00D;
    pub const OFFICE_ART_CLIENT_ANCHOR: u16 = 0xF010;
}

use record_types::*;

/// Parser for legacy PPT (OLE/CFB) files.
pub struct PptParser;

impl PptParser {
    /// Create a new PPT parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPT file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Document> {
        let mut cfb = CompoundFile::open(reader)
            .map_err(|e| Error::CfbError(format!("Failed to open CFB container: {}", e)))?;

        // Validate CFB structure has required streams
        self.validate_cfb_structure(&cfb)?;

        let stream = read_stream(&mut cfb, POWERPOINT_DOCUMENT)?;
        let current_user = if cfb.is_stream(CURRENT_USER) {
            Some(read_stream(&mut cfb, CURRENT_USER)?)
        } else {
            None
        };

        let mut document = Document::new(filename, PresentationFormat::Ppt);
        for slide in parse_document_stream(&stream, current_user.as_deref())? {
            document.add_slide(slide);
        }

        log::debug!("'{}': {} slides", filename, document.slide_count());
        Ok(document)
    }

    /// Validate the CFB container has required PowerPoint streams.
    fn validate_cfb_structure<R: Read + Seek>(&self, cfb: &CompoundFile<R>) -> Result<()> {
        if !cfb.is_stream(POWERPOINT_DOCUMENT) {
            return Err(Error::UnsupportedFormat(
                "Missing 'PowerPoint Document' stream. This may not be a valid PPT file \
                 or may be a different Office format."
                    .to_string(),
            ));
        }

        if !cfb.is_stream(CURRENT_USER) {
            log::warn!(
                "Missing 'Current User' stream. File may be an older PPT format variant."
            );
        }

        Ok(())
    }
}

impl Default for PptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a whole stream from the CFB container.
fn read_stream<R: Read + Seek>(cfb: &mut CompoundFile<R>, path: &str) -> Result<Vec<u8>> {
    let mut stream = cfb
        .open_stream(path)
        .map_err(|e| Error::CfbError(format!("Failed to open '{}' stream: {}", path, e)))?;

    let mut data = Vec::new();
    stream
        .read_to_end(&mut data)
        .map_err(|e| Error::CfbError(format!("Failed to read stream: {}", e)))?;

    Ok(data)
}

/// Slides of the PowerPoint Document stream, in presentation order.
fn parse_document_stream(stream: &[u8], current_user: Option<&[u8]>) -> Result<Vec<Slide>> {
    let persist = PersistDirectory::load(stream, current_user)?;

    let document = persist
        .record(stream, persist.document_id)
        .filter(|h| h.rec_type == RT_DOCUMENT)
        .ok_or_else(|| {
            Error::PptParseError("Document container not found via persist directory".to_string())
        })?;

    read_slide_list(stream, &document)
        .iter()
        .map(|entry| parse_slide(stream, &persist, entry))
        .collect()
}

/// An 8-byte record header and where it sits in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordHeader {
    version: u16,
    instance: u16,
    rec_type: u16,
    len: usize,
    offset: usize,
}

impl RecordHeader {
    /// Read the header at `offset`, if it and its content fit in `data`.
    fn read(data: &[u8], offset: usize) -> Option<Self> {
        // PPT records have an 8-byte header:
        // - 2 bytes: recVer (4 bits) + recInstance (12 bits)
        // - 2 bytes: recType
        // - 4 bytes: recLen
        let ver_instance = read_u16_le(data, offset)?;
        let rec_type = read_u16_le(data, offset + 2)?;
        let len = read_u32_le(data, offset + 4)? as usize;

        let header = Self {
            version: ver_instance & 0x0F,
            instance: ver_instance >> 4,
            rec_type,
            len,
            offset,
        };
        (header.content_end()? <= data.len()).then_some(header)
    }

    fn content_start(&self) -> usize {
        self.offset + 8
    }

    fn content_end(&self) -> Option<usize> {
        self.content_start().checked_add(self.len)
    }

    fn is_container(&self) -> bool {
        self.version == 0x0F
    }
}

/// Iterates sibling records in a byte range, stopping at the first
/// record that does not fit.
struct Records<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Records<'a> {
    fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            data,
            pos: start,
            end: end.min(data.len()),
        }
    }

    /// Children of a container record.
    fn within(data: &'a [u8], parent: &RecordHeader) -> Self {
        if !parent.is_container() {
            return Self::new(data, 0, 0);
        }
        let end = parent.content_end().unwrap_or(parent.offset);
        Self::new(data, parent.content_start(), end)
    }
}

impl Iterator for Records<'_> {
    type Item = RecordHeader;

    fn next(&mut self) -> Option<RecordHeader> {
        if self.pos + 8 > self.end {
            return None;
        }
        let next = RecordHeader::read(self.data, self.pos).and_then(|header| {
            header
                .content_end()
                .filter(|&end| end <= self.end)
                .map(|end| (header, end))
        });
        match next {
            Some((header, end)) => {
                self.pos = end;
                Some(header)
            }
            None => {
                log::debug!("Malformed record at offset {}, stopping", self.pos);
                self.pos = self.end;
                None
            }
        }
    }
}

/// Follow `path` of record types down from `parent`, taking the first match at each level.
fn find_path(data: &[u8], parent: &RecordHeader, path: &[u16]) -> Option<RecordHeader> {
    path.iter().try_fold(*parent, |current, &rec_type| {
        Records::within(data, &current).find(|r| r.rec_type == rec_type)
    })
}

/// Persist object id to stream offset, merged over the whole edit chain.
#[derive(Debug, Default)]
struct PersistDirectory {
    offsets: HashMap<u32, usize>,
    document_id: u32,
}

impl PersistDirectory {
    /// Build the directory starting at the current user edit.
    ///
    /// Falls back to the last UserEditAtom in the stream when the Current
    /// User stream is missing or points somewhere invalid.
    fn load(stream: &[u8], current_user: Option<&[u8]>) -> Result<Self> {
        let start = current_user
            .and_then(current_edit_offset)
            .filter(|&offset| UserEdit::read(stream, offset).is_some())
            .or_else(|| last_user_edit(stream))
            .ok_or_else(|| Error::CorruptedFile("No UserEditAtom found".to_string()))?;

        let mut directory = Self::default();
        let mut visited = HashSet::new();
        let mut next = Some(start);
        let mut newest = true;

        while let Some(offset) = next {
            if !visited.insert(offset) {
                log::warn!("Cycle in user edit chain at offset {}", offset);
                break;
            }
            let edit = UserEdit::read(stream, offset).ok_or_else(|| {
                Error::PptParseError(format!("Invalid UserEditAtom at offset {}", offset))
            })?;

            if newest {
                directory.document_id = edit.document_persist_id;
                newest = false;
            }
            directory.merge(stream, edit.persist_directory_offset)?;

            next = (edit.last_edit_offset != 0).then_some(edit.last_edit_offset);
        }

        Ok(directory)
    }

    /// Add entries from an older PersistDirectoryAtom without overriding newer ones.
    fn merge(&mut self, stream: &[u8], offset: usize) -> Result<()> {
        let header = RecordHeader::read(stream, offset)
            .filter(|h| h.rec_type == RT_PERSIST_DIRECTORY_ATOM)
            .ok_or_else(|| {
                Error::PptParseError(format!("Invalid PersistDirectoryAtom at offset {}", offset))
            })?;

        let end = header.content_start() + header.len;
        let mut pos = header.content_start();
        while pos + 4 <= end {
            let Some(entry) = read_u32_le(stream, pos) else { break };
            let persist_id = entry & 0x000F_FFFF;
            let count = (entry >> 20) as usize;
            pos += 4;

            for i in 0..count {
                if pos + 4 > end {
                    break;
                }
                if let Some(target) = read_u32_le(stream, pos) {
                    self.offsets
                        .entry(persist_id + i as u32)
                        .or_insert(target as usize);
                }
                pos += 4;
            }
        }

        Ok(())
    }

    /// The record a persist id points to.
    fn record(&self, stream: &[u8], persist_id: u32) -> Option<RecordHeader> {
        self.offsets
            .get(&persist_id)
            .and_then(|&offset| RecordHeader::read(stream, offset))
    }
}

/// The fields of a UserEditAtom this parser needs.
#[derive(Debug, Clone, Copy)]
struct UserEdit {
    last_edit_offset: usize,
    persist_directory_offset: usize,
    document_persist_id: u32,
}

impl UserEdit {
    fn read(stream: &[u8], offset: usize) -> Option<Self> {
        let header = RecordHeader::read(stream, offset)?;
        if header.rec_type != RT_USER_EDIT_ATOM || header.len < 20 {
            return None;
        }
        let c = header.content_start();
        Some(Self {
            last_edit_offset: read_u32_le(stream, c + 8)? as usize,
            persist_directory_offset: read_u32_le(stream, c + 12)? as usize,
            document_persist_id: read_u32_le(stream, c + 16)?,
        })
    }
}

/// `offsetToCurrentEdit` from the CurrentUserAtom.
fn current_edit_offset(current_user: &[u8]) -> Option<usize> {
    let header = RecordHeader::read(current_user, 0)?;
    if header.rec_type != RT_CURRENT_USER_ATOM || header.len < 12 {
        return None;
    }
    read_u32_le(current_user, header.content_start() + 8).map(|v| v as usize)
}

/// Offset of the last top-level UserEditAtom in the stream.
fn last_user_edit(stream: &[u8]) -> Option<usize> {
    Records::new(stream, 0, stream.len())
        .filter(|r| r.rec_type == RT_USER_EDIT_ATOM)
        .last()
        .map(|r| r.offset)
}

/// One slide from the document's slide list, with its outline text.
#[derive(Debug, Default)]
struct SlideEntry {
    persist_id: u32,
    /// Placeholder texts, indexed by OutlineTextRefAtom.
    outline: Vec<String>,
}

/// Slides listed in the document's SlideListWithText (instance 0).
fn read_slide_list(stream: &[u8], document: &RecordHeader) -> Vec<SlideEntry> {
    let Some(list) = Records::within(stream, document)
        .find(|r| r.rec_type == RT_SLIDE_LIST_WITH_TEXT && r.instance == 0)
    else {
        log::debug!("No slide list found; presentation has no slides");
        return Vec::new();
    };

    let mut slides: Vec<SlideEntry> = Vec::new();
    for rec in Records::within(stream, &list) {
        match rec.rec_type {
            RT_SLIDE_PERSIST_ATOM => {
                if let Some(persist_id) = read_u32_le(stream, rec.content_start()) {
                    slides.push(SlideEntry {
                        persist_id,
                        outline: Vec::new(),
                    });
                }
            }
            RT_TEXT_HEADER_ATOM => {
                if let Some(slide) = slides.last_mut() {
                    slide.outline.push(String::new());
                }
            }
            RT_TEXT_CHARS_ATOM | RT_TEXT_BYTES_ATOM => {
                if let Some(last) = slides.last_mut().and_then(|s| s.outline.last_mut()) {
                    *last = decode_text(stream, &rec);
                }
            }
            _ => {}
        }
    }

    slides
}

/// Read one slide's top-level shapes.
fn parse_slide(stream: &[u8], persist: &PersistDirectory, entry: &SlideEntry) -> Result<Slide> {
    let header = persist
        .record(stream, entry.persist_id)
        .filter(|h| h.rec_type == RT_SLIDE)
        .ok_or_else(|| {
            Error::PptParseError(format!(
                "Slide container for persist id {} not found",
                entry.persist_id
            ))
        })?;

    let mut slide = Slide::new();
    let Some(group) = find_path(
        stream,
        &header,
        &[RT_PP_DRAWING, OFFICE_ART_DG_CONTAINER, OFFICE_ART_SPGR_CONTAINER],
    ) else {
        return Ok(slide);
    };

    for rec in Records::within(stream, &group) {
        match rec.rec_type {
            OFFICE_ART_SP_CONTAINER => {
                if let Some(shape) = read_shape(stream, &rec, &entry.outline) {
                    slide.add_shape(shape);
                }
            }
            OFFICE_ART_SPGR_CONTAINER => {
                // Nested group: one shape without a text frame of its own
                slide.add_shape(Shape::graphic("Group", None));
            }
            _ => {}
        }
    }

    Ok(slide)
}

/// Read a shape container. Returns `None` for the drawing's patriarch shape.
fn read_shape(stream: &[u8], container: &RecordHeader, outline: &[String]) -> Option<Shape> {
    let mut shape = Shape::default();

    for rec in Records::within(stream, container) {
        match rec.rec_type {
            OFFICE_ART_FSP => {
                let c = rec.content_start();
                let flags = read_u32_le(stream, c + 4).unwrap_or(0);
                if flags & FSP_PATRIARCH != 0 {
                    return None;
                }
                if let Some(spid) = read_u32_le(stream, c) {
                    shape.name = format!("Shape {}", spid);
                }
            }
            OFFICE_ART_CLIENT_ANCHOR => shape.bounds = read_anchor(stream, &rec),
            OFFICE_ART_CLIENT_TEXTBOX => shape.text = Some(read_textbox(stream, &rec, outline)),
            _ => {}
        }
    }

    Some(shape)
}

/// Client anchor as a rectangle in inches. Both the 8-byte (SmallRectStruct)
/// and 16-byte (RectStruct) forms store top, left, right, bottom.
fn read_anchor(stream: &[u8], rec: &RecordHeader) -> Option<Rect> {
    let c = rec.content_start();
    let (top, left, right, bottom) = match rec.len {
        8 => (
            read_i16_le(stream, c)? as i32,
            read_i16_le(stream, c + 2)? as i32,
            read_i16_le(stream, c + 4)? as i32,
            read_i16_le(stream, c + 6)? as i32,
        ),
        16 => (
            read_u32_le(stream, c)? as i32,
            read_u32_le(stream, c + 4)? as i32,
            read_u32_le(stream, c + 8)? as i32,
            read_u32_le(stream, c + 12)? as i32,
        ),
        _ => return None,
    };

    Some(Rect::new(
        master_units_to_inches(left),
        master_units_to_inches(top),
        master_units_to_inches(right),
        master_units_to_inches(bottom),
    ))
}

/// Text of a client textbox: inline text atoms or a reference into the
/// slide's outline text.
fn read_textbox(stream: &[u8], textbox: &RecordHeader, outline: &[String]) -> String {
    for rec in Records::within(stream, textbox) {
        match rec.rec_type {
            RT_TEXT_CHARS_ATOM | RT_TEXT_BYTES_ATOM => return decode_text(stream, &rec),
            RT_OUTLINE_TEXT_REF_ATOM => {
                let index = read_u32_le(stream, rec.content_start()).map(|v| v as usize);
                return index
                    .and_then(|i| outline.get(i))
                    .cloned()
                    .unwrap_or_default();
            }
            _ => {}
        }
    }
    String::new()
}

/// Decode a TextCharsAtom/TextBytesAtom. Paragraphs end in `\r` in PPT.
fn decode_text(stream: &[u8], rec: &RecordHeader) -> String {
    let text = match rec.rec_type {
        RT_TEXT_CHARS_ATOM => extract_unicode_text(stream, rec.content_start(), rec.len),
        _ => extract_ansi_text(stream, rec.content_start(), rec.len),
    };
    text.unwrap_or_default().replace('\r', "\n")
}

/// Extract Unicode (UTF-16LE) text from a record.
fn extract_unicode_text(data: &[u8], start: usize, len: usize) -> Option<String> {
    if len == 0 || start + len > data.len() || len % 2 != 0 {
        return None;
    }

    let slice = &data[start..start + len];
    let u16_chars: Vec<u16> = slice
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    // Decode UTF-16, stopping at null terminator if present
    let text: String = char::decode_utf16(u16_chars.iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .take_while(|&c| c != '\0')
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract ANSI text from a record (Windows-1252 encoding assumed).
fn extract_ansi_text(data: &[u8], start: usize, len: usize) -> Option<String> {
    if len == 0 || start + len > data.len() {
        return None;
    }

    let slice = &data[start..start + len];

    // Find null terminator if present
    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    let text: String = slice[..end].iter().map(|&b| windows_1252(b)).collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Map a Windows-1252 byte to a char.
fn windows_1252(b: u8) -> char {
    match b {
        0x80 => '€',
        0x82 => '‚',
        0x83 => 'ƒ',
        0x84 => '„',
        0x85 => '…',
        0x86 => '†',
        0x87 => '‡',
        0x88 => 'ˆ',
        0x89 => '‰',
        0x8A => 'Š',
        0x8B => '‹',
        0x8C => 'Œ',
        0x8E => 'Ž',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x98 => '˜',
        0x99 => '™',
        0x9A => 'š',
        0x9B => '›',
        0x9C => 'œ',
        0x9E => 'ž',
        0x9F => 'Ÿ',
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D => '?',
        // 0x00-0x7F and 0xA0-0xFF match Latin-1
        _ => b as char,
    }
}

/// Read a little-endian u16 from a byte slice.
fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian i16 from a byte slice.
fn read_i16_le(data: &[u8], offset: usize) -> Option<i16> {
    read_u16_le(data, offset).map(|v| v as i16)
}

/// Read a little-endian u32 from a byte slice.
fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn atom(rec_type: u16, instance: u16, content: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(instance << 4).to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&(content.len() as u32).to_le_bytes());
        out.extend_from_slice(content);
        out
    }

    fn container(rec_type: u16, instance: u16, children: &[Vec<u8>]) -> Vec<u8> {
        let content = children.concat();
        let mut out = atom(rec_type, instance, &content);
        out[0] |= 0x0F;
        out
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn u32s(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn small_anchor(top: i16, left: i16, right: i16, bottom: i16) -> Vec<u8> {
        let content: Vec<u8> = [top, left, right, bottom]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        atom(OFFICE_ART_CLIENT_ANCHOR, 0, &content)
    }

    fn fsp(spid: u32, flags: u32) -> Vec<u8> {
        atom(OFFICE_ART_FSP, 0, &u32s(&[spid, flags]))
    }

    fn text_chars(text: &str) -> Vec<u8> {
        atom(RT_TEXT_CHARS_ATOM, 0, &utf16(text))
    }

    fn text_header(kind: u32) -> Vec<u8> {
        atom(RT_TEXT_HEADER_ATOM, 0, &u32s(&[kind]))
    }

    /// A stream with one document (persist id 1) and one slide (persist id 2).
    /// Returns the PowerPoint Document stream and the Current User stream.
    fn sample_streams() -> (Vec<u8>, Vec<u8>) {
        let document = container(
            RT_DOCUMENT,
            0,
            &[container(
                RT_SLIDE_LIST_WITH_TEXT,
                0,
                &[
                    atom(RT_SLIDE_PERSIST_ATOM, 0, &u32s(&[2, 0, 0, 256, 0])),
                    text_header(0),
                    text_chars("제목\r부제"),
                ],
            )],
        );

        let shapes = container(
            OFFICE_ART_SPGR_CONTAINER,
            0,
            &[
                container(OFFICE_ART_SP_CONTAINER, 0, &[fsp(1024, FSP_PATRIARCH | 0x1)]),
                container(
                    OFFICE_ART_SP_CONTAINER,
                    0,
                    &[
                        fsp(1025, 0),
                        small_anchor(3456, 0, 1152, 3744),
                        container(
                            OFFICE_ART_CLIENT_TEXTBOX,
                            0,
                            &[text_header(4), text_chars("강사: 홍길동 #3")],
                        ),
                    ],
                ),
                container(
                    OFFICE_ART_SP_CONTAINER,
                    0,
                    &[
                        fsp(1026, 0),
                        atom(OFFICE_ART_CLIENT_ANCHOR, 0, &u32s(&[288, 288, 5472, 864])),
                        container(
                            OFFICE_ART_CLIENT_TEXTBOX,
                            0,
                            &[atom(RT_OUTLINE_TEXT_REF_ATOM, 0, &u32s(&[0]))],
                        ),
                    ],
                ),
                container(
                    OFFICE_ART_SP_CONTAINER,
                    0,
                    &[fsp(1027, 0), small_anchor(0, 0, 576, 576)],
                ),
                container(OFFICE_ART_SPGR_CONTAINER, 0, &[]),
            ],
        );
        let slide = container(
            RT_SLIDE,
            0,
            &[container(
                RT_PP_DRAWING,
                0,
                &[container(OFFICE_ART_DG_CONTAINER, 0, &[shapes])],
            )],
        );

        let document_offset = 0u32;
        let slide_offset = document.len() as u32;
        let persist_offset = slide_offset + slide.len() as u32;
        // persistId 1, two consecutive offsets
        let persist = atom(
            RT_PERSIST_DIRECTORY_ATOM,
            0,
            &u32s(&[(2 << 20) | 1, document_offset, slide_offset]),
        );
        let edit_offset = persist_offset + persist.len() as u32;
        let edit = atom(
            RT_USER_EDIT_ATOM,
            0,
            &u32s(&[0, 0x0300_0000 | 0x03F4, 0, persist_offset, 1, 3, 1]),
        );

        let stream = [document, slide, persist, edit].concat();
        let current_user = atom(
            RT_CURRENT_USER_ATOM,
            0,
            &u32s(&[0x14, 0xE391_C05F, edit_offset, 0x03F4, 0]),
        );

        (stream, current_user)
    }

    #[test]
    fn test_read_u16_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u16_le(&data, 0), Some(0x0201));
        assert_eq!(read_u16_le(&data, 2), Some(0x0403));
        assert_eq!(read_u16_le(&data, 3), None);
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32_le(&data, 0), Some(0x04030201));
        assert_eq!(read_u32_le(&data, 1), None);
        assert_eq!(read_u32_le(&data, usize::MAX), None);
    }

    #[test]
    fn test_extract_ansi_text() {
        let data = b"Hello World\0garbage";
        let result = extract_ansi_text(data, 0, data.len());
        assert_eq!(result, Some("Hello World".to_string()));

        let data = [0x93, b'q', 0x94, 0xE9];
        assert_eq!(
            extract_ansi_text(&data, 0, data.len()),
            Some("\u{201C}q\u{201D}é".to_string())
        );
    }

    #[test]
    fn test_extract_unicode_text() {
        // "Hi" in UTF-16LE
        let data = [0x48, 0x00, 0x69, 0x00];
        let result = extract_unicode_text(&data, 0, 4);
        assert_eq!(result, Some("Hi".to_string()));
        assert_eq!(extract_unicode_text(&data, 0, 3), None);
    }

    #[test]
    fn test_extract_unicode_text_lone_surrogate() {
        // "a", unpaired high surrogate, "b", NUL, "c"
        let data: Vec<u8> = [0x0061u16, 0xD800, 0x0062, 0x0000, 0x0063]
            .iter()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(
            extract_unicode_text(&data, 0, data.len()),
            Some("a\u{FFFD}b".to_string())
        );
    }

    #[test]
    fn test_record_header() {
        let rec = container(RT_DOCUMENT, 0, &[atom(RT_TEXT_HEADER_ATOM, 0, &[1, 0, 0, 0])]);
        let header = RecordHeader::read(&rec, 0).unwrap();

        assert!(header.is_container());
        assert_eq!(header.rec_type, RT_DOCUMENT);
        assert_eq!(header.len, 12);

        let children: Vec<_> = Records::within(&rec, &header).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].rec_type, RT_TEXT_HEADER_ATOM);
        assert!(!children[0].is_container());
    }

    #[test]
    fn test_truncated_record() {
        let mut rec = atom(RT_TEXT_CHARS_ATOM, 0, &utf16("abc"));
        rec.truncate(rec.len() - 2);
        assert_eq!(RecordHeader::read(&rec, 0), None);
        assert_eq!(Records::new(&rec, 0, rec.len()).count(), 0);
    }

    #[test]
    fn test_instance_is_read() {
        let rec = container(RT_SLIDE_LIST_WITH_TEXT, 2, &[]);
        let header = RecordHeader::read(&rec, 0).unwrap();
        assert_eq!(header.instance, 2);
        assert_eq!(header.version, 0x0F);
    }

    #[test]
    fn test_parse_document_stream() {
        let (stream, current_user) = sample_streams();
        let slides = parse_document_stream(&stream, Some(&current_user)).unwrap();

        assert_eq!(slides.len(), 1);
        let shapes = &slides[0].shapes;
        assert_eq!(shapes.len(), 4);

        assert_eq!(shapes[0].name, "Shape 1025");
        assert_eq!(shapes[0].text.as_deref(), Some("강사: 홍길동 #3"));
        assert_eq!(shapes[0].bounds, Some(Rect::new(0.0, 6.0, 2.0, 6.5)));

        assert_eq!(shapes[1].text.as_deref(), Some("제목\n부제"));
        assert_eq!(shapes[1].bounds, Some(Rect::new(0.5, 0.5, 9.5, 1.5)));

        assert_eq!(shapes[2].text, None);
        assert_eq!(shapes[2].bounds, Some(Rect::new(0.0, 0.0, 1.0, 1.0)));

        assert_eq!(shapes[3].name, "Group");
        assert_eq!(shapes[3].text, None);
    }

    #[test]
    fn test_persist_directory_without_current_user() {
        let (stream, _) = sample_streams();
        let slides = parse_document_stream(&stream, None).unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].shapes.len(), 4);
    }

    #[test]
    fn test_bad_current_user_falls_back() {
        let (stream, _) = sample_streams();
        let bogus = atom(RT_CURRENT_USER_ATOM, 0, &u32s(&[0x14, 0, 3, 0, 0]));
        let slides = parse_document_stream(&stream, Some(&bogus)).unwrap();
        assert_eq!(slides.len(), 1);
    }

    #[test]
    fn test_no_user_edit() {
        let stream = container(RT_DOCUMENT, 0, &[]);
        let result = parse_document_stream(&stream, None);
        assert!(matches!(result, Err(Error::CorruptedFile(_))));
    }

    #[test]
    fn test_missing_slide_container() {
        let (mut stream, current_user) = sample_streams();
        // Retype the slide container so the persist entry points at something else
        let slide_offset = RecordHeader::read(&stream, 0).unwrap().content_end().unwrap();
        stream[slide_offset + 2..slide_offset + 4].copy_from_slice(&0x03F0u16.to_le_bytes());

        let result = parse_document_stream(&stream, Some(&current_user));
        assert!(matches!(result, Err(Error::PptParseError(_))));
    }

    #[test]
    fn test_persist_directory_merge_prefers_newest() {
        let older = atom(RT_PERSIST_DIRECTORY_ATOM, 0, &u32s(&[(2 << 20) | 1, 10, 20]));
        let newer_offset = older.len();
        let newer = atom(RT_PERSIST_DIRECTORY_ATOM, 0, &u32s(&[(1 << 20) | 2, 99]));
        let stream = [older, newer].concat();

        let mut directory = PersistDirectory::default();
        directory.merge(&stream, newer_offset).unwrap();
        directory.merge(&stream, 0).unwrap();

        assert_eq!(directory.offsets.get(&1), Some(&10));
        assert_eq!(directory.offsets.get(&2), Some(&99));
    }

    #[test]
    fn test_parse_compound_file() {
        let (stream, current_user) = sample_streams();

        let mut cfb = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        {
            let mut s = cfb.create_stream(POWERPOINT_DOCUMENT).unwrap();
            s.write_all(&stream).unwrap();
        }
        {
            let mut s = cfb.create_stream(CURRENT_USER).unwrap();
            s.write_all(&current_user).unwrap();
        }
        cfb.flush().unwrap();
        let bytes = cfb.into_inner().into_inner();

        let doc = PptParser::new().parse(Cursor::new(bytes), "deck.ppt").unwrap();
        assert_eq!(doc.format, PresentationFormat::Ppt);
        assert_eq!(doc.slide_count(), 1);
        assert_eq!(doc.slides[0].shapes[0].text.as_deref(), Some("강사: 홍길동 #3"));
    }

    #[test]
    fn test_missing_powerpoint_stream() {
        let mut cfb = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        {
            let mut s = cfb.create_stream("/WordDocument").unwrap();
            s.write_all(b"not a presentation").unwrap();
        }
        cfb.flush().unwrap();
        let bytes = cfb.into_inner().into_inner();

        let result = PptParser::new().parse(Cursor::new(bytes), "doc.ppt");
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_not_a_compound_file() {
        let result = PptParser::new().parse(Cursor::new(b"plain text".to_vec()), "x.ppt");
        assert!(matches!(result, Err(Error::CfbError(_))));
    }
}
