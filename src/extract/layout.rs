//! Content stream scanning.
//!
//! Walks a page's content stream once and records positioned text spans
//! and the placement of every image XObject. Coordinates of image
//! placements are converted to a top-left origin so they can be handed out
//! as [`BoundingBox`]es.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document as LopdfDocument, Encoding, Object, ObjectId};

use super::BoundingBox;
use crate::error::{Error, Result};

/// Text advance used by `T*` when no `TL` operator set a leading.
const DEFAULT_LEADING: f32 = 12.0;

/// TJ adjustment (thousandths of a text unit) treated as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A text span with position information (PDF coordinates, bottom-up).
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Width of the text, 0 when unknown
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a new text span with unknown width.
    pub fn new(text: String, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            text,
            x,
            y,
            width: 0.0,
            font_size,
        }
    }
}

/// Spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Spans sorted by X position
    pub spans: Vec<TextSpan>,
    /// Baseline of the first span
    pub y: f32,
}

impl TextLine {
    /// Build a line from spans, sorting them left to right.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
        let y = spans.first().map(|s| s.y).unwrap_or(0.0);
        Self { spans, y }
    }

    /// Join the spans, inserting a space at gaps except between CJK glyphs.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - (prev.x + prev.width);
                let avg_char_width = match span.text.chars().count() {
                    n if n > 0 && span.width > 0.0 => span.width / n as f32,
                    _ => span.font_size * 0.5,
                };

                let spaceless = matches!(
                    (prev.text.chars().last(), span.text.chars().next()),
                    (Some(a), Some(b)) if is_spaceless_script_char(a) && is_spaceless_script_char(b)
                );
                let has_space = prev.text.ends_with([' ', '\u{00A0}'])
                    || span.text.starts_with([' ', '\u{00A0}']);

                if gap > avg_char_width * 0.2 && !spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }
}

/// Where an image XObject is drawn on the page.
#[derive(Debug, Clone)]
pub struct ImagePlacement {
    /// The image stream
    pub object_id: ObjectId,
    /// Drawn area, top-left origin
    pub bbox: BoundingBox,
}

/// Everything a page's content stream draws that extraction cares about.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    /// Text spans in stream order
    pub spans: Vec<TextSpan>,
    /// Image placements in stream order
    pub images: Vec<ImagePlacement>,
}

impl PageLayout {
    /// Group spans into lines, top of the page first.
    pub fn lines(&self) -> Vec<TextLine> {
        let mut spans = self.spans.clone();
        spans.sort_by(|a, b| {
            b.y.partial_cmp(&a.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in spans {
            let tolerance = span.font_size * 0.3;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    if !current.is_empty() {
                        lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                    }
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }
        if !current.is_empty() {
            lines.push(TextLine::from_spans(current));
        }

        lines
    }

    /// Page text, one line per baseline.
    pub fn text(&self) -> String {
        self.lines()
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An affine transform `[a b c d e f]` as used by `cm` and `Tm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(ops: &[Object]) -> Option<Self> {
        if ops.len() < 6 {
            return None;
        }
        Some(Self {
            a: get_number(&ops[0])?,
            b: get_number(&ops[1])?,
            c: get_number(&ops[2])?,
            d: get_number(&ops[3])?,
            e: get_number(&ops[4])?,
            f: get_number(&ops[5])?,
        })
    }

    /// `self × other`: apply `self` first, then `other`.
    pub(crate) fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub(crate) fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Bounding box of the unit square under this transform, PDF coordinates.
    pub(crate) fn unit_square_bounds(&self) -> (f32, f32, f32, f32) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        (min_x, min_y, max_x, max_y)
    }
}

/// Text state for one BT/ET section.
#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            leading: DEFAULT_LEADING,
        }
    }
}

impl TextState {
    fn translate(&mut self, tx: f32, ty: f32) {
        let shift = Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        };
        self.line_matrix = shift.then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn set(&mut self, m: Matrix) {
        self.line_matrix = m;
        self.matrix = m;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.translate(0.0, -leading);
    }
}

/// Scans one page of a lopdf document.
pub struct ContentScanner<'a> {
    doc: &'a LopdfDocument,
    page_id: ObjectId,
    origin: (f32, f32),
    page_height: f32,
}

impl<'a> ContentScanner<'a> {
    /// Create a scanner for `page_id`.
    ///
    /// `origin` is the lower-left corner of the page's MediaBox and
    /// `page_height` its height; both are used to express image placements
    /// relative to the top-left corner of the visible page.
    pub fn new(
        doc: &'a LopdfDocument,
        page_id: ObjectId,
        origin: (f32, f32),
        page_height: f32,
    ) -> Self {
        Self {
            doc,
            page_id,
            origin,
            page_height,
        }
    }

    /// Decode the content stream and collect spans and image placements.
    pub fn scan(&self) -> Result<PageLayout> {
        let data = self.page_content()?;
        let content =
            lopdf::content::Content::decode(&data).map_err(|e| Error::PdfParse(e.to_string()))?;

        let fonts = self
            .doc
            .get_page_fonts(self.page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;
        let encodings: BTreeMap<Vec<u8>, Encoding> = fonts
            .iter()
            .filter_map(|(name, dict)| {
                dict.get_font_encoding(self.doc)
                    .ok()
                    .map(|enc| (name.clone(), enc))
            })
            .collect();
        let xobjects = self.page_xobjects();

        let mut layout = PageLayout::default();
        let mut ctm = Matrix::IDENTITY;
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut font_name: Vec<u8> = Vec::new();
        let mut font_size: f32 = 12.0;
        let mut in_text = false;

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => ctm = ctm_stack.pop().unwrap_or(Matrix::IDENTITY),
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        if let Some(&object_id) = xobjects.get(name) {
                            layout.images.push(self.placement(object_id, &ctm));
                        }
                    }
                }
                "BT" => {
                    in_text = true;
                    text = TextState {
                        leading: text.leading,
                        ..TextState::default()
                    };
                }
                "ET" => in_text = false,
                "TL" => {
                    if let Some(l) = operands.first().and_then(get_number) {
                        text.leading = l;
                    }
                }
                "Tf" => {
                    if operands.len() >= 2 {
                        if let Object::Name(name) = &operands[0] {
                            font_name = name.clone();
                        }
                        font_size = get_number(&operands[1]).unwrap_or(12.0);
                    }
                }
                "Td" | "TD" => {
                    if operands.len() >= 2 {
                        let tx = get_number(&operands[0]).unwrap_or(0.0);
                        let ty = get_number(&operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            text.leading = -ty;
                        }
                        text.translate(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text.set(m);
                    }
                }
                "T*" => text.next_line(),
                "Tj" | "TJ" | "'" | "\"" => {
                    if op.operator == "'" || op.operator == "\"" {
                        text.next_line();
                    }
                    if !in_text {
                        continue;
                    }
                    let encoding = encodings.get(&font_name);
                    let decoded = match op.operator.as_str() {
                        "TJ" => match operands.first() {
                            Some(Object::Array(items)) => decode_tj(items, encoding),
                            _ => String::new(),
                        },
                        "\"" => operands
                            .get(2)
                            .map(|o| decode_string(o, encoding))
                            .unwrap_or_default(),
                        _ => operands
                            .first()
                            .map(|o| decode_string(o, encoding))
                            .unwrap_or_default(),
                    };

                    if !decoded.trim().is_empty() {
                        let placed = text.matrix.then(&ctm);
                        let (x, y) = placed.apply(0.0, 0.0);
                        let size = font_size * placed.vertical_scale();
                        layout.spans.push(TextSpan::new(decoded, x, y, size));
                    }
                }
                _ => {}
            }
        }

        log::debug!(
            "Page {:?}: {} spans, {} images",
            self.page_id,
            layout.spans.len(),
            layout.images.len()
        );
        Ok(layout)
    }

    fn placement(&self, object_id: ObjectId, ctm: &Matrix) -> ImagePlacement {
        let (min_x, min_y, max_x, max_y) = ctm.unit_square_bounds();
        let (ox, oy) = self.origin;
        ImagePlacement {
            object_id,
            bbox: BoundingBox::new(
                min_x - ox,
                self.page_height - (max_y - oy),
                max_x - ox,
                self.page_height - (min_y - oy),
            ),
        }
    }

    /// Get page content stream.
    fn page_content(&self) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(self.page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r) {
                Ok(Object::Stream(s)) => s
                    .decompressed_content()
                    .or_else(|_| Ok(s.content.clone())),
                Ok(Object::Array(arr)) => Ok(self.concat_streams(arr)),
                _ => Err(Error::PdfParse("Invalid content stream".to_string())),
            },
            Object::Array(arr) => Ok(self.concat_streams(arr)),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in refs {
            if let Ok(r) = obj.as_reference() {
                if let Ok(Object::Stream(s)) = self.doc.get_object(r) {
                    let data = s.decompressed_content().unwrap_or_else(|_| s.content.clone());
                    content.extend_from_slice(&data);
                    content.push(b' ');
                }
            }
        }
        content
    }

    /// Image XObjects reachable from the page resources, by resource name.
    fn page_xobjects(&self) -> BTreeMap<Vec<u8>, ObjectId> {
        let mut images = BTreeMap::new();
        let Some(resources) = self.page_resources() else {
            return images;
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve_dict(self.doc, o))
        else {
            return images;
        };

        for (name, obj) in xobjects.iter() {
            let Ok(id) = obj.as_reference() else {
                continue;
            };
            if let Ok(Object::Stream(stream)) = self.doc.get_object(id) {
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|s| s.as_name_str())
                    .map(|s| s == "Image")
                    .unwrap_or(false);
                if is_image {
                    images.insert(name.clone(), id);
                }
            }
        }
        images
    }

    /// The page's resource dictionary, following inheritance through `Parent`.
    fn page_resources(&self) -> Option<&'a Dictionary> {
        let mut node = self.doc.get_dictionary(self.page_id).ok()?;
        for _ in 0..32 {
            if let Ok(res) = node.get(b"Resources") {
                return resolve_dict(self.doc, res);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }
}

/// Follow a reference (if any) to a dictionary.
pub(crate) fn resolve_dict<'d>(doc: &'d LopdfDocument, obj: &'d Object) -> Option<&'d Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d),
        Object::Reference(r) => doc.get_dictionary(*r).ok(),
        _ => None,
    }
}

fn decode_string(obj: &Object, encoding: Option<&Encoding>) -> String {
    match obj {
        Object::String(bytes, _) => decode_bytes(bytes, encoding),
        _ => String::new(),
    }
}

fn decode_bytes(bytes: &[u8], encoding: Option<&Encoding>) -> String {
    encoding
        .and_then(|enc| LopdfDocument::decode_text(enc, bytes).ok())
        .unwrap_or_else(|| decode_text_simple(bytes))
}

/// Decode a TJ array. Large negative adjustments become word spaces,
/// except after CJK glyphs.
fn decode_tj(items: &[Object], encoding: Option<&Encoding>) -> String {
    let mut combined = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode_bytes(bytes, encoding)),
            other => {
                let Some(n) = get_number(other) else {
                    continue;
                };
                if -n > TJ_SPACE_THRESHOLD && !combined.ends_with([' ', '\u{00A0}']) {
                    if let Some(c) = combined.chars().last() {
                        if !is_spaceless_script_char(c) {
                            combined.push(' ');
                        }
                    }
                }
            }
        }
    }
    combined
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        // Hiragana, Katakana
        || (0x3040..=0x30FF).contains(&code)
        // CJK Symbols and Punctuation
        || (0x3000..=0x303F).contains(&code)
        // Fullwidth forms
        || (0xFF00..=0xFFEF).contains(&code)
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
