//! Paginated PDF output built with `printpdf` 0.8.
//!
//! Content is laid out top to bottom in a single column. Source pages map to
//! at least one output page each; long content flows onto further pages.

use std::fs;
use std::mem;
use std::path::Path;

use printpdf::{
    BuiltinFont, Color, FontId, Line, LinePoint, Mm, Op, PaintMode, ParsedFont, PdfDocument,
    PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Polygon, PolygonRing, Pt, RawImage, RawImageData,
    RawImageFormat, Rgb, TextItem, WindingOrder, XObjectTransform,
};

use super::RenderOptions;
use crate::error::{Error, Result};
use crate::model::{Book, Content, TableGrid, Translation};

const CELL_PADDING: f32 = 4.0;
const HEADER_BOTTOM_PADDING: f32 = 8.0;
const GRID_THICKNESS: f32 = 1.0;
const BLOCK_SPACING: f32 = 6.0;

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const GREY: (f32, f32, f32) = (0.5, 0.5, 0.5);
const WHITESMOKE: (f32, f32, f32) = (0.96, 0.96, 0.96);
const BEIGE: (f32, f32, f32) = (0.96, 0.96, 0.86);

/// Render the translated units of `book` as PDF bytes.
pub fn to_pdf(book: &Book, options: &RenderOptions) -> Result<Vec<u8>> {
    let title = book
        .source_path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Translated document".to_string());

    let mut composer = PageComposer::new(&title, options)?;
    let pages = book.pages();
    for (idx, page) in pages.iter().enumerate() {
        for content in page.contents().iter().filter(|c| c.status()) {
            composer.add_content(content);
        }
        if idx + 1 < pages.len() {
            composer.page_break();
        }
    }
    Ok(composer.finish())
}

#[derive(Debug, Clone)]
enum FontChoice {
    Builtin(BuiltinFont),
    External(FontId),
}

impl FontChoice {
    fn set_size(&self, size: f32) -> Op {
        match self {
            FontChoice::Builtin(font) => Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font: *font,
            },
            FontChoice::External(font) => Op::SetFontSize {
                size: Pt(size),
                font: font.clone(),
            },
        }
    }

    fn write(&self, text: &str) -> Op {
        let items = vec![TextItem::Text(text.to_string())];
        match self {
            FontChoice::Builtin(font) => Op::WriteTextBuiltinFont { items, font: *font },
            FontChoice::External(font) => Op::WriteText {
                items,
                font: font.clone(),
            },
        }
    }
}

/// Places blocks on pages and tracks the vertical cursor.
///
/// Coordinates are PDF points with the origin at the bottom-left corner.
struct PageComposer<'a> {
    doc: PdfDocument,
    options: &'a RenderOptions,
    font: FontChoice,
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    page_width: f32,
    page_height: f32,
    margin: f32,
    cursor_y: f32,
    warned_glyphs: bool,
}

impl<'a> PageComposer<'a> {
    fn new(title: &str, options: &'a RenderOptions) -> Result<Self> {
        let mut doc = PdfDocument::new(title);
        let font = match &options.font_path {
            Some(path) => FontChoice::External(load_font(&mut doc, path)?),
            None => FontChoice::Builtin(BuiltinFont::Helvetica),
        };

        let page_width = Mm(options.page_size.width_mm).into_pt().0;
        let page_height = Mm(options.page_size.height_mm).into_pt().0;
        let margin = Mm(options.margin_mm).into_pt().0;

        Ok(Self {
            doc,
            options,
            font,
            pages: Vec::new(),
            ops: Vec::new(),
            page_width,
            page_height,
            margin,
            cursor_y: page_height - margin,
            warned_glyphs: false,
        })
    }

    fn content_width(&self) -> f32 {
        (self.page_width - 2.0 * self.margin).max(1.0)
    }

    fn content_height(&self) -> f32 {
        (self.page_height - 2.0 * self.margin).max(1.0)
    }

    fn top(&self) -> f32 {
        self.page_height - self.margin
    }

    fn at_page_top(&self) -> bool {
        self.cursor_y >= self.top()
    }

    /// Start a new page unless `height` still fits below the cursor.
    fn ensure_space(&mut self, height: f32) {
        if self.cursor_y - height < self.margin && !self.at_page_top() {
            self.page_break();
        }
    }

    fn page_break(&mut self) {
        let ops = mem::take(&mut self.ops);
        self.pages.push(PdfPage::new(
            Mm(self.options.page_size.width_mm),
            Mm(self.options.page_size.height_mm),
            ops,
        ));
        self.cursor_y = self.top();
    }

    fn finish(mut self) -> Vec<u8> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.page_break();
        }
        let pages = mem::take(&mut self.pages);
        log::debug!("Writing {} PDF page(s)", pages.len());
        self.doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        for warning in &warnings {
            log::debug!("printpdf: {:?}", warning);
        }
        bytes
    }

    fn add_content(&mut self, content: &Content) {
        match content.translation() {
            Some(Translation::Text(text)) => self.paragraph(text),
            Some(Translation::Table(table)) => self.table(table),
            Some(Translation::Image(_)) => {
                if let Some(path) = content.image_path() {
                    self.image(path);
                }
            }
            None => {}
        }
    }

    fn check_glyphs(&mut self, text: &str) {
        if self.warned_glyphs || !matches!(self.font, FontChoice::Builtin(_)) {
            return;
        }
        if text.chars().any(|c| c as u32 > 0xFF) {
            log::warn!(
                "Text contains characters the built-in font cannot show; set a font file to render them"
            );
            self.warned_glyphs = true;
        }
    }

    fn text_at(&mut self, text: &str, x: f32, y: f32, size: f32, color: (f32, f32, f32)) {
        self.ops.push(Op::SetFillColor { col: rgb(color) });
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        });
        self.ops.push(self.font.set_size(size));
        self.ops.push(self.font.write(text));
        self.ops.push(Op::EndTextSection);
    }

    fn paragraph(&mut self, text: &str) {
        self.check_glyphs(text);
        let size = self.options.font_size;
        let leading = self.options.leading;

        for line in wrap_text(text, self.content_width(), size) {
            self.ensure_space(leading);
            let baseline = self.cursor_y - size;
            if !line.is_empty() {
                self.text_at(&line, self.margin, baseline, size, BLACK);
            }
            self.cursor_y -= leading;
        }
        self.cursor_y -= BLOCK_SPACING;
    }

    fn table(&mut self, table: &TableGrid) {
        if table.is_empty() {
            log::warn!("Skipping empty table");
            return;
        }
        for cell in table.header().iter().chain(table.rows().iter().flatten()) {
            self.check_glyphs(cell);
        }

        let columns = table.column_count();
        let col_width = self.content_width() / columns as f32;

        self.table_row(table.header(), col_width, true);
        for row in table.rows() {
            self.table_row(row, col_width, false);
        }
        self.cursor_y -= BLOCK_SPACING;
    }

    fn table_row(&mut self, cells: &[String], col_width: f32, header: bool) {
        let size = if header {
            self.options.header_font_size
        } else {
            self.options.font_size
        };
        let line_height = size * 1.2;
        let bottom_padding = if header {
            HEADER_BOTTOM_PADDING
        } else {
            CELL_PADDING
        };
        let inner_width = (col_width - 2.0 * CELL_PADDING).max(size);

        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .map(|cell| wrap_text(cell, inner_width, size))
            .collect();
        let max_lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let row_height = max_lines as f32 * line_height + CELL_PADDING + bottom_padding;

        self.ensure_space(row_height);
        let top = self.cursor_y;
        let bottom = top - row_height;
        let (fill, text_color) = if header {
            (GREY, WHITESMOKE)
        } else {
            (BEIGE, BLACK)
        };

        for (col, lines) in wrapped.iter().enumerate() {
            let x0 = self.margin + col as f32 * col_width;
            let x1 = x0 + col_width;
            self.fill_rect(x0, bottom, x1, top, fill);
            self.stroke_rect(x0, bottom, x1, top);

            for (i, line) in lines.iter().enumerate() {
                let width = text_width(line, size);
                let x = x0 + ((col_width - width) / 2.0).max(CELL_PADDING);
                let baseline = top - CELL_PADDING - size - i as f32 * line_height;
                self.text_at(line, x, baseline, size, text_color);
            }
        }

        self.cursor_y = bottom;
    }

    fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: (f32, f32, f32)) {
        self.ops.push(Op::SetFillColor { col: rgb(color) });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: rect_points(x0, y0, x1, y1),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn stroke_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.ops.push(Op::SetOutlineColor { col: rgb(BLACK) });
        self.ops.push(Op::SetOutlineThickness {
            pt: Pt(GRID_THICKNESS),
        });
        self.ops.push(Op::DrawLine {
            line: Line {
                points: rect_points(x0, y0, x1, y1),
                is_closed: true,
            },
        });
    }

    fn image(&mut self, path: &Path) {
        if !path.is_file() {
            log::error!("Image file not found: {}", path.display());
            return;
        }
        let decoded = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                log::error!("Unable to decode image {}: {}", path.display(), e);
                return;
            }
        };

        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            log::warn!("Skipping zero-sized image {}", path.display());
            return;
        }
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let id = self.doc.add_image(&raw);

        let scale = fit_scale(
            width as f32,
            height as f32,
            self.content_width(),
            self.content_height(),
        );
        let drawn_height = height as f32 * scale;

        self.ensure_space(drawn_height);
        let y = self.cursor_y - drawn_height;
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(self.margin)),
                translate_y: Some(Pt(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(72.0),
                rotate: None,
            },
        });
        self.cursor_y = y - BLOCK_SPACING;
        log::info!("Image added to PDF: {}", path.display());
    }
}

fn load_font(doc: &mut PdfDocument, path: &Path) -> Result<FontId> {
    let bytes = fs::read(path).map_err(|_| Error::MissingResource(path.to_path_buf()))?;
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let font = ParsedFont::from_bytes(&bytes, 0, &mut warnings).ok_or_else(|| {
        Error::Render(format!("unable to parse font {}", path.display()))
    })?;
    Ok(doc.add_font(&font))
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb {
        r,
        g,
        b,
        icc_profile: None,
    })
}

fn rect_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<LinePoint> {
    [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
        .into_iter()
        .map(|(x, y)| LinePoint {
            p: Point { x: Pt(x), y: Pt(y) },
            bezier: false,
        })
        .collect()
}

/// Scale factor that fits an image into the box. Never above 1.
pub(crate) fn fit_scale(width: f32, height: f32, max_width: f32, max_height: f32) -> f32 {
    if width <= 0.0 || height <= 0.0 {
        return 1.0;
    }
    (max_width / width).min(max_height / height).min(1.0)
}

fn is_wide_char(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}

/// Rough advance width of one glyph. There are no font metrics at hand, so
/// wide (CJK) glyphs count as one em and everything else as about half.
fn glyph_width(c: char, size: f32) -> f32 {
    if is_wide_char(c) {
        size
    } else if c == ' ' {
        0.28 * size
    } else if c.is_uppercase() {
        0.66 * size
    } else {
        0.52 * size
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(|c| glyph_width(c, size)).sum()
}

/// Break text into lines no wider than `max_width` points.
///
/// Existing newlines are kept. Words wrap at spaces; wide glyphs may wrap
/// anywhere; words longer than a line are broken by character.
pub(crate) fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph.trim_end(), max_width, size, &mut lines);
    }
    lines
}

fn wrap_paragraph(paragraph: &str, max_width: f32, size: f32, lines: &mut Vec<String>) {
    let space = glyph_width(' ', size);
    let mut line = String::new();
    let mut width = 0.0;

    for (token, spaced) in tokens(paragraph) {
        let token_width = text_width(token, size);
        let gap = if spaced && !line.is_empty() { space } else { 0.0 };

        if width + gap + token_width <= max_width {
            if gap > 0.0 {
                line.push(' ');
            }
            line.push_str(token);
            width += gap + token_width;
            continue;
        }

        if !line.is_empty() {
            lines.push(mem::take(&mut line));
            width = 0.0;
        }

        if token_width <= max_width {
            line.push_str(token);
            width = token_width;
        } else {
            for c in token.chars() {
                let w = glyph_width(c, size);
                if width + w > max_width && !line.is_empty() {
                    lines.push(mem::take(&mut line));
                    width = 0.0;
                }
                line.push(c);
                width += w;
            }
        }
    }

    lines.push(line);
}

/// Split into wrap units: runs of narrow non-space characters, or single
/// wide characters. The flag is set when whitespace preceded the unit.
fn tokens(text: &str) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut spaced = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((&text[s..i], spaced));
            }
            spaced = true;
        } else if is_wide_char(c) {
            if let Some(s) = start.take() {
                out.push((&text[s..i], spaced));
                spaced = false;
            }
            out.push((&text[i..i + c.len_utf8()], spaced));
            spaced = false;
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((&text[s..], spaced));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageHandle, Page};

    #[test]
    fn test_fit_scale_never_upscales() {
        assert_eq!(fit_scale(100.0, 50.0, 400.0, 600.0), 1.0);
        assert_eq!(fit_scale(800.0, 100.0, 400.0, 600.0), 0.5);
        assert_eq!(fit_scale(100.0, 1200.0, 400.0, 600.0), 0.5);
    }

    #[test]
    fn test_wrap_latin_words() {
        // 10pt: lower-case glyphs are 5.2pt wide, spaces 2.8pt.
        let lines = wrap_text("aaaa bbbb cccc", 45.0, 10.0);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_wrap_keeps_newlines() {
        let lines = wrap_text("one\n\ntwo", 500.0, 12.0);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn test_wrap_cjk_per_character() {
        let lines = wrap_text("你好世界", 25.0, 10.0);
        assert_eq!(lines, vec!["你好", "世界"]);
    }

    #[test]
    fn test_wrap_breaks_long_word() {
        let lines = wrap_text("abcdefghij", 20.0, 10.0);
        assert_eq!(lines, vec!["abc", "def", "ghi", "j"]);
    }

    #[test]
    fn test_tokens() {
        let toks = tokens("ab 中文 cd");
        assert_eq!(
            toks,
            vec![("ab", false), ("中", true), ("文", false), ("cd", true)]
        );
        assert_eq!(tokens("  a \t b"), vec![("a", true), ("b", true)]);
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("page_1_image_0.png");
        image::RgbImage::from_pixel(8, 4, image::Rgb([200, 10, 10]))
            .save(&image_path)
            .unwrap();

        let mut text = Content::text("Hello");
        text.set_translation("Bonjour le monde", true).unwrap();
        let mut table = Content::table(vec![]);
        table.set_translation("H1 | H2\nA | B", true).unwrap();
        let mut image = Content::image(&image_path);
        image
            .set_translation(ImageHandle::new(&image_path, 8, 4), true)
            .unwrap();

        let mut book = Book::new(dir.path().join("doc.pdf"));
        let mut first = Page::new(1, 612.0, 792.0);
        first.add_content(text);
        first.add_content(image);
        book.add_page(first);
        let mut second = Page::new(2, 612.0, 792.0);
        second.add_content(table);
        book.add_page(second);

        let bytes = to_pdf(&book, &RenderOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 2);
    }

    #[test]
    fn test_missing_font_is_an_error() {
        let book = Book::new("doc.pdf");
        let options = RenderOptions::default().with_font("/nonexistent/font.ttf");
        assert!(matches!(
            to_pdf(&book, &options),
            Err(Error::MissingResource(_))
        ));
    }
}
