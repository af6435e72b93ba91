//! Building a [`Book`] from a source document.
//!
//! PDF access goes through the [`DocumentOpener`] / [`DocumentSource`] /
//! [`SourcePage`] traits so the segmentation logic in [`Extractor`] does not
//! depend on a particular PDF library. [`LopdfOpener`] is the default
//! implementation.

mod layout;
mod lopdf_source;
mod table_detector;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Book, Content, Grid, Page};

pub use layout::{decode_text_simple, ContentScanner, PageLayout, TextLine, TextSpan};
pub use lopdf_source::{LopdfOpener, LopdfPage, LopdfSource};
pub use table_detector::{TableDetector, TableDetectorConfig};

/// Name of the directory, next to the source PDF, that receives image regions.
pub const DEFAULT_IMAGE_DIR: &str = "parserimages";

/// A rectangle on a page, top-left origin, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x0: f32,
    /// Top edge, measured from the top of the page
    pub top: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge, measured from the top of the page
    pub bottom: f32,
}

impl BoundingBox {
    /// Create a box from its edges.
    pub fn new(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Horizontal extent.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Vertical extent.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Clamp the box to a page of the given size.
    pub fn clamp_to(&self, page_width: f32, page_height: f32) -> Self {
        Self {
            x0: self.x0.max(0.0),
            top: self.top.max(0.0),
            x1: self.x1.min(page_width),
            bottom: self.bottom.min(page_height),
        }
    }

    /// True when the box has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Area shared with `other`.
    pub fn overlap_area(&self, other: &BoundingBox) -> f32 {
        let w = self.x1.min(other.x1) - self.x0.max(other.x0);
        let h = self.bottom.min(other.bottom) - self.top.max(other.top);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }
}

/// Opens source documents.
pub trait DocumentOpener {
    /// Open the document at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentSource>>;
}

/// An opened source document.
pub trait DocumentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Open the page at zero-based `index`.
    fn page(&self, index: usize) -> Result<Box<dyn SourcePage + '_>>;
}

/// Extraction primitives for one page.
pub trait SourcePage {
    /// Page number, 1-based.
    fn number(&self) -> u32;

    /// Page width in points.
    fn width(&self) -> f32;

    /// Page height in points.
    fn height(&self) -> f32;

    /// All text on the page, table cells included. May be empty.
    fn extract_text(&self) -> Result<String>;

    /// Every table on the page as a grid of cell strings.
    fn extract_tables(&self) -> Result<Vec<Grid>>;

    /// Bounding boxes of the images drawn on the page.
    fn list_images(&self) -> Vec<BoundingBox>;

    /// Rasterize the region as PNG bytes.
    fn render_region(&self, region: &BoundingBox) -> Result<Vec<u8>>;
}

/// Options for the extractor.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Where image regions are written. Defaults to `parserimages/` next to
    /// the source document.
    pub image_dir: Option<PathBuf>,
}

impl ExtractOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image directory.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// The image directory used for `source`.
    pub fn image_dir_for(&self, source: &Path) -> PathBuf {
        self.image_dir.clone().unwrap_or_else(|| {
            source
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(DEFAULT_IMAGE_DIR)
        })
    }
}

/// Splits each page of a document into text, table, and image units.
pub struct Extractor {
    opener: Box<dyn DocumentOpener>,
    options: ExtractOptions,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Box::new(LopdfOpener::default()))
    }
}

impl Extractor {
    /// Create an extractor around an opener.
    pub fn new(opener: Box<dyn DocumentOpener>) -> Self {
        Self {
            opener,
            options: ExtractOptions::default(),
        }
    }

    /// Set extraction options.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Build a book from the first `pages` pages of `path` (all when `None`).
    ///
    /// Fails with [`Error::PageOutOfRange`] before touching any page when
    /// `pages` exceeds the document length.
    pub fn extract(&self, path: &Path, pages: Option<usize>) -> Result<Book> {
        let source = self.opener.open(path)?;
        let available = source.page_count();

        let count = match pages {
            Some(requested) if requested > available => {
                return Err(Error::PageOutOfRange {
                    requested,
                    available,
                });
            }
            Some(requested) => requested,
            None => available,
        };

        let image_dir = self.options.image_dir_for(path);
        let mut book = Book::new(path);
        for index in 0..count {
            let page = source.page(index)?;
            book.add_page(self.extract_page(page.as_ref(), &image_dir)?);
        }

        log::info!(
            "Extracted {} of {} pages from {}",
            count,
            available,
            path.display()
        );
        Ok(book)
    }

    fn extract_page(&self, source: &dyn SourcePage, image_dir: &Path) -> Result<Page> {
        let mut page = Page::new(source.number(), source.width(), source.height());

        let raw_text = source.extract_text()?;
        let tables = source.extract_tables()?;

        let text = normalize_lines(&strip_table_cells(raw_text, &tables));
        if !text.is_empty() {
            log::debug!("[text] page {}:\n{}", page.number, text);
            page.add_content(Content::text(text));
        }

        if !tables.is_empty() {
            log::debug!("[table] page {}: {} table(s)", page.number, tables.len());
            page.add_content(Content::table(tables));
        }

        for (idx, bbox) in source.list_images().into_iter().enumerate() {
            let region = bbox.clamp_to(source.width(), source.height());
            if region.is_empty() {
                log::warn!(
                    "Skipping image {} on page {}: region {:?} lies outside the page",
                    idx,
                    page.number,
                    bbox
                );
                continue;
            }

            let bytes = match source.render_region(&region) {
                Ok(bytes) => bytes,
                Err(e @ Error::ImageExtract(_)) | Err(e @ Error::Image(_)) => {
                    log::warn!("Skipping image {} on page {}: {}", idx, page.number, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            fs::create_dir_all(image_dir)?;
            let path = image_dir.join(image_file_name(page.number, idx));
            fs::write(&path, bytes)?;
            log::debug!("[image] {}", path.display());
            page.add_content(Content::image(path));
        }

        Ok(page)
    }
}

/// File name for the `idx`-th image region of page `page_number`.
pub fn image_file_name(page_number: u32, idx: usize) -> String {
    format!("page_{}_image_{}.png", page_number, idx)
}

/// Remove the first occurrence of every table cell's text from `text`.
///
/// Best effort: if a cell's text also occurs earlier in the prose, the
/// earlier occurrence is the one removed.
pub fn strip_table_cells(mut text: String, tables: &[Grid]) -> String {
    for cell in tables.iter().flatten().flatten() {
        if cell.is_empty() {
            continue;
        }
        if let Some(pos) = text.find(cell.as_str()) {
            text.replace_range(pos..pos + cell.len(), "");
        }
    }
    text
}

/// Trim every line, drop blank ones, and rejoin with `\n`.
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_bbox_clamp_and_overlap() {
        let bbox = BoundingBox::new(-5.0, 10.0, 700.0, 900.0).clamp_to(612.0, 792.0);
        assert_eq!(bbox, BoundingBox::new(0.0, 10.0, 612.0, 792.0));
        assert!(!bbox.is_empty());

        let outside = BoundingBox::new(700.0, 10.0, 800.0, 20.0).clamp_to(612.0, 792.0);
        assert!(outside.is_empty());

        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 20.0, 20.0);
        assert_eq!(a.overlap_area(&b), 25.0);
        assert_eq!(a.overlap_area(&BoundingBox::new(10.0, 0.0, 20.0, 10.0)), 0.0);
    }

    #[test]
    fn test_strip_table_cells_first_occurrence() {
        let text = "Intro A\nA B\n1 2".to_string();
        let tables = vec![grid(&[&["A", "B"], &["1", "2"]])];
        assert_eq!(strip_table_cells(text, &tables), "Intro \n \n ");
    }

    #[test]
    fn test_strip_table_cells_skips_empty() {
        let tables = vec![grid(&[&["", "x"]])];
        assert_eq!(strip_table_cells("axb".to_string(), &tables), "ab");
    }

    #[test]
    fn test_normalize_lines() {
        assert_eq!(normalize_lines("  a \n\n   \n b\n"), "a\nb");
        assert_eq!(normalize_lines(" \n \n"), "");
    }

    #[test]
    fn test_image_dir_defaults_next_to_source() {
        let options = ExtractOptions::new();
        assert_eq!(
            options.image_dir_for(Path::new("docs/paper.pdf")),
            PathBuf::from("docs/parserimages")
        );
        let options = options.with_image_dir("/tmp/out");
        assert_eq!(
            options.image_dir_for(Path::new("docs/paper.pdf")),
            PathBuf::from("/tmp/out")
        );
    }

    #[test]
    fn test_image_file_name() {
        assert_eq!(image_file_name(3, 0), "page_3_image_0.png");
    }
}
