//! Rendering options and configuration.

use std::path::PathBuf;

/// Page geometry in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Width in mm
    pub width_mm: f32,
    /// Height in mm
    pub height_mm: f32,
}

impl PageSize {
    /// ISO A4, 210 x 297 mm.
    pub const A4: PageSize = PageSize {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    /// US Letter, 8.5 x 11 in.
    pub const LETTER: PageSize = PageSize {
        width_mm: 215.9,
        height_mm: 279.4,
    };

    /// Look up a named size (`A4`, `Letter`), ignoring case.
    pub fn from_name(name: &str) -> Option<PageSize> {
        match name.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "letter" => Some(Self::LETTER),
            _ => None,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Options for writing a translated book.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Output page size (paginated output only)
    pub page_size: PageSize,

    /// Margin on every side, in mm
    pub margin_mm: f32,

    /// TrueType/OpenType font used for all text. Without one the built-in
    /// Helvetica is used, which cannot show CJK or other non-Latin scripts.
    pub font_path: Option<PathBuf>,

    /// Body text size in points
    pub font_size: f32,

    /// Baseline-to-baseline distance for body text, in points
    pub leading: f32,

    /// Text size of table header rows, in points
    pub header_font_size: f32,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    /// Set the page margin in mm.
    pub fn with_margin(mut self, margin_mm: f32) -> Self {
        self.margin_mm = margin_mm.max(0.0);
        self
    }

    /// Set the font file.
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Set body font size and leading.
    pub fn with_font_size(mut self, size: f32, leading: f32) -> Self {
        self.font_size = size;
        self.leading = leading.max(size);
        self
    }

    /// Set the table header font size.
    pub fn with_header_font_size(mut self, size: f32) -> Self {
        self.header_font_size = size;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin_mm: 25.4,
            font_path: None,
            font_size: 12.0,
            leading: 14.0,
            header_font_size: 14.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert_eq!(options.page_size, PageSize::A4);
        assert_eq!(options.font_size, 12.0);
        assert_eq!(options.leading, 14.0);
        assert!(options.font_path.is_none());
    }

    #[test]
    fn test_builder() {
        let options = RenderOptions::new()
            .with_page_size(PageSize::LETTER)
            .with_margin(-3.0)
            .with_font("fonts/simsun.ttf")
            .with_font_size(10.0, 8.0);
        assert_eq!(options.margin_mm, 0.0);
        assert_eq!(options.leading, 10.0);
        assert_eq!(options.font_path, Some(PathBuf::from("fonts/simsun.ttf")));
    }

    #[test]
    fn test_page_size_from_name() {
        assert_eq!(PageSize::from_name("a4"), Some(PageSize::A4));
        assert_eq!(PageSize::from_name("Letter"), Some(PageSize::LETTER));
        assert_eq!(PageSize::from_name("B5"), None);
    }
}
