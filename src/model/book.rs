//! The book: one translation job's worth of pages.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{ContentKind, Page};

/// A source document broken into pages of content units.
///
/// Built by the extractor, mutated in place by the translator, then read by
/// the renderer. Each job owns its own book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    source: PathBuf,
    pages: Vec<Page>,
}

impl Book {
    /// Create an empty book for the given source document.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            pages: Vec::new(),
        }
    }

    /// Path of the source document.
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// Append a page.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Pages in document order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Mutable access for the translate pass.
    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Count content units of the given kind across all pages.
    pub fn count_kind(&self, kind: ContentKind) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.contents())
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Serialize the book (originals, translations and status) as pretty JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::Render(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Content;

    #[test]
    fn test_book_counts() {
        let mut book = Book::new("doc.pdf");
        let mut p1 = Page::new(1, 612.0, 792.0);
        p1.add_content(Content::text("a"));
        p1.add_content(Content::image("x.png"));
        let mut p2 = Page::new(2, 612.0, 792.0);
        p2.add_content(Content::text("b"));
        book.add_page(p1);
        book.add_page(p2);

        assert_eq!(book.page_count(), 2);
        assert_eq!(book.count_kind(ContentKind::Text), 2);
        assert_eq!(book.count_kind(ContentKind::Image), 1);
        assert_eq!(book.count_kind(ContentKind::Table), 0);
        assert_eq!(book.source_path(), Path::new("doc.pdf"));
    }

    #[test]
    fn test_book_json() {
        let mut book = Book::new("doc.pdf");
        let mut page = Page::new(1, 612.0, 792.0);
        page.add_content(Content::text("hello"));
        book.add_page(page);

        let json = book.to_json().unwrap();
        assert!(json.contains("\"hello\""));
        assert!(json.contains("\"status\": false"));
    }
}
