//! Page-level types.

use super::Content;
use serde::Serialize;

/// One source page and its content units in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    contents: Vec<Content>,
}

impl Page {
    /// Create an empty page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            contents: Vec::new(),
        }
    }

    /// Append a content unit. Units are never reordered afterwards.
    pub fn add_content(&mut self, content: Content) {
        self.contents.push(content);
    }

    /// Content units in extraction order.
    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    /// Mutable access for the translate pass. Order and length stay fixed.
    pub fn contents_mut(&mut self) -> &mut [Content] {
        &mut self.contents
    }

    /// Check if the page has no content units.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Number of content units.
    pub fn len(&self) -> usize {
        self.contents.len()
    }
}
