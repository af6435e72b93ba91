//! Content units and their translation state.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::resource::ImageHandle;
use super::table::{grids_to_text, Grid, TableGrid};
use crate::error::{Error, Result};

/// The kind of a content unit. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// A block of prose
    Text,
    /// All tables found on one page
    Table,
    /// A raster region cut out of the page
    Image,
}

impl ContentKind {
    /// Lower-case name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Table => "table",
            ContentKind::Image => "image",
        }
    }

    /// Whether units of this kind are sent to the translation service.
    pub fn is_translatable(&self) -> bool {
        matches!(self, ContentKind::Text | ContentKind::Table)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted payload of a content unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Original {
    /// Normalized page text
    Text(String),
    /// Every table grid extracted from the page
    Table(Vec<Grid>),
    /// Path of the saved raster region
    Image(PathBuf),
}

/// Translated payload of a content unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Translation {
    /// Translated prose
    Text(String),
    /// Table rebuilt from the service reply
    Table(TableGrid),
    /// Image passed through untranslated
    Image(ImageHandle),
}

impl Translation {
    fn kind(&self) -> ContentKind {
        match self {
            Translation::Text(_) => ContentKind::Text,
            Translation::Table(_) => ContentKind::Table,
            Translation::Image(_) => ContentKind::Image,
        }
    }
}

/// A value offered to [`Content::set_translation`].
///
/// Text and table units take the raw service reply; image units take a
/// loaded image handle.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationValue {
    /// Raw reply text
    Text(String),
    /// Loaded image
    Image(ImageHandle),
}

impl TranslationValue {
    fn kind_name(&self) -> &'static str {
        match self {
            TranslationValue::Text(_) => "text",
            TranslationValue::Image(_) => "image",
        }
    }
}

impl From<String> for TranslationValue {
    fn from(text: String) -> Self {
        TranslationValue::Text(text)
    }
}

impl From<&str> for TranslationValue {
    fn from(text: &str) -> Self {
        TranslationValue::Text(text.to_string())
    }
}

impl From<ImageHandle> for TranslationValue {
    fn from(handle: ImageHandle) -> Self {
        TranslationValue::Image(handle)
    }
}

/// One extracted unit of a page.
///
/// `status` is only ever true while `translation` holds a value of the
/// unit's own kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    original: Original,
    translation: Option<Translation>,
    status: bool,
}

impl Content {
    /// Create a text unit.
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_original(Original::Text(text.into()))
    }

    /// Create a table unit holding every grid of a page.
    pub fn table(grids: Vec<Grid>) -> Self {
        Self::from_original(Original::Table(grids))
    }

    /// Create an image unit pointing at a saved raster file.
    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self::from_original(Original::Image(path.into()))
    }

    fn from_original(original: Original) -> Self {
        Self {
            original,
            translation: None,
            status: false,
        }
    }

    /// The unit's kind.
    pub fn kind(&self) -> ContentKind {
        match self.original {
            Original::Text(_) => ContentKind::Text,
            Original::Table(_) => ContentKind::Table,
            Original::Image(_) => ContentKind::Image,
        }
    }

    /// The extracted payload.
    pub fn original(&self) -> &Original {
        &self.original
    }

    /// The translated payload, if any.
    pub fn translation(&self) -> Option<&Translation> {
        self.translation.as_ref()
    }

    /// Whether the translation is usable for rendering.
    pub fn status(&self) -> bool {
        self.status
    }

    /// Path of the image resource, for image units.
    pub fn image_path(&self) -> Option<&Path> {
        match &self.original {
            Original::Image(path) => Some(path),
            _ => None,
        }
    }

    /// The original payload as prompt text. Images have none.
    pub fn original_text(&self) -> Option<String> {
        match &self.original {
            Original::Text(text) => Some(text.clone()),
            Original::Table(grids) => Some(grids_to_text(grids)),
            Original::Image(_) => None,
        }
    }

    /// Store a translation result.
    ///
    /// Text units accept reply text only. Table units parse the reply into a
    /// [`TableGrid`]; a reply that cannot be parsed is logged and leaves the
    /// unit untranslated with `status == false` instead of failing. Image
    /// units accept an image handle only.
    ///
    /// Returns [`Error::TranslationTypeMismatch`] for a text or image unit
    /// given the wrong kind of value, leaving the unit unchanged.
    pub fn set_translation(
        &mut self,
        value: impl Into<TranslationValue>,
        success: bool,
    ) -> Result<()> {
        let value = value.into();
        let translation = match (self.kind(), value) {
            (ContentKind::Text, TranslationValue::Text(text)) => Translation::Text(text),
            (ContentKind::Image, TranslationValue::Image(handle)) => Translation::Image(handle),
            (ContentKind::Table, TranslationValue::Text(reply)) => {
                match TableGrid::parse_delimited(&reply) {
                    Ok(grid) => Translation::Table(grid),
                    Err(e) => {
                        log::error!("An error occurred during table translation: {}", e);
                        self.clear_translation();
                        return Ok(());
                    }
                }
            }
            (ContentKind::Table, other) => {
                log::error!(
                    "An error occurred during table translation: expected text reply, got {}",
                    other.kind_name()
                );
                self.clear_translation();
                return Ok(());
            }
            (kind, other) => {
                return Err(Error::TranslationTypeMismatch {
                    expected: kind.as_str(),
                    found: other.kind_name(),
                });
            }
        };

        debug_assert_eq!(translation.kind(), self.kind());
        self.translation = Some(translation);
        self.status = success;
        Ok(())
    }

    /// Record a failed attempt: no translation, `status == false`.
    pub fn mark_failed(&mut self) {
        self.clear_translation();
    }

    fn clear_translation(&mut self) {
        self.translation = None;
        self.status = false;
    }
}
