//! Error types for the transpdf library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for transpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, translating or writing a book.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source file is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// The requested page limit exceeds the document length.
    #[error("Page limit {requested} is out of range (document has {available} pages)")]
    PageOutOfRange {
        /// Number of pages requested.
        requested: usize,
        /// Number of pages in the document.
        available: usize,
    },

    /// A translation value does not match the shape its content kind requires.
    #[error("Invalid translation type: expected {expected}, got {found}")]
    TranslationTypeMismatch {
        /// Kind of the content being translated.
        expected: &'static str,
        /// Kind of the value that was supplied.
        found: &'static str,
    },

    /// A translated table reply could not be turned back into a grid.
    #[error("Table reconstruction error: {0}")]
    TableReconstruction(String),

    /// The requested output format is not supported.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// A resource referenced by the book is missing on disk.
    #[error("Resource not found: {}", .0.display())]
    MissingResource(PathBuf),

    /// Error extracting an image region from a page.
    #[error("Image extraction error: {0}")]
    ImageExtract(String),

    /// Error decoding or encoding raster data.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Error while writing the output document.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Error talking to the translation service.
    #[error("Translation service error: {0}")]
    Service(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Service(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange {
            requested: 10,
            available: 5,
        };
        assert_eq!(
            err.to_string(),
            "Page limit 10 is out of range (document has 5 pages)"
        );

        let err = Error::UnsupportedFormat("docx".to_string());
        assert_eq!(err.to_string(), "Unsupported file format: docx");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = Error::TranslationTypeMismatch {
            expected: "text",
            found: "image",
        };
        assert_eq!(
            err.to_string(),
            "Invalid translation type: expected text, got image"
        );
    }

    #[test]
    fn test_missing_resource_display() {
        let err = Error::MissingResource(PathBuf::from("images/page_1_image_0.png"));
        assert_eq!(
            err.to_string(),
            "Resource not found: images/page_1_image_0.png"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
