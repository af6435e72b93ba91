//! Writing a translated [`Book`] to disk.

mod markdown;
mod options;
mod pdf;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::Book;

pub use markdown::{to_markdown, MarkdownRenderer};
pub use options::{PageSize, RenderOptions};
pub use pdf::to_pdf;

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Paginated PDF
    Pdf,
    /// Markdown text
    Markdown,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Markdown => "md",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pdf => f.write_str("PDF"),
            OutputFormat::Markdown => f.write_str("Markdown"),
        }
    }
}

/// Default output location: `<stem>_translated.<ext>` next to the source.
pub fn default_output_path(source: &Path, format: OutputFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    source.with_file_name(format!("{}_translated.{}", stem, format.extension()))
}

/// Writes books in either output format.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    /// Create a renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Current options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Write `book` as `format` and return the path written.
    ///
    /// The document is produced in memory first, so a failure leaves no
    /// partial file behind.
    pub fn render(
        &self,
        book: &Book,
        output_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<PathBuf> {
        let path = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(book.source_path(), format));

        log::info!("Source document: {}", book.source_path().display());
        log::info!("Writing {} output: {}", format, path.display());

        let bytes = match format {
            OutputFormat::Pdf => to_pdf(book, &self.options)?,
            OutputFormat::Markdown => to_markdown(book, &path).into_bytes(),
        };
        fs::write(&path, bytes)?;

        log::info!("Translation written: {}", path.display());
        Ok(path)
    }
}
