//! # transpdf
//!
//! Translate PDF documents page by page and write the result as a new PDF
//! or as Markdown.
//!
//! The pipeline has three stages that share one [`Book`]:
//!
//! 1. [`Extractor`] splits every page into text, table and image units.
//! 2. [`PdfTranslator`] sends each text and table unit to a
//!    [`TranslationService`] and stores the reply on the unit. Images pass
//!    through untouched.
//! 3. [`Renderer`] writes every unit whose translation succeeded.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use transpdf::{OpenAiOptions, OpenAiService, OutputFormat, PdfTranslator};
//!
//! fn main() -> transpdf::Result<()> {
//!     let service = OpenAiService::new(OpenAiOptions::new("sk-..."))?;
//!     let translator = PdfTranslator::new(service);
//!
//!     let output = translator.translate_pdf(
//!         Path::new("paper.pdf"),
//!         "Français",
//!         OutputFormat::Markdown,
//!         None,
//!         None,
//!     )?;
//!     println!("{}", output.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed content units**: text, tables and images each carry their own
//!   translation rules
//! - **Table reconstruction**: delimited replies are rebuilt into header and
//!   rows
//! - **Two output formats**: paginated PDF and Markdown
//! - **Pluggable services**: any `Fn(&str) -> TranslationReply` is a service

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod render;
pub mod translate;

// Re-export commonly used types
pub use config::Config;
pub use detect::{is_pdf, pdf_version_from_bytes, pdf_version_from_path};
pub use error::{Error, Result};
pub use extract::{
    BoundingBox, DocumentOpener, DocumentSource, ExtractOptions, Extractor, LopdfOpener,
    SourcePage,
};
pub use model::{
    Book, Content, ContentKind, DefaultImageLoader, Grid, ImageHandle, ImageLoader, Original, Page,
    TableGrid, Translation, TranslationValue,
};
pub use render::{OutputFormat, PageSize, RenderOptions, Renderer};
pub use translate::{
    Language, OpenAiOptions, OpenAiService, PdfTranslator, PromptBuilder, TranslationReply,
    TranslationReport, TranslationService, UnitFailure,
};

use std::path::Path;

/// Extract a book from a PDF file without translating it.
///
/// # Example
///
/// ```no_run
/// let book = transpdf::extract_book("document.pdf", None).unwrap();
/// println!("Pages: {}", book.page_count());
/// ```
pub fn extract_book<P: AsRef<Path>>(path: P, pages: Option<usize>) -> Result<Book> {
    Extractor::default().extract(path.as_ref(), pages)
}

/// Translate a PDF file with a service, using default options.
///
/// Returns the path of the written document.
///
/// # Example
///
/// ```no_run
/// use transpdf::{translate_file, OutputFormat, TranslationReply};
///
/// let out = translate_file(
///     "document.pdf",
///     "English",
///     OutputFormat::Pdf,
///     |_prompt: &str| TranslationReply::ok("..."),
/// )
/// .unwrap();
/// ```
pub fn translate_file<P, S>(
    path: P,
    target_language: &str,
    format: OutputFormat,
    service: S,
) -> Result<std::path::PathBuf>
where
    P: AsRef<Path>,
    S: TranslationService + 'static,
{
    PdfTranslator::new(service).translate_pdf(path.as_ref(), target_language, format, None, None)
}
