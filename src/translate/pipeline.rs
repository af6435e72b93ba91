//! The extract, translate, render pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use super::{PromptBuilder, TranslationService};
use crate::error::Result;
use crate::extract::{DocumentOpener, ExtractOptions, Extractor};
use crate::model::{Book, Content, ContentKind, DefaultImageLoader, ImageLoader};
use crate::render::{OutputFormat, RenderOptions, Renderer};

/// Location of a unit whose translation did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFailure {
    /// Page number, 1-based
    pub page: u32,
    /// Position of the unit within its page, 0-based
    pub index: usize,
    /// Kind of the unit
    pub kind: ContentKind,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}, unit {} ({})", self.page, self.index + 1, self.kind)
    }
}

/// Outcome of one translate pass over a book.
///
/// Failed units are still omitted from rendered output; the report is how
/// callers find out about them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationReport {
    /// Text and table units with a usable translation
    pub translated: usize,
    /// Image units passed through unchanged
    pub passed_through: usize,
    /// Units that ended with `status == false`
    pub failures: Vec<UnitFailure>,
}

impl TranslationReport {
    /// Number of failed units.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every unit made it.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, page: u32, index: usize, content: &Content) {
        if content.status() {
            match content.kind() {
                ContentKind::Image => self.passed_through += 1,
                _ => self.translated += 1,
            }
        } else {
            self.failures.push(UnitFailure {
                page,
                index,
                kind: content.kind(),
            });
        }
    }
}

/// Drives extraction, translation and rendering for one document at a time.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use transpdf::{OutputFormat, PdfTranslator, TranslationReply};
///
/// let translator = PdfTranslator::new(|_prompt: &str| TranslationReply::ok("..."));
/// let output = translator.translate_pdf(
///     Path::new("paper.pdf"),
///     "Français",
///     OutputFormat::Markdown,
///     None,
///     None,
/// )?;
/// println!("{}", output.display());
/// # Ok::<(), transpdf::Error>(())
/// ```
pub struct PdfTranslator {
    service: Box<dyn TranslationService>,
    extractor: Extractor,
    image_loader: Box<dyn ImageLoader>,
    renderer: Renderer,
    prompts: PromptBuilder,
}

impl PdfTranslator {
    /// Create a translator around a translation service, with the lopdf
    /// backend and default options.
    pub fn new(service: impl TranslationService + 'static) -> Self {
        Self {
            service: Box::new(service),
            extractor: Extractor::default(),
            image_loader: Box::new(DefaultImageLoader),
            renderer: Renderer::default(),
            prompts: PromptBuilder::new(),
        }
    }

    /// Use a different document backend.
    pub fn with_opener(mut self, opener: impl DocumentOpener + 'static) -> Self {
        let options = self.extractor.options().clone();
        self.extractor = Extractor::new(Box::new(opener)).with_options(options);
        self
    }

    /// Use a different image decoder.
    pub fn with_image_loader(mut self, loader: impl ImageLoader + 'static) -> Self {
        self.image_loader = Box::new(loader);
        self
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extractor = self.extractor.with_options(options);
        self
    }

    /// Set rendering options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.renderer = Renderer::new(options);
        self
    }

    /// Translate a PDF and write it as `format`.
    ///
    /// Returns the path written, which is `output_path` when given and
    /// otherwise derived from `path`.
    pub fn translate_pdf(
        &self,
        path: &Path,
        target_language: &str,
        format: OutputFormat,
        output_path: Option<&Path>,
        pages: Option<usize>,
    ) -> Result<PathBuf> {
        self.translate_pdf_with_report(path, target_language, format, output_path, pages)
            .map(|(path, _)| path)
    }

    /// Like [`translate_pdf`](Self::translate_pdf), also returning the
    /// per-unit report.
    pub fn translate_pdf_with_report(
        &self,
        path: &Path,
        target_language: &str,
        format: OutputFormat,
        output_path: Option<&Path>,
        pages: Option<usize>,
    ) -> Result<(PathBuf, TranslationReport)> {
        let mut book = self.extractor.extract(path, pages)?;
        let report = self.translate_book(&mut book, target_language);
        log_report(&report);
        let written = self.renderer.render(&book, output_path, format)?;
        Ok((written, report))
    }

    /// Translate a PDF and return every text and table reply, each followed
    /// by a newline.
    ///
    /// Failed replies are included as returned by the service.
    pub fn translate_pdf_text(
        &self,
        path: &Path,
        target_language: &str,
        pages: Option<usize>,
    ) -> Result<String> {
        self.translate_pdf_text_with_report(path, target_language, pages)
            .map(|(text, _)| text)
    }

    /// Like [`translate_pdf_text`](Self::translate_pdf_text), also returning
    /// the per-unit report.
    pub fn translate_pdf_text_with_report(
        &self,
        path: &Path,
        target_language: &str,
        pages: Option<usize>,
    ) -> Result<(String, TranslationReport)> {
        let mut book = self.extractor.extract(path, pages)?;
        let mut transcript = String::new();
        let report = self.walk(&mut book, target_language, Some(&mut transcript));
        log_report(&report);
        Ok((transcript, report))
    }

    /// Translate every unit of `book` in place, in page then content order.
    ///
    /// Never fails: unit-level problems end up as `status == false` on the
    /// unit and as an entry in the returned report.
    pub fn translate_book(&self, book: &mut Book, target_language: &str) -> TranslationReport {
        self.walk(book, target_language, None)
    }

    fn walk(
        &self,
        book: &mut Book,
        target_language: &str,
        mut transcript: Option<&mut String>,
    ) -> TranslationReport {
        let mut report = TranslationReport::default();

        for page in book.pages_mut() {
            let number = page.number;
            for (index, content) in page.contents_mut().iter_mut().enumerate() {
                match content.kind() {
                    ContentKind::Text | ContentKind::Table => {
                        let Some(prompt) = self.prompts.for_content(content, target_language)
                        else {
                            continue;
                        };
                        log::debug!("{}", prompt);

                        let reply = self.service.translate(&prompt);
                        log::info!("{}", reply.text);

                        if let Some(out) = transcript.as_deref_mut() {
                            out.push_str(&reply.text);
                            out.push('\n');
                        }

                        if let Err(e) = content.set_translation(reply.text, reply.success) {
                            log::error!(
                                "Page {}, content {}: {}",
                                number,
                                index + 1,
                                e
                            );
                        }
                    }
                    ContentKind::Image => {
                        log::info!(
                            "Skipping translation for image content at page {}, content {}",
                            number,
                            index + 1
                        );
                        self.pass_image_through(content, number, index);
                    }
                }
                report.record(number, index, content);
            }
        }

        report
    }

    fn pass_image_through(&self, content: &mut Content, page: u32, index: usize) {
        let Some(path) = content.image_path() else {
            return;
        };
        let loaded = self
            .image_loader
            .load(path)
            .and_then(|handle| content.set_translation(handle, true));
        if let Err(e) = loaded {
            log::error!("Page {}, content {}: {}", page, index + 1, e);
            content.mark_failed();
        }
    }
}

fn log_report(report: &TranslationReport) {
    log::info!(
        "Translated {} unit(s), passed through {} image(s), {} failed",
        report.translated,
        report.passed_through,
        report.failed()
    );
    for failure in &report.failures {
        log::warn!("Untranslated unit omitted from output: {}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Page, Translation};
    use crate::translate::TranslationReply;

    fn book() -> Book {
        let mut book = Book::new("doc.pdf");
        let mut first = Page::new(1, 612.0, 792.0);
        first.add_content(Content::text("Hello"));
        first.add_content(Content::table(vec![vec![
            vec!["H1".into(), "H2".into()],
            vec!["a".into(), "b".into()],
        ]]));
        book.add_page(first);
        book
    }

    fn stub(prompt: &str) -> TranslationReply {
        if prompt.contains("table structure") {
            TranslationReply::ok("H1 | H2\nA | B")
        } else {
            TranslationReply::ok("Bonjour")
        }
    }

    #[test]
    fn test_translate_book_sets_translations() {
        let mut book = book();
        let report = PdfTranslator::new(stub).translate_book(&mut book, "Français");

        let contents = book.pages()[0].contents();
        assert_eq!(
            contents[0].translation(),
            Some(&Translation::Text("Bonjour".into()))
        );
        assert!(matches!(contents[1].translation(), Some(Translation::Table(_))));
        assert_eq!(report.translated, 2);
        assert!(report.is_complete());
    }

    #[test]
    fn test_failed_units_are_reported() {
        let mut book = book();
        let report = PdfTranslator::new(|_: &str| TranslationReply::ok("not | a\ntable | at | all"))
            .translate_book(&mut book, "Français");

        assert_eq!(report.translated, 1);
        assert_eq!(
            report.failures,
            vec![UnitFailure {
                page: 1,
                index: 1,
                kind: ContentKind::Table
            }]
        );
        assert_eq!(report.failures[0].to_string(), "page 1, unit 2 (table)");
    }

    #[test]
    fn test_missing_image_fails_unit_only() {
        let mut book = book();
        let mut page = Page::new(2, 612.0, 792.0);
        page.add_content(Content::image("/nonexistent/page_2_image_0.png"));
        book.add_page(page);

        let report = PdfTranslator::new(stub).translate_book(&mut book, "Français");
        let image = &book.pages()[1].contents()[0];
        assert!(!image.status());
        assert!(image.translation().is_none());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.passed_through, 0);
    }
}
