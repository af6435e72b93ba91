//! Markdown output.

use std::path::{Component, Path, PathBuf};

use crate::model::{Book, Content, TableGrid, Translation};

/// Render the translated units of `book` as Markdown.
///
/// `output_path` is where the file will be written; image references are
/// made relative to its directory. Units without a usable translation are
/// left out. Pages are separated by a `---` rule.
pub fn to_markdown(book: &Book, output_path: &Path) -> String {
    let renderer = MarkdownRenderer::new(output_path);
    renderer.render(book)
}

/// Markdown renderer bound to an output location.
pub struct MarkdownRenderer {
    base_dir: PathBuf,
}

impl MarkdownRenderer {
    /// Create a renderer for a file written at `output_path`.
    pub fn new(output_path: &Path) -> Self {
        let base_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self { base_dir }
    }

    /// Render a whole book.
    pub fn render(&self, book: &Book) -> String {
        let mut output = String::new();
        let pages = book.pages();

        for (idx, page) in pages.iter().enumerate() {
            for content in page.contents().iter().filter(|c| c.status()) {
                self.render_content(&mut output, content);
            }
            if idx + 1 < pages.len() {
                output.push_str("---\n\n");
            }
        }

        output
    }

    fn render_content(&self, output: &mut String, content: &Content) {
        match content.translation() {
            Some(Translation::Text(text)) => {
                output.push_str(text);
                output.push_str("\n\n");
            }
            Some(Translation::Table(table)) => self.render_table(output, table),
            Some(Translation::Image(_)) => {
                if let Some(path) = content.image_path() {
                    self.render_image(output, path);
                }
            }
            None => {}
        }
    }

    fn render_table(&self, output: &mut String, table: &TableGrid) {
        if table.is_empty() {
            log::warn!("Skipping empty table");
            return;
        }

        output.push_str(&table_row(table.header()));
        output.push('\n');
        output.push_str(&table_row(&vec!["---".to_string(); table.column_count()]));
        output.push('\n');

        let body: Vec<String> = table.rows().iter().map(|row| table_row(row)).collect();
        output.push_str(&body.join("\n"));
        output.push_str("\n\n");
    }

    fn render_image(&self, output: &mut String, path: &Path) {
        if !path.is_file() {
            log::error!("Image file not found: {}", path.display());
            return;
        }
        let relative = relative_path(path, &self.base_dir);
        output.push_str(&format!("![Image]({})\n\n", relative));
        log::info!("Image link added to Markdown file: {}", relative);
    }
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// Path of `target` relative to directory `base`, with `/` separators.
///
/// Falls back to `target` as given when either path cannot be resolved.
fn relative_path(target: &Path, base: &Path) -> String {
    let (Ok(target_abs), Ok(base_abs)) = (target.canonicalize(), base.canonicalize()) else {
        return slash_path(target.components());
    };

    let target_parts: Vec<Component> = target_abs.components().collect();
    let base_parts: Vec<Component> = base_abs.components().collect();
    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    parts.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

fn slash_path<'a>(components: impl Iterator<Item = Component<'a>>) -> String {
    components
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageHandle, Page};
    use std::fs;

    fn translated_text(text: &str) -> Content {
        let mut content = Content::text("x");
        content.set_translation(text, true).unwrap();
        content
    }

    fn translated_table(reply: &str) -> Content {
        let mut content = Content::table(vec![]);
        content.set_translation(reply, true).unwrap();
        content
    }

    #[test]
    fn test_render_text_and_table() {
        let mut book = Book::new("doc.pdf");
        let mut page = Page::new(1, 612.0, 792.0);
        page.add_content(translated_text("Bonjour"));
        page.add_content(translated_table("H1 | H2\nA | B\nC | D"));
        book.add_page(page);

        let md = to_markdown(&book, Path::new("doc_translated.md"));
        assert_eq!(
            md,
            "Bonjour\n\n| H1 | H2 |\n| --- | --- |\n| A | B |\n| C | D |\n\n"
        );
    }

    #[test]
    fn test_pages_separated_by_rule() {
        let mut book = Book::new("doc.pdf");
        for text in ["one", "two"] {
            let mut page = Page::new(1, 612.0, 792.0);
            page.add_content(translated_text(text));
            book.add_page(page);
        }
        let md = to_markdown(&book, Path::new("out.md"));
        assert_eq!(md, "one\n\n---\n\ntwo\n\n");
    }

    #[test]
    fn test_failed_units_omitted() {
        let mut book = Book::new("doc.pdf");
        let mut page = Page::new(1, 612.0, 792.0);
        let mut failed = Content::text("x");
        failed.set_translation("partial", false).unwrap();
        page.add_content(failed);
        page.add_content(Content::text("never translated"));
        book.add_page(page);

        assert_eq!(to_markdown(&book, Path::new("out.md")), "");
    }

    #[test]
    fn test_header_only_table_skipped() {
        let mut book = Book::new("doc.pdf");
        let mut page = Page::new(1, 612.0, 792.0);
        page.add_content(translated_table("H1 | H2"));
        book.add_page(page);

        assert_eq!(to_markdown(&book, Path::new("out.md")), "");
    }

    #[test]
    fn test_image_link_relative_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("parserimages");
        fs::create_dir_all(&images).unwrap();
        let image_path = images.join("page_1_image_0.png");
        fs::write(&image_path, b"png").unwrap();
        let out_dir = dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let mut content = Content::image(&image_path);
        content
            .set_translation(ImageHandle::new(&image_path, 1, 1), true)
            .unwrap();
        let mut page = Page::new(1, 612.0, 792.0);
        page.add_content(content);
        let mut book = Book::new(dir.path().join("doc.pdf"));
        book.add_page(page);

        let md = to_markdown(&book, &out_dir.join("doc_translated.md"));
        assert_eq!(md, "![Image](../parserimages/page_1_image_0.png)\n\n");
    }

    #[test]
    fn test_missing_image_skipped() {
        let mut content = Content::image("/nonexistent/a.png");
        content
            .set_translation(ImageHandle::new("/nonexistent/a.png", 1, 1), true)
            .unwrap();
        let mut page = Page::new(1, 612.0, 792.0);
        page.add_content(content);
        let mut book = Book::new("doc.pdf");
        book.add_page(page);

        assert_eq!(to_markdown(&book, Path::new("out.md")), "");
    }

    #[test]
    fn test_relative_path_fallback() {
        assert_eq!(
            relative_path(Path::new("./missing/a.png"), Path::new("nowhere")),
            "missing/a.png"
        );
    }
}
