//! Prompt construction for text and table units.

use crate::model::{Content, Original};

/// Builds the instruction sent to the translation service for one unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Create a prompt builder.
    pub fn new() -> Self {
        Self
    }

    /// Prompt for a block of prose.
    pub fn text_prompt(&self, text: &str, target_language: &str) -> String {
        format!(
            "You are an expert translator fluent in many languages. Read the input \
             carefully and translate all of it into {lang}. Everything must be \
             translated into {lang}, and the structure of the text must stay the \
             same. Present the translation in the original text layout:{text}",
            lang = target_language,
            text = text
        )
    }

    /// Prompt for a page's tables, rendered one row per line.
    pub fn table_prompt(&self, table: &str, target_language: &str) -> String {
        format!(
            "You are an expert translator fluent in many languages. Read the table \
             carefully and translate all of its content into {lang}. Everything must \
             be translated into {lang}, and the table structure must stay the same. \
             Put each row on its own line and separate cells with '|'. Present the \
             translation in the original table layout:\n{table}",
            lang = target_language,
            table = table
        )
    }

    /// Prompt for a unit, or `None` for kinds that are never translated.
    pub fn for_content(&self, content: &Content, target_language: &str) -> Option<String> {
        let source = content.original_text()?;
        match content.original() {
            Original::Text(_) => Some(self.text_prompt(&source, target_language)),
            Original::Table(_) => Some(self.table_prompt(&source, target_language)),
            Original::Image(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prompt_embeds_language_and_text() {
        let prompt = PromptBuilder::new().text_prompt("Hello", "Français");
        assert!(prompt.contains("into Français"));
        assert!(prompt.ends_with(":Hello"));
    }

    #[test]
    fn test_table_prompt_puts_table_on_new_line() {
        let content = Content::table(vec![vec![
            vec!["H1".into(), "H2".into()],
            vec!["a".into(), "b".into()],
        ]]);
        let prompt = PromptBuilder::new().for_content(&content, "中文").unwrap();
        assert!(prompt.contains("table structure"));
        assert!(prompt.ends_with(":\nH1 | H2\na | b"));
    }

    #[test]
    fn test_image_has_no_prompt() {
        let content = Content::image("a.png");
        assert!(PromptBuilder::new().for_content(&content, "English").is_none());
    }
}
