//! Translation of a [`Book`](crate::model::Book) through an external service.
//!
//! The service is an opaque `prompt -> (text, success)` capability
//! ([`TranslationService`]). [`OpenAiService`] talks to an OpenAI-compatible
//! chat endpoint; closures implement the trait too, which is how tests stub
//! it out.

mod language;
mod openai;
mod pipeline;
mod prompt;

pub use language::{Language, SUPPORTED_LANGUAGES};
pub use openai::{OpenAiOptions, OpenAiService, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use pipeline::{PdfTranslator, TranslationReport, UnitFailure};
pub use prompt::PromptBuilder;

/// Reply from a translation service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranslationReply {
    /// Translated text. Empty on failure.
    pub text: String,
    /// Whether the service considers the call successful
    pub success: bool,
}

impl TranslationReply {
    /// A successful reply.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    /// The failed reply: empty text, `success == false`.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// A blocking translation capability.
///
/// Implementations never fail loudly: transport and decoding problems are
/// reported as [`TranslationReply::failed`].
pub trait TranslationService {
    /// Send one prompt and wait for the reply.
    fn translate(&self, prompt: &str) -> TranslationReply;
}

impl<F> TranslationService for F
where
    F: Fn(&str) -> TranslationReply,
{
    fn translate(&self, prompt: &str) -> TranslationReply {
        self(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_service() {
        let service = |prompt: &str| TranslationReply::ok(prompt.to_uppercase());
        assert_eq!(service.translate("abc"), TranslationReply::ok("ABC"));
    }

    #[test]
    fn test_boxed_service() {
        let service: Box<dyn TranslationService> = Box::new(|_: &str| TranslationReply::failed());
        let reply = service.translate("x");
        assert!(!reply.success);
        assert!(reply.text.is_empty());
    }
}
