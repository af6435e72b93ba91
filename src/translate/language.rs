//! Supported target languages.

use std::fmt;

/// A target language: short code plus the display name used in prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    /// Lower-case code, e.g. `fr`
    pub code: &'static str,
    /// Name in the language itself, e.g. `Français`
    pub name: &'static str,
}

/// Every language the command line accepts, in display order.
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language::new("en", "English"),
    Language::new("zh", "中文"),
    Language::new("es", "Español"),
    Language::new("fr", "Français"),
    Language::new("de", "Deutsch"),
    Language::new("ja", "日本語"),
    Language::new("it", "Italiano"),
    Language::new("ko", "한국어"),
    Language::new("ru", "Русский"),
    Language::new("pt", "Português"),
    Language::new("ar", "العربية"),
];

impl Language {
    const fn new(code: &'static str, name: &'static str) -> Self {
        Self { code, name }
    }

    /// Look up a language by code, ignoring case and surrounding whitespace.
    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim();
        SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .find(|l| l.code.eq_ignore_ascii_case(code))
    }

    /// Look up a language by display name.
    pub fn from_name(name: &str) -> Option<Language> {
        let name = name.trim();
        SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .find(|l| l.name == name || l.name.eq_ignore_ascii_case(name))
    }

    /// Resolve either a code or a display name.
    pub fn resolve(value: &str) -> Option<Language> {
        Self::from_code(value).or_else(|| Self::from_name(value))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("fr").map(|l| l.name), Some("Français"));
        assert_eq!(Language::from_code(" ZH ").map(|l| l.name), Some("中文"));
        assert!(Language::from_code("xx").is_none());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Language::from_name("english").map(|l| l.code), Some("en"));
        assert_eq!(Language::from_name("日本語").map(|l| l.code), Some("ja"));
        assert!(Language::from_name("Klingon").is_none());
    }

    #[test]
    fn test_resolve_and_display() {
        let lang = Language::resolve("Deutsch").unwrap();
        assert_eq!(lang.code, "de");
        assert_eq!(lang.to_string(), "Deutsch");
        assert_eq!(SUPPORTED_LANGUAGES.len(), 11);
    }
}
