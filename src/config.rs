//! TOML configuration.
//!
//! ```toml
//! [model]
//! model = "gpt-3.5-turbo"
//! api_key = "sk-..."
//!
//! [common]
//! book = "tests/test.pdf"
//! file_format = "markdown"
//! target_language = "Français"
//!
//! [render]
//! font_path = "fonts/simsun.ttf"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::ExtractOptions;
use crate::render::{OutputFormat, PageSize, RenderOptions};
use crate::translate::{OpenAiOptions, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Translation service settings
    pub model: ModelConfig,
    /// Job defaults
    pub common: CommonConfig,
    /// Extraction settings
    pub extract: ExtractConfig,
    /// Output settings
    pub render: RenderConfig,
}

/// `[model]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Chat model name
    pub model: String,
    /// API key; falls back to `OPENAI_API_KEY`
    pub api_key: Option<String>,
    /// API root
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
            temperature: None,
        }
    }
}

/// `[common]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    /// Default source document
    pub book: Option<PathBuf>,
    /// Default output format name
    pub file_format: String,
    /// Default target language (code or display name)
    pub target_language: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            book: None,
            file_format: "PDF".to_string(),
            target_language: "中文".to_string(),
        }
    }
}

/// `[extract]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Directory for extracted image regions
    pub image_dir: Option<PathBuf>,
}

/// `[render]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Font file for PDF output
    pub font_path: Option<PathBuf>,
    /// Body text size in points
    pub font_size: f32,
    /// Body line spacing in points
    pub leading: f32,
    /// Table header text size in points
    pub header_font_size: f32,
    /// `A4` or `Letter`
    pub page_size: String,
    /// Page margin in mm
    pub margin_mm: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let defaults = RenderOptions::default();
        Self {
            font_path: None,
            font_size: defaults.font_size,
            leading: defaults.leading,
            header_font_size: defaults.header_font_size,
            page_size: "A4".to_string(),
            margin_mm: defaults.margin_mm,
        }
    }
}

impl Config {
    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The configured API key, or `OPENAI_API_KEY` when none is set.
    pub fn api_key(&self) -> Option<String> {
        self.model
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }

    /// Client settings for [`OpenAiService`](crate::translate::OpenAiService).
    pub fn openai_options(&self) -> Result<OpenAiOptions> {
        let api_key = self.api_key().ok_or_else(|| {
            Error::Config(format!(
                "no API key: set [model].api_key or {}",
                API_KEY_ENV
            ))
        })?;

        let mut options = OpenAiOptions::new(api_key)
            .with_model(self.model.model.clone())
            .with_base_url(self.model.base_url.clone())
            .with_timeout(Duration::from_secs(self.model.timeout_secs));
        if let Some(t) = self.model.temperature {
            options = options.with_temperature(t);
        }
        Ok(options)
    }

    /// Configured output format.
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.common.file_format.parse()
    }

    /// Extraction options.
    pub fn extract_options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::new();
        if let Some(dir) = &self.extract.image_dir {
            options = options.with_image_dir(dir);
        }
        options
    }

    /// Rendering options.
    pub fn render_options(&self) -> Result<RenderOptions> {
        let render = &self.render;
        let page_size = PageSize::from_name(&render.page_size).ok_or_else(|| {
            Error::Config(format!("unknown page size: {}", render.page_size))
        })?;

        let mut options = RenderOptions::new()
            .with_page_size(page_size)
            .with_margin(render.margin_mm)
            .with_font_size(render.font_size, render.leading)
            .with_header_font_size(render.header_font_size);
        if let Some(font) = &render.font_path {
            options = options.with_font(font);
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.model.model, "gpt-3.5-turbo");
        assert_eq!(config.model.timeout_secs, 120);
        assert_eq!(config.common.file_format, "PDF");
        assert_eq!(config.common.target_language, "中文");
        assert_eq!(config.output_format().unwrap(), OutputFormat::Pdf);

        let render = config.render_options().unwrap();
        assert_eq!(render.page_size, PageSize::A4);
        assert_eq!(render.font_size, 12.0);
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::from_toml(
            r#"
            [model]
            model = "gpt-4o-mini"
            api_key = "sk-test"
            base_url = "http://localhost:1234/v1"
            temperature = 0.2

            [common]
            book = "books/test.pdf"
            file_format = "markdown"

            [extract]
            image_dir = "/tmp/images"

            [render]
            font_path = "fonts/simsun.ttf"
            page_size = "letter"
            "#,
        )
        .unwrap();

        let openai = config.openai_options().unwrap();
        assert_eq!(openai.model, "gpt-4o-mini");
        assert_eq!(openai.api_key, "sk-test");
        assert_eq!(openai.temperature, Some(0.2));
        assert_eq!(openai.endpoint(), "http://localhost:1234/v1/chat/completions");

        assert_eq!(config.common.book, Some(PathBuf::from("books/test.pdf")));
        assert_eq!(config.output_format().unwrap(), OutputFormat::Markdown);
        assert_eq!(
            config.extract_options().image_dir,
            Some(PathBuf::from("/tmp/images"))
        );

        let render = config.render_options().unwrap();
        assert_eq!(render.page_size, PageSize::LETTER);
        assert_eq!(render.font_path, Some(PathBuf::from("fonts/simsun.ttf")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_toml("[model]\ntimeout_secs = \"soon\""),
            Err(Error::Config(_))
        ));

        let mut config = Config::default();
        config.render.page_size = "B5".to_string();
        assert!(config.render_options().is_err());

        config.common.file_format = "docx".to_string();
        assert!(matches!(
            config.output_format(),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/config.toml"),
            Err(Error::Config(_))
        ));
    }
}
