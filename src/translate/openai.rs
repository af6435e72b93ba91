//! Client for OpenAI-compatible chat completion endpoints.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{TranslationReply, TranslationService};
use crate::error::{Error, Result};

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for [`OpenAiService`].
#[derive(Debug, Clone)]
pub struct OpenAiOptions {
    /// Model name
    pub model: String,
    /// Bearer token
    pub api_key: String,
    /// API root, without the trailing `/chat/completions`
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Sampling temperature, left to the server when `None`
    pub temperature: Option<f32>,
}

impl Default for OpenAiOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            temperature: None,
        }
    }
}

impl OpenAiOptions {
    /// Options for the given key with default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Full URL of the chat completions endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking translation service backed by a chat completion API.
///
/// One request per prompt, no retries.
pub struct OpenAiService {
    client: Client,
    options: OpenAiOptions,
}

impl OpenAiService {
    /// Build a client from options.
    pub fn new(options: OpenAiOptions) -> Result<Self> {
        if options.api_key.trim().is_empty() {
            return Err(Error::Config("missing API key".to_string()));
        }
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { client, options })
    }

    /// Current options.
    pub fn options(&self) -> &OpenAiOptions {
        &self.options
    }

    fn request(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.options.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.options.temperature,
        };

        let response = self
            .client
            .post(self.options.endpoint())
            .bearer_auth(&self.options.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(Error::Service(format!("HTTP {}: {}", status, detail.trim())));
        }

        let reply: ChatResponse = response.json()?;
        extract_reply(reply)
    }
}

fn extract_reply(reply: ChatResponse) -> Result<String> {
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| Error::Service("response contained no choices".to_string()))
}

impl TranslationService for OpenAiService {
    fn translate(&self, prompt: &str) -> TranslationReply {
        match self.request(prompt) {
            Ok(text) => TranslationReply::ok(text),
            Err(e) => {
                log::error!("Translation request failed: {}", e);
                TranslationReply::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let options = OpenAiOptions::new("k").with_base_url("http://localhost:8080/v1/");
        assert_eq!(options.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(OpenAiOptions::default().model, DEFAULT_MODEL);
    }

    #[test]
    fn test_missing_key_rejected() {
        assert!(matches!(
            OpenAiService::new(OpenAiOptions::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_extract_reply() {
        let reply: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Bonjour \n"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(reply).unwrap(), "Bonjour");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(extract_reply(empty).is_err());
    }

    #[test]
    fn test_unreachable_server_is_a_failed_reply() {
        let options = OpenAiOptions::new("k")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let service = OpenAiService::new(options).unwrap();
        let reply = service.translate("hello");
        assert!(!reply.success);
        assert!(reply.text.is_empty());
    }
}
