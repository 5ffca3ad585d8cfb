//! Generation Transport
//!
//! The one capability the fallback client needs from an AI provider: issue a
//! single generation call for a given model id. Implementations translate
//! provider-specific failures into the closed [`ErrorClass`] set before they
//! reach the fallback loop.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use advisor_core::provider::{GenerationOptions, GenerationTransport, RequestContent};
//!
//! let transport = GeminiTransport::new(config, api_key)?;
//! let response = transport
//!     .generate("gemini-2.5-flash", &RequestContent::text("Hello"), &GenerationOptions::default())
//!     .await?;
//! ```
//!
//! [`ErrorClass`]: crate::error::ErrorClass

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

/// Request payload forwarded to the transport untouched
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestContent {
    /// Plain prompt text, sent as a single user turn
    Text(String),

    /// Pre-built provider `contents` value
    Structured(serde_json::Value),
}

impl RequestContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl From<&str> for RequestContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RequestContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Per-request configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Ground the answer with web search results
    #[serde(default)]
    pub enable_search: bool,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Requested response MIME type (e.g., "application/json")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,

    /// JSON schema constraining a structured response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,

    /// Token budget for the model's internal reasoning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,

    /// System instruction sent separately from the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

impl GenerationOptions {
    pub fn with_search(mut self) -> Self {
        self.enable_search = true;
        self
    }

    pub fn max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Ask for a JSON response, optionally constrained by a schema
    pub fn json_response(mut self, schema: Option<serde_json::Value>) -> Self {
        self.response_mime_type = Some("application/json".into());
        self.response_schema = schema;
        self
    }

    pub fn thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// A source document that informed the response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingReference {
    pub title: String,
    pub uri: String,
}

impl GroundingReference {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }

    /// Host of the source URI without a leading `www.`
    pub fn source_host(&self) -> Option<String> {
        let url = url::Url::parse(&self.uri).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }
}

/// Token usage statistics
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Safety,
    Other,
}

/// Successful generation payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text
    pub text: String,

    /// Model that produced this response
    pub model: String,

    /// Search grounding sources, if any
    #[serde(default)]
    pub grounding: Vec<GroundingReference>,

    /// Token usage statistics (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl GenerationResponse {
    pub fn new(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            grounding: Vec::new(),
            usage: None,
            finish_reason: None,
        }
    }

    pub fn with_grounding(mut self, grounding: Vec<GroundingReference>) -> Self {
        self.grounding = grounding;
        self
    }

    /// Whether the response carries any non-whitespace text
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Decode a JSON payload from the text.
    ///
    /// Looks for a fenced ```json block first, then any fenced block, then
    /// falls back to the whole text.
    pub fn json_payload<T: DeserializeOwned>(&self) -> Result<T> {
        if let Some(block) = fenced_block(&self.text) {
            if let Ok(value) = serde_json::from_str(block) {
                return Ok(value);
            }
        }

        serde_json::from_str(self.text.trim()).map_err(|e| {
            AdvisorError::Parse(format!("no JSON payload in {} response: {}", self.model, e))
        })
    }
}

/// Body of the first fenced code block, preferring one tagged `json`
fn fenced_block(text: &str) -> Option<&str> {
    let (start, skip) = match text.find("```json") {
        Some(pos) => (pos, "```json".len()),
        None => (text.find("```")?, 3),
    };
    let body = &text[start + skip..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Strategy trait for generation backends
///
/// Implement this trait to plug in a provider. Errors must already be
/// classified: quota exhaustion as [`AdvisorError::QuotaExhausted`], rejected
/// keys as [`AdvisorError::InvalidCredential`], and so on.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Issue one generation call against `model`
    async fn generate(
        &self,
        model: &str,
        content: &RequestContent,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pick {
        ticker: String,
    }

    #[test]
    fn test_json_payload_from_fenced_block() {
        let response = GenerationResponse::new(
            "gemini-2.5-flash",
            "Here you go:\n```json\n[{\"ticker\": \"2330.TW\"}]\n```\nGood luck.",
        );
        let picks: Vec<Pick> = response.json_payload().unwrap();
        assert_eq!(picks, vec![Pick { ticker: "2330.TW".into() }]);
    }

    #[test]
    fn test_json_payload_from_untagged_block_and_raw() {
        let fenced = GenerationResponse::new("m", "```\n{\"ticker\": \"AAPL\"}\n```");
        assert_eq!(fenced.json_payload::<Pick>().unwrap().ticker, "AAPL");

        let raw = GenerationResponse::new("m", "  {\"ticker\": \"NVDA\"} ");
        assert_eq!(raw.json_payload::<Pick>().unwrap().ticker, "NVDA");

        let prose = GenerationResponse::new("m", "no data today");
        assert!(matches!(prose.json_payload::<Pick>(), Err(AdvisorError::Parse(_))));
    }

    #[test]
    fn test_source_host() {
        let reference = GroundingReference::new("News", "https://www.cnyes.com/news/1");
        assert_eq!(reference.source_host().as_deref(), Some("cnyes.com"));

        let bare = GroundingReference::new("Docs", "https://example.org/a");
        assert_eq!(bare.source_host().as_deref(), Some("example.org"));

        assert_eq!(GroundingReference::new("x", "not a url").source_host(), None);
    }

    #[test]
    fn test_content_serde_untagged() {
        let text: RequestContent = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(text, RequestContent::text("hello"));

        let structured: RequestContent =
            serde_json::from_str(r#"[{"role": "user", "parts": [{"text": "hi"}]}]"#).unwrap();
        assert!(matches!(structured, RequestContent::Structured(_)));
    }

    #[test]
    fn test_options_builder() {
        let opts = GenerationOptions::default()
            .with_search()
            .max_output_tokens(10)
            .json_response(None);
        assert!(opts.enable_search);
        assert_eq!(opts.max_output_tokens, Some(10));
        assert_eq!(opts.response_mime_type.as_deref(), Some("application/json"));
        assert!(!GenerationOptions::default().enable_search);
    }
}
