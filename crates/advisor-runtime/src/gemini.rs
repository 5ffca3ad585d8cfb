//! Gemini Transport
//!
//! Implementation of `GenerationTransport` for the Google Generative Language
//! REST API. Provider failures are classified here so the fallback client only
//! ever sees typed errors.

use std::time::Duration;

use advisor_core::{
    credential::ApiKey,
    error::{AdvisorError, ErrorClass, Result},
    fallback::probe_available_models,
    model::ModelCatalog,
    provider::{
        FinishReason, GenerationOptions, GenerationResponse, GenerationTransport,
        GroundingReference, RequestContent, TokenUsage,
    },
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Gemini transport configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            timeout_secs: 120,
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("GEMINI_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(defaults.base_url);
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            base_url,
            timeout_secs,
        }
    }
}

/// Gemini generation transport bound to one API key
pub struct GeminiTransport {
    client: reqwest::Client,
    config: GeminiConfig,
    api_key: ApiKey,
}

impl GeminiTransport {
    /// Create a transport with its own HTTP client
    pub fn new(config: GeminiConfig, api_key: ApiKey) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config, api_key))
    }

    /// Create a transport sharing an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: GeminiConfig, api_key: ApiKey) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Build the `generateContent` request body
    fn build_body(content: &RequestContent, options: &GenerationOptions) -> Value {
        let contents = match content {
            RequestContent::Text(text) => json!([{ "role": "user", "parts": [{ "text": text }] }]),
            RequestContent::Structured(value) => value.clone(),
        };

        let mut generation = Map::new();
        if let Some(max) = options.max_output_tokens {
            generation.insert("maxOutputTokens".into(), json!(max));
        }
        if let Some(temp) = options.temperature {
            generation.insert("temperature".into(), json!(temp));
        }
        if let Some(mime) = &options.response_mime_type {
            generation.insert("responseMimeType".into(), json!(mime));
        }
        if let Some(schema) = &options.response_schema {
            generation.insert("responseSchema".into(), schema.clone());
        }
        if let Some(budget) = options.thinking_budget {
            generation.insert("thinkingConfig".into(), json!({ "thinkingBudget": budget }));
        }

        let mut body = Map::new();
        body.insert("contents".into(), contents);
        if !generation.is_empty() {
            body.insert("generationConfig".into(), Value::Object(generation));
        }
        if let Some(instruction) = &options.system_instruction {
            body.insert(
                "systemInstruction".into(),
                json!({ "parts": [{ "text": instruction }] }),
            );
        }
        if options.enable_search {
            body.insert("tools".into(), json!([{ "google_search": {} }]));
        }

        Value::Object(body)
    }

    /// Convert the wire response to a generation response
    fn convert_response(model: &str, payload: GenerateContentResponse) -> GenerationResponse {
        let candidate = payload.candidates.into_iter().next();

        let (text, grounding, finish_reason) = match candidate {
            Some(candidate) => {
                let text = candidate
                    .content
                    .map(|c| {
                        c.parts
                            .into_iter()
                            .filter(|p| !p.thought)
                            .filter_map(|p| p.text)
                            .collect::<String>()
                    })
                    .unwrap_or_default();
                let grounding = candidate
                    .grounding_metadata
                    .map(|g| {
                        g.grounding_chunks
                            .into_iter()
                            .filter_map(|chunk| chunk.web)
                            .filter_map(|web| match (web.title, web.uri) {
                                (Some(title), Some(uri))
                                    if !title.is_empty() && !uri.is_empty() =>
                                {
                                    Some(GroundingReference::new(title, uri))
                                }
                                _ => None,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let finish_reason = candidate.finish_reason.as_deref().map(convert_finish_reason);
                (text, grounding, finish_reason)
            }
            None => (String::new(), Vec::new(), None),
        };

        GenerationResponse {
            text,
            model: model.to_string(),
            grounding,
            usage: payload.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            }),
            finish_reason,
        }
    }
}

#[async_trait]
impl GenerationTransport for GeminiTransport {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate(
        &self,
        model: &str,
        content: &RequestContent,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse> {
        let body = Self::build_body(content, options);
        tracing::debug!(
            "Gemini generateContent: model={} search={}",
            model,
            options.enable_search
        );

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| convert_transport_error(model, &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_error(model, status.as_u16(), &text);
            tracing::debug!("Gemini {} failed with HTTP {}: {:?}", model, status, err.class());
            return Err(err);
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Parse(format!("{} response: {}", model, e)))?;

        Ok(Self::convert_response(model, payload))
    }
}

/// Classify a non-success Gemini response.
///
/// The structured `status` and `reason` fields decide first, then the HTTP
/// status. Message text is only consulted when the body carries neither.
pub fn classify_error(model: &str, status: u16, body: &str) -> AdvisorError {
    let error = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_default();

    let provider_status = error.status.unwrap_or_default();
    let message = error
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| match body.trim() {
            "" => format!("HTTP {}", status),
            raw => raw.to_string(),
        });
    let has_reason = |reason: &str| {
        error
            .details
            .iter()
            .any(|d| d.get("reason").and_then(Value::as_str) == Some(reason))
    };

    let class = match provider_status.as_str() {
        "RESOURCE_EXHAUSTED" => ErrorClass::QuotaExhausted,
        "UNAUTHENTICATED" => ErrorClass::InvalidCredential,
        "PERMISSION_DENIED" => ErrorClass::PermissionDenied,
        _ if has_reason("API_KEY_INVALID") || message.contains("API key not valid") => {
            ErrorClass::InvalidCredential
        }
        unstructured => match status {
            429 => ErrorClass::QuotaExhausted,
            401 => ErrorClass::InvalidCredential,
            403 => ErrorClass::PermissionDenied,
            _ if unstructured.is_empty() && message.to_uppercase().contains("QUOTA") => {
                ErrorClass::QuotaExhausted
            }
            _ => ErrorClass::Other,
        },
    };

    match class {
        ErrorClass::QuotaExhausted => AdvisorError::QuotaExhausted {
            model: model.to_string(),
            message,
        },
        ErrorClass::InvalidCredential => AdvisorError::InvalidCredential(message),
        ErrorClass::PermissionDenied => AdvisorError::PermissionDenied(message),
        ErrorClass::Exhausted | ErrorClass::Other if provider_status.is_empty() => {
            AdvisorError::Provider(format!("{} HTTP {}: {}", model, status, message))
        }
        ErrorClass::Exhausted | ErrorClass::Other => AdvisorError::Provider(format!(
            "{} HTTP {} {}: {}",
            model, status, provider_status, message
        )),
    }
}

/// Build a transport for `api_key` and probe which catalog models answer
pub async fn test_available_models(
    config: GeminiConfig,
    api_key: ApiKey,
    catalog: &ModelCatalog,
) -> Result<Vec<String>> {
    let transport = GeminiTransport::new(config, api_key)?;
    Ok(probe_available_models(&transport, catalog).await)
}

fn convert_transport_error(model: &str, err: &reqwest::Error) -> AdvisorError {
    if err.is_timeout() || err.is_connect() {
        AdvisorError::ProviderUnavailable(format!("{}: {}", model, err))
    } else {
        AdvisorError::Provider(format!("{}: {}", model, err))
    }
}

fn convert_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::Safety
        }
        _ => FinishReason::Other,
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}
