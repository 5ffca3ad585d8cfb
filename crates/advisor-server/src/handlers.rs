//! HTTP Handlers

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use advisor_core::{
    AdvisorError, ErrorClass, GenerationOptions, GroundingReference, ModelDescriptor,
    RequestContent, ToolConfig, ToolId, ToolState,
};

use crate::state::AppState;

/// Error half of every fallible handler
pub type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub api_key_configured: bool,
    pub cached_tools: usize,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelDescriptor>,
    pub default_model: String,
    pub preferred_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestModelsRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestModelsResponse {
    pub available: Vec<String>,
}

#[derive(Serialize)]
pub struct ToolsResponse {
    pub navigation: Vec<ToolConfig>,
    pub tools: Vec<ToolConfig>,
}

#[derive(Debug, Serialize)]
pub struct CacheResponse {
    pub cached: Option<ToolState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// What the user asked; stored with the result
    pub query: String,

    /// Full request content; defaults to the query text
    #[serde(default)]
    pub content: Option<RequestContent>,

    /// Preferred model for this request
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub options: GenerationOptions,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Extra lists the tool wants saved alongside the result
    #[serde(default)]
    pub auxiliary: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
    pub grounding: Vec<GroundingReference>,
    /// Decoded JSON payload, or the text as a string
    pub result: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============================================================================
// Error Mapping
// ============================================================================

fn advisor_error(err: &AdvisorError) -> ApiError {
    let (status, code) = match (err.class(), err) {
        (_, AdvisorError::MissingCredential) => (StatusCode::UNAUTHORIZED, "MISSING_API_KEY"),
        (ErrorClass::InvalidCredential, _) => (StatusCode::UNAUTHORIZED, "INVALID_API_KEY"),
        (ErrorClass::PermissionDenied, _) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        (ErrorClass::QuotaExhausted, _) => (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXHAUSTED"),
        (ErrorClass::Exhausted, _) => (StatusCode::SERVICE_UNAVAILABLE, "MODELS_EXHAUSTED"),
        (_, AdvisorError::Config(_) | AdvisorError::Json(_)) => {
            (StatusCode::BAD_REQUEST, "BAD_REQUEST")
        }
        (_, AdvisorError::ProviderUnavailable(_)) => {
            (StatusCode::GATEWAY_TIMEOUT, "PROVIDER_UNAVAILABLE")
        }
        _ => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
    };

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

fn unknown_tool(tool_id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("The tool '{}' is not available.", tool_id),
            code: "UNKNOWN_TOOL".into(),
        }),
    )
}

fn known_tool(state: &AppState, tool_id: &str) -> Result<ToolId, ApiError> {
    state
        .tools
        .get(tool_id)
        .map(|tool| tool.id.clone())
        .ok_or_else(|| unknown_tool(tool_id))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        api_key_configured: state.default_key.is_some(),
        cached_tools: state.cache.len(),
    })
}

/// Ranked model catalog
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.catalog.models().to_vec(),
        default_model: state.catalog.default_model().to_string(),
        preferred_model: state.preferred_model.clone(),
    })
}

/// Probe which models the given (or default) key can use
pub async fn test_models(
    State(state): State<AppState>,
    Json(payload): Json<TestModelsRequest>,
) -> Result<Json<TestModelsResponse>, ApiError> {
    let client = state
        .client_for(payload.api_key.as_deref())
        .map_err(|e| advisor_error(&e))?;

    let available = client.test_available_models().await;
    tracing::info!("Model probe: {} of {} available", available.len(), state.catalog.len());

    Ok(Json(TestModelsResponse { available }))
}

/// Tool registry
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        navigation: state.tools.navigation().into_iter().cloned().collect(),
        tools: state.tools.all().to_vec(),
    })
}

/// Cached state for a tool; `cached` is null when nothing was saved yet
pub async fn get_cache(
    State(state): State<AppState>,
    Path(tool_id): Path<String>,
) -> Result<Json<CacheResponse>, ApiError> {
    let id = known_tool(&state, &tool_id)?;
    let entry = state.cache.entry(&id);

    Ok(Json(CacheResponse {
        saved_at: entry.as_ref().map(|e| e.saved_at),
        cached: entry.map(|e| e.value),
    }))
}

/// Overwrite the cached state for a tool
pub async fn put_cache(
    State(state): State<AppState>,
    Path(tool_id): Path<String>,
    Json(payload): Json<ToolState>,
) -> Result<StatusCode, ApiError> {
    let id = known_tool(&state, &tool_id)?;
    state.cache.write(id, payload);
    Ok(StatusCode::NO_CONTENT)
}

/// Run an analysis through the fallback chain and cache the outcome
pub async fn generate(
    State(state): State<AppState>,
    Path(tool_id): Path<String>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let id = known_tool(&state, &tool_id)?;
    let client = state
        .client_for(payload.api_key.as_deref())
        .map_err(|e| advisor_error(&e))?;

    let content = payload
        .content
        .unwrap_or_else(|| RequestContent::text(payload.query.clone()));
    let preferred = payload.model.as_deref().or(state.preferred_model.as_deref());

    let response = client
        .generate(preferred, &content, &payload.options)
        .await
        .map_err(|e| {
            tracing::error!("{} generation failed: {}", id, e);
            advisor_error(&e)
        })?;

    let result = response
        .json_payload::<serde_json::Value>()
        .unwrap_or_else(|_| serde_json::Value::String(response.text.clone()));

    let mut snapshot = ToolState::new(payload.query, result.clone()).with_model(&response.model);
    snapshot.auxiliary = payload.auxiliary;
    if !response.grounding.is_empty() {
        let sources = serde_json::to_value(&response.grounding)
            .map_err(|e| advisor_error(&AdvisorError::from(e)))?;
        snapshot = snapshot.with_auxiliary("sources", sources);
    }
    state.cache.write(id, snapshot);

    Ok(Json(GenerateResponse {
        text: response.text,
        model: response.model,
        grounding: response.grounding,
        result,
    }))
}
