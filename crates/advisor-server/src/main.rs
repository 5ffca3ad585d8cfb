//! Investment dashboard HTTP server
//!
//! Axum-based server hosting the analysis tools. The tool cache, model catalog
//! and tool registry are created once here and shared through `AppState`.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisor_core::{ApiKey, GenerationTransport, ModelCatalog, ToolCache, ToolRegistry};
use advisor_runtime::{GeminiConfig, GeminiTransport};

use crate::handlers::{
    generate, get_cache, health_check, list_models, list_tools, put_cache, test_models,
};
use crate::state::{AppState, TransportFactory};

/// API routes over the given state
fn router(state: AppState) -> Router {
    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        .route("/api/models/test", post(test_models))

        // Tools
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{tool_id}/cache", get(get_cache).put(put_cache))
        .route("/api/tools/{tool_id}/generate", post(generate))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let catalog = Arc::new(ModelCatalog::gemini());
    let tools = Arc::new(ToolRegistry::builtin());

    let default_key = ApiKey::resolve(None).ok();
    match &default_key {
        Some(key) => tracing::info!("✓ Gemini API key configured ({})", key),
        None => {
            tracing::warn!("⚠ No Gemini API key configured - requests must bring their own");
            tracing::warn!("  Set GEMINI_API_KEY in .env");
        }
    }

    let preferred_model = std::env::var("GEMINI_MODEL").ok().filter(|m| !m.trim().is_empty());
    if let Some(model) = &preferred_model {
        if !catalog.contains(model) {
            tracing::warn!(
                "⚠ GEMINI_MODEL={} is not a known model, default {} will be used",
                model,
                catalog.default_model()
            );
        }
    }

    // One HTTP client shared by every per-key transport
    let gemini = GeminiConfig::from_env();
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(gemini.timeout_secs))
        .build()?;
    let transports: TransportFactory = Arc::new(move |key: ApiKey| {
        Arc::new(GeminiTransport::with_client(http.clone(), gemini.clone(), key))
            as Arc<dyn GenerationTransport>
    });

    tracing::info!("Model chain:");
    for model in catalog.models() {
        tracing::info!("  • {} - {}", model.id, model.description);
    }
    tracing::info!("Registered {} tools", tools.len());

    // Build application state
    let state = AppState {
        catalog,
        tools,
        cache: Arc::new(ToolCache::new()),
        transports,
        default_key,
        preferred_model,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        // Static files (dashboard frontend)
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 advisor server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                       - Health check");
    tracing::info!("  GET  /api/models                   - Model chain");
    tracing::info!("  POST /api/models/test              - Probe available models");
    tracing::info!("  GET  /api/tools                    - Analysis tools");
    tracing::info!("  GET  /api/tools/{{tool_id}}/cache    - Cached tool state");
    tracing::info!("  PUT  /api/tools/{{tool_id}}/cache    - Save tool state");
    tracing::info!("  POST /api/tools/{{tool_id}}/generate - Run analysis");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use advisor_core::{
        AdvisorError, GenerationOptions, GenerationResponse, GroundingReference, RequestContent,
        Result,
    };
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Stand-in transport: the best model is out of quota, key "bad" is rejected
    struct StubTransport {
        key: ApiKey,
    }

    #[async_trait]
    impl GenerationTransport for StubTransport {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn generate(
            &self,
            model: &str,
            _content: &RequestContent,
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse> {
            if self.key.expose() == "bad" {
                return Err(AdvisorError::InvalidCredential("API key not valid".into()));
            }
            if model == "gemini-2.5-pro" {
                return Err(AdvisorError::QuotaExhausted {
                    model: model.into(),
                    message: "RESOURCE_EXHAUSTED".into(),
                });
            }
            Ok(GenerationResponse::new(model, "```json\n{\"outlook\": \"bullish\"}\n```")
                .with_grounding(vec![GroundingReference::new("cnyes", "https://www.cnyes.com/a")]))
        }
    }

    fn test_state(default_key: Option<&str>) -> AppState {
        AppState {
            catalog: Arc::new(ModelCatalog::gemini()),
            tools: Arc::new(ToolRegistry::builtin()),
            cache: Arc::new(ToolCache::new()),
            transports: Arc::new(|key: ApiKey| {
                Arc::new(StubTransport { key }) as Arc<dyn GenerationTransport>
            }),
            default_key: default_key.map(|k| ApiKey::new(k).unwrap()),
            preferred_model: None,
        }
    }

    async fn call(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(value) => Body::from(value.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_cache_absent_then_saved() {
        let state = test_state(None);

        let (status, body) =
            call(router(state.clone()), "GET", "/api/tools/fund-assistant/cache", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cached"], Value::Null);

        let (status, _) = call(
            router(state.clone()),
            "PUT",
            "/api/tools/fund-assistant/cache",
            Some(json!({ "query": "0050", "result": { "funds": [] } })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = call(router(state), "GET", "/api/tools/fund-assistant/cache", None).await;
        assert_eq!(body["cached"]["query"], "0050");
        assert!(body["saved_at"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (status, body) =
            call(router(test_state(None)), "GET", "/api/tools/nope/cache", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_TOOL");
    }

    #[tokio::test]
    async fn test_generate_falls_back_and_caches() {
        let state = test_state(Some("good"));
        let (status, body) = call(
            router(state.clone()),
            "POST",
            "/api/tools/gemini-stock-prophet/generate",
            Some(json!({ "query": "2330.TW", "model": "gemini-2.5-pro" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], "gemini-2.5-flash");
        assert_eq!(body["result"]["outlook"], "bullish");
        assert_eq!(body["grounding"][0]["uri"], "https://www.cnyes.com/a");

        let cached = state.cache.read(&"gemini-stock-prophet".into()).unwrap();
        assert_eq!(cached.query, "2330.TW");
        assert_eq!(cached.model.as_deref(), Some("gemini-2.5-flash"));
        assert!(cached.auxiliary.contains_key("sources"));
    }

    #[tokio::test]
    async fn test_generate_error_mapping() {
        let (status, body) = call(
            router(test_state(None)),
            "POST",
            "/api/tools/trend-dashboard/generate",
            Some(json!({ "query": "AI" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "MISSING_API_KEY");

        let (status, body) = call(
            router(test_state(None)),
            "POST",
            "/api/tools/trend-dashboard/generate",
            Some(json!({ "query": "AI", "api_key": "bad" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_API_KEY");

        let (status, body) = call(
            router(test_state(Some("good"))),
            "POST",
            "/api/tools/trend-dashboard/generate",
            Some(json!({ "query": "AI", "api_key": "AIza key" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_API_KEY");
    }

    #[tokio::test]
    async fn test_probe_endpoint() {
        let (status, body) = call(
            router(test_state(Some("good"))),
            "POST",
            "/api/models/test",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], json!(["gemini-2.5-flash", "gemini-2.0-flash"]));

        let (_, body) = call(
            router(test_state(None)),
            "POST",
            "/api/models/test",
            Some(json!({ "api_key": "bad" })),
        )
        .await;
        assert_eq!(body["available"], json!([]));
    }

    #[tokio::test]
    async fn test_list_tools_and_models() {
        let (_, body) = call(router(test_state(None)), "GET", "/api/tools", None).await;
        assert_eq!(body["navigation"].as_array().map(Vec::len), Some(6));
        assert_eq!(body["tools"].as_array().map(Vec::len), Some(8));

        let (_, body) = call(router(test_state(None)), "GET", "/api/models", None).await;
        assert_eq!(body["models"][0]["id"], "gemini-2.5-pro");
        assert_eq!(body["default_model"], "gemini-2.0-flash");
    }
}
