//! # advisor-runtime
//!
//! Generation transports for the advisor fallback client.
//!
//! ## Transports
//!
//! - **Gemini** (default): Google Generative Language `generateContent` API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use advisor_runtime::{GeminiConfig, GeminiTransport};
//!
//! let transport = GeminiTransport::new(GeminiConfig::from_env(), ApiKey::resolve(None)?)?;
//! let client = FallbackClient::new(Arc::new(transport), Arc::new(ModelCatalog::gemini()));
//! let response = client.generate(Some("gemini-2.5-flash"), &content, &options).await?;
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiTransport, classify_error, test_available_models};

// Re-export core types for convenience
pub use advisor_core::{
    AdvisorError, ApiKey, FallbackClient, GenerationOptions, GenerationResponse,
    GenerationTransport, ModelCatalog, RequestContent, Result, ToolCache, ToolId, ToolState,
};
