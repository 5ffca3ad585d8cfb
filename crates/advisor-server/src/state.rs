//! Application State

use std::sync::Arc;

use advisor_core::{
    AdvisorError, ApiKey, FallbackClient, GenerationTransport, ModelCatalog, Result, ToolCache,
    ToolId, ToolRegistry, ToolState,
};

/// Builds a transport bound to one credential
pub type TransportFactory =
    Arc<dyn Fn(ApiKey) -> Arc<dyn GenerationTransport> + Send + Sync>;

/// Shared application state, created once at bootstrap
#[derive(Clone)]
pub struct AppState {
    /// Ranked model chain
    pub catalog: Arc<ModelCatalog>,

    /// Analysis tools offered by the dashboard
    pub tools: Arc<ToolRegistry>,

    /// Last state per tool for this session
    pub cache: Arc<ToolCache<ToolId, ToolState>>,

    /// Transport constructor (Gemini in production)
    pub transports: TransportFactory,

    /// Key from the environment, used when a request brings none
    pub default_key: Option<ApiKey>,

    /// Preferred model from the environment
    pub preferred_model: Option<String>,
}

impl AppState {
    /// Resolve the credential for a request: its own key first, then the default
    pub fn api_key(&self, requested: Option<&str>) -> Result<ApiKey> {
        match requested.filter(|k| !k.trim().is_empty()) {
            Some(key) => ApiKey::new(key),
            None => self.default_key.clone().ok_or(AdvisorError::MissingCredential),
        }
    }

    /// Fallback client bound to the request's credential
    pub fn client_for(&self, requested_key: Option<&str>) -> Result<FallbackClient> {
        let key = self.api_key(requested_key)?;
        Ok(FallbackClient::new((self.transports)(key), self.catalog.clone()))
    }
}
