//! Model Fallback
//!
//! Runs one generation request across the ranked model chain. The preferred
//! model goes first, the remaining models follow in catalog order. Attempts are
//! strictly sequential: a quota-exhausted model is skipped, any other error
//! ends the request.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AdvisorError, Result};
use crate::model::ModelCatalog;
use crate::provider::{GenerationOptions, GenerationResponse, GenerationTransport, RequestContent};

/// Prompt used by the availability probe
pub const PROBE_PROMPT: &str = "Reply with exactly: OK";

/// Output cap for probe calls
pub const PROBE_MAX_OUTPUT_TOKENS: u32 = 10;

/// What to do with a response that succeeded but carries no text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyResponsePolicy {
    /// Treat it as unusable and try the next model
    #[default]
    Fallback,
    /// Return it to the caller as is
    Accept,
}

/// Generation client with quota-aware model fallback
#[derive(Clone)]
pub struct FallbackClient {
    transport: Arc<dyn GenerationTransport>,
    catalog: Arc<ModelCatalog>,
    empty_policy: EmptyResponsePolicy,
    attempt_timeout: Option<Duration>,
}

impl FallbackClient {
    pub fn new(transport: Arc<dyn GenerationTransport>, catalog: Arc<ModelCatalog>) -> Self {
        Self {
            transport,
            catalog,
            empty_policy: EmptyResponsePolicy::default(),
            attempt_timeout: None,
        }
    }

    /// Bound each model attempt; an attempt that runs out of time ends the
    /// request with [`AdvisorError::ProviderUnavailable`]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn with_empty_policy(mut self, policy: EmptyResponsePolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Generate with `preferred` first, falling back on quota exhaustion.
    ///
    /// Returns [`AdvisorError::ModelsExhausted`] when every model in the chain
    /// was skipped.
    pub async fn generate(
        &self,
        preferred: Option<&str>,
        content: &RequestContent,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse> {
        let chain = self.catalog.fallback_chain(preferred);
        let mut attempted = Vec::with_capacity(chain.len());
        let mut empty = Vec::new();

        for model in chain {
            attempted.push(model.to_string());

            match self.attempt(model, content, options).await {
                Ok(response) => {
                    if response.has_text() || self.empty_policy == EmptyResponsePolicy::Accept {
                        tracing::debug!("{} answered via {}", model, self.transport.name());
                        return Ok(response);
                    }
                    tracing::warn!("{} returned an empty response, trying next model...", model);
                    empty.push(model.to_string());
                }
                Err(e) if e.is_quota_exhausted() => {
                    tracing::warn!("{} quota exceeded, trying next model...", model);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AdvisorError::ModelsExhausted { attempted, empty })
    }

    async fn attempt(
        &self,
        model: &str,
        content: &RequestContent,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse> {
        let call = self.transport.generate(model, content, options);
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                AdvisorError::ProviderUnavailable(format!(
                    "{} did not answer within {:?}",
                    model, limit
                ))
            })?,
            None => call.await,
        }
    }

    /// Models that currently answer with this client's transport
    pub async fn test_available_models(&self) -> Vec<String> {
        probe_available_models(self.transport.as_ref(), &self.catalog).await
    }
}

/// Send a minimal request to every catalog model and keep the ones that reply.
///
/// Never fails: a model that errors for any reason is left out of the result.
/// The returned ids keep catalog order.
pub async fn probe_available_models(
    transport: &dyn GenerationTransport,
    catalog: &ModelCatalog,
) -> Vec<String> {
    let content = RequestContent::text(PROBE_PROMPT);
    let options = GenerationOptions::default().max_output_tokens(PROBE_MAX_OUTPUT_TOKENS);
    let mut available = Vec::new();

    for model in catalog.ids() {
        match transport.generate(model, &content, &options).await {
            Ok(response) if response.has_text() => {
                tracing::debug!("probe: {} available", model);
                available.push(model.to_string());
            }
            Ok(_) => tracing::debug!("probe: {} returned no text", model),
            Err(e) => tracing::debug!("probe: {} unavailable ({:?}): {}", model, e.class(), e),
        }
    }

    available
}
