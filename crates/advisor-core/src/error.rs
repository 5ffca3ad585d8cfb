//! Error Types

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Coarse classification the fallback loop and the UI switch on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The attempted model has no remaining quota; try the next one
    QuotaExhausted,
    /// The credential is not allowed to use the model or endpoint
    PermissionDenied,
    /// The credential is missing, malformed or rejected
    InvalidCredential,
    /// Every model in the fallback chain was quota-exhausted
    Exhausted,
    /// Anything else (malformed request, server fault, network)
    Other,
}

/// Advisor error types
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Model is rate limited or out of quota
    #[error("Quota exhausted for model {model}: {message}")]
    QuotaExhausted { model: String, message: String },
    
    /// Credential lacks permission for the model
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    
    /// Credential rejected by the provider
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    
    /// No credential configured at all
    #[error("No API key configured")]
    MissingCredential,
    
    /// Any other provider-side error
    #[error("Provider error: {0}")]
    Provider(String),
    
    /// Provider unreachable or timed out
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    
    /// Every model in the fallback chain was skipped; `empty` lists the ones
    /// that answered without text
    #[error("All models exhausted ({})", .attempted.join(", "))]
    ModelsExhausted {
        attempted: Vec<String>,
        empty: Vec<String>,
    },
    
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
    
    /// Response payload could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),
    
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            AdvisorError::QuotaExhausted { .. } => ErrorClass::QuotaExhausted,
            AdvisorError::PermissionDenied(_) => ErrorClass::PermissionDenied,
            AdvisorError::InvalidCredential(_) | AdvisorError::MissingCredential => {
                ErrorClass::InvalidCredential
            }
            AdvisorError::ModelsExhausted { .. } => ErrorClass::Exhausted,
            _ => ErrorClass::Other,
        }
    }
    
    /// Whether the fallback chain may move on to the next model
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, AdvisorError::QuotaExhausted { .. })
    }
    
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AdvisorError::QuotaExhausted { model, .. } => format!(
                "The model {} is temporarily out of capacity. Please wait a moment and retry.",
                model
            ),
            AdvisorError::PermissionDenied(_) => {
                "Your API key is not allowed to use this model. \
                 Check the key's permissions in settings."
                    .into()
            }
            AdvisorError::InvalidCredential(_) => {
                "The API key was rejected. Please check the key in settings.".into()
            }
            AdvisorError::MissingCredential => {
                "Please enter a Gemini API key in settings first.".into()
            }
            AdvisorError::ModelsExhausted { empty, .. } if empty.is_empty() => {
                "All models have reached their quota limit. Please try again later.".into()
            }
            AdvisorError::ModelsExhausted { attempted, empty }
                if empty.len() == attempted.len() =>
            {
                "No model returned an answer. Please rephrase the request or retry.".into()
            }
            AdvisorError::ModelsExhausted { .. } => {
                "No model could answer: some are out of quota, the rest returned nothing. \
                 Please try again later."
                    .into()
            }
            AdvisorError::ProviderUnavailable(_) => {
                "The AI service is currently unreachable. Please try again.".into()
            }
            AdvisorError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AdvisorError::Parse(_) | AdvisorError::Json(_) => {
                "The AI response could not be read. Please retry.".into()
            }
            AdvisorError::Config(msg) => format!("Configuration problem: {}", msg),
        }
    }
}

impl From<anyhow::Error> for AdvisorError {
    fn from(err: anyhow::Error) -> Self {
        AdvisorError::Provider(err.to_string())
    }
}
