//! Model Catalog
//!
//! Static, ranked list of generation models. Position in the catalog is the
//! rank: best reasoning first, most reliable (highest free quota) last.

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

/// Model used when no (or an unknown) preference is supplied
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Information about a model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Provider model identifier (e.g., "gemini-2.5-pro")
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// What choosing this model trades off
    pub description: String,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Ordered fallback chain configuration
#[derive(Clone, Debug, Serialize)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
    default_model: String,
}

impl ModelCatalog {
    /// Build a catalog from an ordered list; the first entry is the best model.
    ///
    /// The default model falls back to the last (most reliable) entry when
    /// [`DEFAULT_MODEL`] is not part of the list.
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self> {
        let Some(last) = models.last() else {
            return Err(AdvisorError::Config("model catalog is empty".into()));
        };

        for (i, model) in models.iter().enumerate() {
            if models[..i].iter().any(|m| m.id == model.id) {
                return Err(AdvisorError::Config(format!(
                    "duplicate model id in catalog: {}",
                    model.id
                )));
            }
        }

        let default_model = if models.iter().any(|m| m.id == DEFAULT_MODEL) {
            DEFAULT_MODEL.to_string()
        } else {
            last.id.clone()
        };

        Ok(Self {
            models,
            default_model,
        })
    }

    /// The Gemini models offered by the dashboard
    pub fn gemini() -> Self {
        Self {
            models: vec![
                ModelDescriptor::new(
                    "gemini-2.5-pro",
                    "Gemini 2.5 Pro",
                    "Best reasoning, lowest quota",
                ),
                ModelDescriptor::new(
                    "gemini-2.5-flash",
                    "Gemini 2.5 Flash",
                    "Balance of speed and quality",
                ),
                ModelDescriptor::new(
                    DEFAULT_MODEL,
                    "Gemini 2.0 Flash",
                    "Most stable, highest free quota",
                ),
            ],
            default_model: DEFAULT_MODEL.into(),
        }
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Model ids in rank order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Zero-based rank of a model (0 = best)
    pub fn rank(&self, id: &str) -> Option<usize> {
        self.models.iter().position(|m| m.id == id)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Map a caller preference onto a known model id
    pub fn resolve_preferred(&self, preferred: Option<&str>) -> &str {
        match preferred.map(str::trim).filter(|p| !p.is_empty()) {
            Some(id) => match self.get(id) {
                Some(model) => model.id.as_str(),
                None => {
                    tracing::warn!(
                        "Unknown model '{}', using default {}",
                        id,
                        self.default_model
                    );
                    self.default_model.as_str()
                }
            },
            None => self.default_model.as_str(),
        }
    }

    /// Attempt order for one request: preferred model first, then every other
    /// model in rank order.
    pub fn fallback_chain(&self, preferred: Option<&str>) -> Vec<&str> {
        let first = self.resolve_preferred(preferred);
        std::iter::once(first)
            .chain(self.ids().filter(|id| *id != first))
            .collect()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::gemini()
    }
}
