//! # advisor-core
//!
//! Session-scoped tool cache and quota-aware model fallback for the
//! investment analysis dashboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Tool page                              │
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────────┐  │
//! │  │  ToolCache   │   │ FallbackClient │──▶│ Generation     │  │
//! │  │ (read once,  │   │ (ModelCatalog  │   │ Transport      │  │
//! │  │  write many) │   │  chain)        │   │ (Strategy)     │  │
//! │  └──────────────┘   └────────────────┘   └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `GenerationTransport` trait keeps the fallback logic independent of the
//! provider; `advisor-runtime` supplies the Gemini implementation.

pub mod cache;
pub mod credential;
pub mod error;
pub mod fallback;
pub mod model;
pub mod provider;
pub mod tool;

pub use cache::{CacheEntry, ToolCache, ToolSlot, ToolState};
pub use credential::ApiKey;
pub use error::{AdvisorError, ErrorClass, Result};
pub use fallback::{EmptyResponsePolicy, FallbackClient, probe_available_models};
pub use model::{DEFAULT_MODEL, ModelCatalog, ModelDescriptor};
pub use provider::{
    GenerationOptions, GenerationResponse, GenerationTransport, GroundingReference, RequestContent,
};
pub use tool::{ToolCategory, ToolConfig, ToolId, ToolRegistry};
