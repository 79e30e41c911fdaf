//! Natural-language explanations for representative anomalies.
//!
//! - [`provider`] / [`providers`]: chat-completion backends
//! - [`stages`]: the three stage definitions and their shared context
//! - [`pipeline`]: runs the stages in order against a provider
//! - [`orchestrator`]: picks one anomaly per severity tier and degrades per tier on failure
//! - [`sanitize`]: filter applied to every generated text before it is surfaced

pub mod orchestrator;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod sanitize;
pub mod stages;

pub use orchestrator::{select_representatives, ExplanationOrchestrator};
pub use pipeline::{BackendError, ExplanationPipeline, StagedPipeline};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use sanitize::{sanitize, sanitize_output};
pub use stages::{AnomalyContext, StageKind, StageOutput, StageSpec};
