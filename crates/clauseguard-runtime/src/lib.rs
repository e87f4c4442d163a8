//! # clauseguard-runtime
//!
//! Async analysis runtime: LLM-assisted clause judgments on top of the
//! deterministic engine in `clauseguard-core`.
//!
//! ## Architecture
//!
//! ```text
//! PreparedSource
//!   │
//!   ├── segment + rule catalog      (clauseguard-core, synchronous)
//!   │
//!   ├── JudgmentAdapter × N         (bounded fan-out, shared semaphore,
//!   │                                retry with jittered backoff)
//!   │
//!   └── reconcile + aggregate       (clauseguard-core, clause order)
//!         │
//!         └── ContractReport
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use clauseguard_runtime::{AnalysisOrchestratorBuilder, RuntimeConfig};
//!
//! let orchestrator = AnalysisOrchestratorBuilder::new()
//!     .config(RuntimeConfig::from_file("clauseguard.yaml")?)
//!     .openai_from_env()?
//!     .build()?;
//!
//! let report = orchestrator.analyze(&source).await?;
//! ```

pub mod config;
pub mod judge;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod response;
pub mod retry;

pub use config::{DeterminismConfig, LlmConfig, RetryConfig, RuntimeConfig, TimeoutConfig};
pub use judge::JudgmentAdapter;
pub use orchestrator::{AnalysisOrchestrator, AnalysisOrchestratorBuilder, CancelHandle, CancelToken};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, MockProvider, OpenAiProvider,
    ProviderError, TokenUsage,
};
pub use response::ValidationError;
pub use retry::RetryPolicy;

use clauseguard_core::{AnalysisError, ConfigError};
use thiserror::Error;

/// Errors from the analysis runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Analysis cancelled")]
    Cancelled,
}
