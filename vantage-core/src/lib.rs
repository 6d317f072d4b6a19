//! # Vantage Core
//!
//! Core library for the Vantage competitive intelligence pipeline.
//! Provides the workflow controller, research and synthesis step executors,
//! research cache, quality validation, provider interfaces, configuration,
//! and fundamental types.

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod parse;
pub mod pipeline;
pub mod providers;
pub mod session_store;
pub mod types;
pub mod validator;

// Re-export commonly used types at the crate root.
pub use cache::{CacheStats, ResearchCache};
pub use config::{LlmConfig, ResearchConfig, VantageConfig, load_config};
pub use error::{Result, VantageError};
pub use parse::{HeuristicParser, ResponseParser};
pub use pipeline::{
    PollSnapshot, ResearchStep, RunHandle, SessionSummary, SynthesisStep, WorkflowController,
    WorkflowState,
};
pub use providers::{MockProvider, OpenAiProvider, ResearchProvider, SynthesisProvider};
pub use session_store::{InMemorySessionStore, SessionStore};
pub use types::{
    ExecutiveReport, Insight, ResearchArtifact, ResearchSource, RunStatus, StepKind, StepProgress,
};
pub use validator::Decision;
