//! Error types for the Vantage core library.
//!
//! Uses `thiserror` with one sub-enum per failure domain: provider calls,
//! configuration, session lookup, and workflow execution. Cache I/O failures
//! deliberately have no variant here; the cache is fail-open and only logs.

/// Top-level error type for the Vantage core library.
#[derive(Debug, thiserror::Error)]
pub enum VantageError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from external research/synthesis collaborators.
///
/// These are always recovered locally: the research step falls back to the
/// secondary mode or records a missing subject, and synthesis substeps
/// degrade to placeholders. They never fail a run on their own.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from request parameters and the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from session lookup and report retrieval.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("Session {session_id} is not completed (status: {status})")]
    NotReady { session_id: String, status: String },

    #[error("No report exists for session {session_id}")]
    ReportNotFound { session_id: String },
}

/// Errors from the workflow controller and step executors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("No research artifacts available for synthesis")]
    NoArtifacts,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// A type alias for results using the top-level `VantageError`.
pub type Result<T> = std::result::Result<T, VantageError>;
