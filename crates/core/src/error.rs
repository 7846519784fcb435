//! Error types for the AdPilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum, rolled up into [`Error`].

use thiserror::Error;

/// The top-level error type for all AdPilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Planner errors ---
    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    // --- Evaluator errors ---
    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures raised by a [`crate::planner::Planner`] implementation.
///
/// All of these abort the current run: a loop that cannot plan cannot
/// make progress.
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    #[error("Upstream API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Planner returned an invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Plan stream ended without a decision: {0}")]
    StreamInterrupted(String),

    #[error("Planner not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures raised by an [`crate::evaluator::Evaluator`] implementation.
#[derive(Debug, Clone, Error)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    Failed(String),

    #[error("Invalid policy rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },
}

/// Failures raised by tool resolution or execution.
///
/// Tool errors never abort the loop; they become failure observations the
/// planner can react to.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} - {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },
}

impl ToolError {
    /// Stable machine-readable code carried alongside the message.
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "TOOL_NOT_FOUND",
            ToolError::ExecutionFailed { .. } => "EXECUTION_FAILED",
            ToolError::Timeout { .. } => "TIMEOUT",
            ToolError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
        }
    }

    /// The tool this error refers to, when known.
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::NotFound(name) => name,
            ToolError::ExecutionFailed { tool_name, .. } => tool_name,
            ToolError::Timeout { tool_name, .. } => tool_name,
            ToolError::InvalidArguments { tool_name, .. } => tool_name,
        }
    }
}

/// Failures raised by a [`crate::store::StateStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Session-level failures surfaced to callers without mutating state.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {0} has no pending user-input request")]
    NoPendingRequest(String),

    #[error("Session {0} is busy processing another request")]
    Busy(String),
}
