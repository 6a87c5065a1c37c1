//! Error types for the planforge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all planforge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Planner errors ---
    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    // --- Capability errors ---
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Executor errors ---
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

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

/// Errors raised by a planner client.
///
/// The first two variants are the classified, potentially-retriable classes;
/// everything else is fatal for the current acquisition call.
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    /// The planner produced a response that failed to parse into a valid plan.
    #[error("Planner produced an invalid plan: {0}")]
    InvalidPlan(String),

    /// The planner referenced a capability/function not present in the registry.
    #[error("Planner referenced unknown function: {capability}.{function}")]
    MissingFunction { capability: String, function: String },

    /// Any other planner failure. Never retried.
    #[error("Planner failed: {0}")]
    Fatal(String),
}

impl PlannerError {
    /// Whether this error belongs to one of the classified retriable classes.
    /// Classification alone does not grant a retry; the retry budget decides.
    pub fn is_classified(&self) -> bool {
        !matches!(self, PlannerError::Fatal(_))
    }
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Capability not found: {0}")]
    NotFound(String),

    #[error("Function not found: {capability}.{function}")]
    FunctionNotFound { capability: String, function: String },

    #[error("Capability invocation failed: {capability}.{function} — {reason}")]
    InvocationFailed {
        capability: String,
        function: String,
        reason: String,
    },

    #[error("Invalid capability arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Plan has no steps to execute")]
    EmptyPlan,

    #[error("Step {index} failed: {source}")]
    StepFailed {
        index: usize,
        #[source]
        source: CapabilityError,
    },
}
