//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, permissions, partially applied batches). Store adapters map
/// their own failures into `Conflict`/`Storage`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A caller-supplied value was malformed or out of range.
    ///
    /// Always detected before any write.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation would violate an invariant (e.g. negative stock).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A referenced product/lot does not exist.
    #[error("not found")]
    NotFound,

    /// The caller's role does not permit the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A multi-step sequence failed partway. Completed steps are not rolled back.
    #[error("partial batch failure ({completed} completed, {failed} failed): {message}")]
    PartialBatchFailure {
        completed: usize,
        failed: usize,
        message: String,
    },

    /// A concurrent writer won (e.g. retries exhausted on a stock transaction).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn partial(completed: usize, failed: usize, msg: impl Into<String>) -> Self {
        Self::PartialBatchFailure {
            completed,
            failed,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for failures that were caught before anything was written.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
