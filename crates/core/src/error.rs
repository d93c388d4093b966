//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Stable classification of a failure, independent of the reason text.
///
/// Callers map kinds to transport-level status codes; the domain never does.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    InvalidTransition,
    ValidationFailed,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic workflow failures (permissions, graph
/// edges, guards, stale preconditions). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No identity context was supplied.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The actor's role or ownership does not permit the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// No edge in the relevant state graph matches the requested move.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Structural input defect (comment too short, empty item set, bad quantities).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The stored state no longer matches what the caller observed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Unauthenticated => ErrorKind::Unauthenticated,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::ValidationFailed,
            DomainError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}
