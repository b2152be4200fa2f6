//! Model error type shared by the portal crates.

use thiserror::Error;

/// Result type used by model constructors and validators.
pub type DomainResult<T> = Result<T, DomainError>;

/// Model-level error.
///
/// Covers deterministic failures while building or validating portal models
/// (menu entries, roles, sessions). Transport and storage concerns have their
/// own error types in the crates that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank identifier, missing path).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A model invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A role name outside the closed role set.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn unknown_role(name: impl Into<String>) -> Self {
        Self::UnknownRole(name.into())
    }
}
