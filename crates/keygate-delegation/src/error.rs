//! Error types for capacity delegation.

use thiserror::Error;

/// Errors that can occur while issuing or inspecting a delegation.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// A delegation must name at least one delegatee.
    #[error("delegation names no delegatees")]
    NoDelegatees,

    /// A delegation must allow at least one use.
    #[error("delegation must allow at least one use")]
    ZeroUses,

    /// Rate-limit parameters out of range.
    #[error("invalid rate-limit parameters: {0}")]
    InvalidRateLimit(String),

    /// The auth sig is not a capacity delegation.
    #[error("not a capacity delegation: {0}")]
    NotADelegation(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] keygate_core::CoreError),

    /// Signature or statement validation failed.
    #[error("validation error: {0}")]
    ValidationError(#[from] keygate_core::ValidationError),
}

/// Result type for delegation operations.
pub type Result<T> = std::result::Result<T, DelegationError>;
