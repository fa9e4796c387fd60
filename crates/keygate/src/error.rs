//! Error types for the client.

use std::fmt;

use keygate_core::CoreError;
use keygate_delegation::DelegationError;
use keygate_network::{ErrorClass, NetworkError};
use thiserror::Error;

/// The client operation a network failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connect,
    Disconnect,
    Mint,
    Delegate,
    Encrypt,
    Authorize,
    Decrypt,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Connect => "connect",
            Stage::Disconnect => "disconnect",
            Stage::Mint => "mint",
            Stage::Delegate => "delegate",
            Stage::Encrypt => "encrypt",
            Stage::Authorize => "authorize",
            Stage::Decrypt => "decrypt",
        })
    }
}

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required setting is absent.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// A setting is present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Decrypt was given a different condition set than encrypt used.
    #[error("condition set {got} differs from encrypt-time set {expected}")]
    ConditionMismatch { expected: String, got: String },

    /// Delegation error.
    #[error("delegation error: {0}")]
    Delegation(#[from] DelegationError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Decrypted data is not a string.
    #[error("decrypted data is not UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A network or contract call failed.
    #[error("{stage} failed: {source}")]
    Network {
        stage: Stage,
        #[source]
        source: NetworkError,
    },
}

impl ClientError {
    /// Wrap a network error raised during `stage`.
    pub fn network(stage: Stage) -> impl FnOnce(NetworkError) -> Self {
        move |source| ClientError::Network { stage, source }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Network { source, .. } => source.class(),
            _ => ErrorClass::Precondition,
        }
    }

    /// The stage of a network failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ClientError::Network { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The network error, if this is one.
    pub fn network_error(&self) -> Option<&NetworkError> {
        match self {
            ClientError::Network { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
