//! Error types for network operations.

use thiserror::Error;

/// Errors returned by an auth callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthCallbackError {
    /// The network did not supply a required parameter.
    #[error("auth callback invoked without {0}")]
    MissingField(&'static str),

    /// The wallet refused or failed to sign.
    #[error("wallet signing failed: {0}")]
    Signing(String),
}

/// Broad kind of a network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The request was malformed or its inputs invalid.
    Precondition,
    /// Rate-limit capacity was missing, expired or used up.
    Capacity,
    /// The network refused to authorize the request.
    Authorization,
    /// The network could not be reached.
    Transport,
}

/// Errors that can occur talking to the network or contracts.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// `connect` has not been called, or the client disconnected.
    #[error("not connected")]
    NotConnected,

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The signed statement's nonce is not a recent block hash.
    #[error("stale or unknown nonce: {0}")]
    StaleNonce(String),

    /// A session or wallet signature failed validation.
    #[error("invalid session signature: {0}")]
    InvalidSessionSig(String),

    /// The session sigs have expired.
    #[error("session expired")]
    SessionExpired,

    /// Fewer valid session sigs than the threshold.
    #[error("only {valid} of {required} required session sigs are valid")]
    ThresholdNotMet { valid: usize, required: usize },

    /// The session does not authorize the requested operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The wallet does not satisfy the access-control conditions.
    #[error("access control conditions not satisfied")]
    ConditionNotSatisfied,

    /// Decryption needs a capacity delegation and none was attached.
    #[error("capacity delegation required")]
    CapacityRequired,

    /// The delegated allocation does not exist.
    #[error("capacity allocation not found: {0}")]
    CapacityNotFound(String),

    /// The allocation or delegation has expired.
    #[error("capacity expired: {0}")]
    CapacityExpired(String),

    /// The delegation's use budget is spent.
    #[error("capacity exhausted: {0}")]
    CapacityExhausted(String),

    /// The minting wallet cannot pay.
    #[error("insufficient funds: need {needed} wei, have {available} wei")]
    InsufficientFunds { needed: u128, available: u128 },

    /// Ciphertext did not decrypt, or decrypted to the wrong data.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Request malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The auth callback refused.
    #[error("auth callback failed: {0}")]
    Callback(#[from] AuthCallbackError),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] keygate_core::CoreError),
}

impl NetworkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            NetworkError::NotConnected | NetworkError::TransportError(_) => ErrorClass::Transport,
            NetworkError::CapacityRequired
            | NetworkError::CapacityNotFound(_)
            | NetworkError::CapacityExpired(_)
            | NetworkError::CapacityExhausted(_)
            | NetworkError::InsufficientFunds { .. } => ErrorClass::Capacity,
            NetworkError::StaleNonce(_)
            | NetworkError::InvalidSessionSig(_)
            | NetworkError::SessionExpired
            | NetworkError::ThresholdNotMet { .. }
            | NetworkError::Unauthorized(_)
            | NetworkError::ConditionNotSatisfied
            | NetworkError::DecryptionFailed(_) => ErrorClass::Authorization,
            NetworkError::InvalidRequest(_)
            | NetworkError::Callback(_)
            | NetworkError::CoreError(_) => ErrorClass::Precondition,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NetworkError::TransportError(_))
    }
}

/// Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
