//! Error types for keygate core.

use thiserror::Error;

/// Core errors from key handling, encoding and message parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("signature recovery failed")]
    RecoveryFailed,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("malformed SIWE message: {0}")]
    MalformedSiwe(String),

    #[error("malformed recap: {0}")]
    MalformedRecap(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("ability {ability} does not apply to resource {resource}")]
    AbilityMismatch { ability: String, resource: String },

    #[error("condition set must contain at least one condition")]
    EmptyConditionSet,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for signed statements and auth sigs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureFailed,

    #[error("signer {recovered} does not match claimed address {claimed}")]
    AddressMismatch { claimed: String, recovered: String },

    #[error("unsupported derivation: {0}")]
    UnsupportedDerivation(String),

    #[error("statement expired at {0}")]
    Expired(String),

    #[error("statement is missing {0}")]
    MissingField(&'static str),

    #[error("statement URI {got} does not match {expected}")]
    UriMismatch { expected: String, got: String },

    #[error("scope not granted: {0}")]
    ScopeNotGranted(String),

    #[error("structural error: {0}")]
    StructuralError(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::RecoveryFailed => {
                ValidationError::SignatureFailed
            }
            other => ValidationError::StructuralError(other.to_string()),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
