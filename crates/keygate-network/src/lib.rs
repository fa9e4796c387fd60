//! # Keygate Network
//!
//! Interfaces to the threshold decryption network and its contracts.
//!
//! ## Interfaces
//!
//! - [`ThresholdNetwork`] - encrypt, decrypt, block hashes, session issuance
//! - [`ContractClient`] - minting capacity allocations
//! - [`AuthCallback`] - how the network obtains the wallet's signature
//!
//! ## In-memory implementation
//!
//! The [`memory`] module simulates a network, a chain and its contracts with
//! the same authorization rules as the real thing.

pub mod error;
pub mod memory;
pub mod messages;
pub mod traits;

pub use error::{AuthCallbackError, ErrorClass, NetworkError, Result};
pub use messages::{
    AuthCallbackParams, DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse,
    SessionSigsRequest,
};
pub use traits::{AuthCallback, ContractClient, ThresholdNetwork};
