//! # Keygate Delegation
//!
//! Rate-limit capacity and its delegation.
//!
//! Decrypt requests are paid for out of a capacity allocation minted on the
//! network. The allocation's owner signs a [`CapacityDelegationAuthSig`]
//! naming the wallets that may spend it and how many times; those wallets
//! attach it to every session they open.
//!
//! ## Key Types
//!
//! - [`RateLimitParams`] / [`CapacityAllocation`] - what gets minted
//! - [`DelegationRequest`] - what the owner wants to delegate
//! - [`CapacityDelegationAuthSig`] - the signed, opaque bearer token
//! - [`DelegationClaims`] - a verified view of a delegation

pub mod allocation;
pub mod capacity;
pub mod error;

pub use allocation::{CapacityAllocation, RateLimitParams};
pub use capacity::{
    claims_of, fingerprint_of, issue_delegation, CapacityDelegationAuthSig, DelegationClaims, DelegationRequest,
    DELEGATION_URI,
};
pub use error::{DelegationError, Result};
