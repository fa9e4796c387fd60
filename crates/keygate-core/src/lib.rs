//! # Keygate Core
//!
//! Pure primitives for keygate: wallet identity, access-control conditions and
//! the signed statements that authorize decryption.
//!
//! This crate does no networking. Every operation is computation over keys,
//! statements and signatures, so it can be shared by clients and verifiers.
//!
//! ## Key Types
//!
//! - [`Wallet`] / [`WalletSigner`] - secp256k1 identity, EIP-191 signing
//! - [`ConditionSet`] - the on-chain predicate a ciphertext is bound to
//! - [`SiweMessage`] + [`Recap`] - capability-scoped sign-in statements
//! - [`AuthSig`] / [`SessionSigs`] - signed statements as they travel
//!
//! ## Verification
//!
//! Wallet auth sigs are checked with [`validate_wallet_auth_sig`]; session sigs
//! with [`verify_session_sig`].

pub mod auth_sig;
pub mod condition;
pub mod crypto;
pub mod error;
pub mod recap;
pub mod resource;
pub mod session;
pub mod siwe;
pub mod types;
pub mod validation;
pub mod wallet;

pub use auth_sig::{sign_siwe, AuthSig, SessionSigs};
pub use condition::{
    AccessControlCondition, Comparator, ConditionParameter, ConditionSet, ReturnValueTest,
    StandardContractType,
};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, SessionKeyPair};
pub use error::{CoreError, ValidationError};
pub use recap::Recap;
pub use resource::{Ability, Resource, ResourceAbilityRequest, ResourcePrefix};
pub use session::{sign_session_sigs, verify_session_sig, SessionGrant, SessionSigningPayload};
pub use siwe::SiweMessage;
pub use types::{Blockhash, CapacityTokenId, Chain, DataHash};
pub use validation::{validate_wallet_auth_sig, ValidatedStatement};
pub use wallet::{recover_address, Address, Wallet, WalletSignature, WalletSigner};
