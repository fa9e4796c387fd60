//! # Keygate
//!
//! Condition-gated encryption: a message is encrypted under an on-chain
//! predicate, and decrypting it requires proving, per request, that the
//! current wallet satisfies that predicate.
//!
//! ## Overview
//!
//! - **Conditions**: declarative predicates over on-chain state
//! - **Capacity**: a minted rate-limit allocation, delegated to wallets
//! - **Sessions**: short-lived, capability-scoped credentials issued fresh on
//!   every decrypt, bound to a recent block hash
//! - **Cipher operations**: encrypt and decrypt against a threshold network
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use keygate::core::{AccessControlCondition, Chain, ConditionSet, Wallet};
//! use keygate::network::memory::{ChainLedger, MemoryContracts, MemoryNetwork, MemoryNetworkConfig};
//! use keygate::{Client, ClientConfig};
//!
//! async fn example() -> keygate::Result<()> {
//!     let wallet = Wallet::generate();
//!     let ledger = Arc::new(ChainLedger::new());
//!     let network = MemoryNetwork::new(ledger.clone(), MemoryNetworkConfig::default()).unwrap();
//!     let contracts = MemoryContracts::new(ledger, Arc::new(wallet.clone()), Chain::Arbitrum);
//!
//!     let nft = "0xfE34a72c55e512601E7d491A9c5b36373cE34d63".parse().unwrap();
//!     let conditions = ConditionSet::single(AccessControlCondition::erc721_holder(nft, Chain::Arbitrum));
//!     let client = Client::new(network, contracts, wallet, conditions, ClientConfig::default());
//!
//!     let plaintext = client
//!         .connected(|client| async move {
//!             let delegation = client.mint_capacity_credits().await?;
//!             let message = client.encrypt_string("Hello, world!").await?;
//!             client.decrypt_string(&message, &delegation).await
//!         })
//!         .await?;
//!     assert_eq!(plaintext, "Hello, world!");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `keygate::core` - wallets, conditions, signed statements
//! - `keygate::delegation` - capacity allocations and delegations
//! - `keygate::network` - network interfaces and the in-memory network

pub mod client;
pub mod config;
pub mod error;
pub mod issuer;

// Re-export component crates
pub use keygate_core as core;
pub use keygate_delegation as delegation;
pub use keygate_network as network;

pub use client::{Client, EncryptedMessage};
pub use config::{ClientConfig, WalletConfig};
pub use error::{ClientError, Result, Stage};
pub use issuer::{IssuedSession, SessionIssuer, WalletAuthCallback};

pub use keygate_core::{
    AccessControlCondition, Address, AuthSig, Chain, ConditionSet, SessionSigs, Wallet,
    WalletSigner,
};
pub use keygate_delegation::{CapacityDelegationAuthSig, RateLimitParams};
