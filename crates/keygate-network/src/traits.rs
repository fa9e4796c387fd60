//! Interfaces to the external collaborators.
//!
//! The decryption network and the contract client are reached only through
//! these traits. Implementations must be thread-safe (Send + Sync).

use std::sync::Arc;

use async_trait::async_trait;

use keygate_core::{AuthSig, Blockhash, CapacityTokenId, SessionSigs};
use keygate_delegation::RateLimitParams;

use crate::error::{AuthCallbackError, Result};
use crate::messages::{
    AuthCallbackParams, DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse,
    SessionSigsRequest,
};

/// Produces the wallet's signature over a session statement.
///
/// The network may invoke it once per node, concurrently.
#[async_trait]
pub trait AuthCallback: Send + Sync {
    async fn authorize(
        &self,
        params: AuthCallbackParams,
    ) -> std::result::Result<AuthSig, AuthCallbackError>;
}

/// A threshold decryption network.
#[async_trait]
pub trait ThresholdNetwork: Send + Sync {
    /// Open connections to the nodes.
    async fn connect(&self) -> Result<()>;

    /// Close connections. Safe to call when not connected.
    async fn disconnect(&self) -> Result<()>;

    /// Whether the client is connected.
    fn is_ready(&self) -> bool;

    /// A recent block hash, usable as a statement nonce.
    async fn latest_blockhash(&self) -> Result<Blockhash>;

    /// URLs of the nodes session sigs are issued for.
    fn node_urls(&self) -> Vec<String>;

    /// Encrypt under access-control conditions.
    async fn encrypt(&self, request: EncryptRequest) -> Result<EncryptResponse>;

    /// Decrypt, proving the conditions hold with session sigs.
    async fn decrypt(&self, request: DecryptRequest) -> Result<DecryptResponse>;

    /// Run a session-issuance round.
    async fn get_session_sigs(&self, request: SessionSigsRequest<'_>) -> Result<SessionSigs>;
}

/// Client for the network's on-chain contracts.
#[async_trait]
pub trait ContractClient: Send + Sync {
    async fn connect(&self) -> Result<()>;

    /// Mint a capacity allocation owned by the client's signer.
    async fn mint_capacity_credits(&self, params: RateLimitParams) -> Result<CapacityTokenId>;
}

#[async_trait]
impl<T: ThresholdNetwork + ?Sized> ThresholdNetwork for Arc<T> {
    async fn connect(&self) -> Result<()> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        (**self).disconnect().await
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    async fn latest_blockhash(&self) -> Result<Blockhash> {
        (**self).latest_blockhash().await
    }

    fn node_urls(&self) -> Vec<String> {
        (**self).node_urls()
    }

    async fn encrypt(&self, request: EncryptRequest) -> Result<EncryptResponse> {
        (**self).encrypt(request).await
    }

    async fn decrypt(&self, request: DecryptRequest) -> Result<DecryptResponse> {
        (**self).decrypt(request).await
    }

    async fn get_session_sigs(&self, request: SessionSigsRequest<'_>) -> Result<SessionSigs> {
        (**self).get_session_sigs(request).await
    }
}

#[async_trait]
impl<T: ContractClient + ?Sized> ContractClient for Arc<T> {
    async fn connect(&self) -> Result<()> {
        (**self).connect().await
    }

    async fn mint_capacity_credits(&self, params: RateLimitParams) -> Result<CapacityTokenId> {
        (**self).mint_capacity_credits(params).await
    }
}
