//! The Client: condition-gated encryption for one wallet.
//!
//! The client owns nothing but its collaborators and configuration. The
//! network and contract client are connection-scoped; [`Client::connected`]
//! brackets a unit of work with connect and disconnect.

use std::future::Future;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use keygate_core::{Address, Blake3Hash, CapacityTokenId, ConditionSet, DataHash, WalletSigner};
use keygate_delegation::{
    issue_delegation, CapacityDelegationAuthSig, DelegationRequest, RateLimitParams,
};
use keygate_network::{ContractClient, DecryptRequest, EncryptRequest, ThresholdNetwork};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result, Stage};
use crate::issuer::{IssuedSession, SessionIssuer};

/// A ciphertext together with what it takes to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    /// Base64 ciphertext.
    pub ciphertext: String,
    pub data_to_encrypt_hash: DataHash,
    /// Digest of the condition set the ciphertext is bound to.
    pub conditions_digest: Blake3Hash,
}

/// The main client.
///
/// Encrypts under a fixed condition set and decrypts by proving, per call,
/// that the wallet satisfies it.
pub struct Client<N, C, S> {
    network: N,
    contracts: C,
    signer: S,
    conditions: ConditionSet,
    config: ClientConfig,
}

impl<N, C, S> Client<N, C, S>
where
    N: ThresholdNetwork,
    C: ContractClient,
    S: WalletSigner,
{
    pub fn new(
        network: N,
        contracts: C,
        signer: S,
        conditions: ConditionSet,
        config: ClientConfig,
    ) -> Self {
        Self {
            network,
            contracts,
            signer,
            conditions,
            config,
        }
    }

    /// The wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connection Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Connect to the network and the contracts.
    pub async fn connect(&self) -> Result<()> {
        self.network
            .connect()
            .await
            .map_err(ClientError::network(Stage::Connect))?;
        self.contracts
            .connect()
            .await
            .map_err(ClientError::network(Stage::Connect))?;
        info!(address = %self.address(), chain = %self.config.chain, "client connected");
        Ok(())
    }

    /// Disconnect from the network.
    pub async fn disconnect(&self) -> Result<()> {
        self.network
            .disconnect()
            .await
            .map_err(ClientError::network(Stage::Disconnect))
    }

    /// Connect, run `work`, and disconnect whatever `work` returned.
    ///
    /// When both `work` and the disconnect fail, the error from `work` is
    /// returned and the disconnect failure is logged.
    pub async fn connected<'a, F, Fut, T>(&'a self, work: F) -> Result<T>
    where
        F: FnOnce(&'a Self) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        let result = match self.connect().await {
            Ok(()) => work(self).await,
            Err(e) => Err(e),
        };
        let closed = self.disconnect().await;

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(disconnect)) => {
                warn!(error = %disconnect, "disconnect failed after error");
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capacity
    // ─────────────────────────────────────────────────────────────────────────

    /// Mint an allocation owned by this wallet.
    #[instrument(skip(self), fields(address = %self.address()))]
    pub async fn mint_capacity_token(&self, params: RateLimitParams) -> Result<CapacityTokenId> {
        self.contracts
            .mint_capacity_credits(params)
            .await
            .map_err(ClientError::network(Stage::Mint))
    }

    /// Let `delegatees` spend `uses` of an allocation this wallet owns.
    #[instrument(skip(self, delegatees), fields(address = %self.address()))]
    pub async fn delegate_capacity(
        &self,
        token_id: CapacityTokenId,
        delegatees: impl IntoIterator<Item = Address>,
        uses: u64,
    ) -> Result<CapacityDelegationAuthSig> {
        let anchor = self
            .network
            .latest_blockhash()
            .await
            .map_err(ClientError::network(Stage::Delegate))?;

        let mut request = DelegationRequest::new(token_id, delegatees, uses)
            .with_domain(self.config.domain.clone())
            .with_expiration(Utc::now() + self.config.delegation_ttl);
        request.chain = self.config.chain;

        Ok(issue_delegation(&self.signer, &request, &anchor).await?)
    }

    /// Mint an allocation with the configured rate limit and delegate it to
    /// this wallet.
    pub async fn mint_capacity_credits(&self) -> Result<CapacityDelegationAuthSig> {
        let token_id = self.mint_capacity_token(self.config.rate_limit).await?;
        self.delegate_capacity(token_id, [self.address()], self.config.delegation_uses)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cipher Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt under the client's condition set.
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedMessage> {
        self.encrypt_with(&self.conditions, plaintext).await
    }

    pub async fn encrypt_string(&self, plaintext: &str) -> Result<EncryptedMessage> {
        self.encrypt(plaintext.as_bytes()).await
    }

    /// Encrypt under `conditions`.
    #[instrument(skip_all, fields(chain = %self.config.chain, len = plaintext.len()))]
    pub async fn encrypt_with(
        &self,
        conditions: &ConditionSet,
        plaintext: &[u8],
    ) -> Result<EncryptedMessage> {
        let response = self
            .network
            .encrypt(EncryptRequest {
                access_control_conditions: conditions.clone(),
                chain: self.config.chain,
                plaintext: plaintext.to_vec(),
            })
            .await
            .map_err(ClientError::network(Stage::Encrypt))?;

        Ok(EncryptedMessage {
            ciphertext: response.ciphertext,
            data_to_encrypt_hash: response.data_to_encrypt_hash,
            conditions_digest: conditions.digest(),
        })
    }

    /// Run one session issuance round.
    pub async fn session_signatures(
        &self,
        delegation: &CapacityDelegationAuthSig,
    ) -> Result<IssuedSession> {
        SessionIssuer::new(&self.network, &self.signer, self.config.chain, &self.config.domain)
            .with_statement(self.config.statement.as_deref())
            .with_session_ttl(self.config.session_ttl)
            .issue(delegation)
            .await
    }

    /// Decrypt under the client's condition set.
    pub async fn decrypt(
        &self,
        message: &EncryptedMessage,
        delegation: &CapacityDelegationAuthSig,
    ) -> Result<Vec<u8>> {
        self.decrypt_with(&self.conditions, message, delegation).await
    }

    pub async fn decrypt_string(
        &self,
        message: &EncryptedMessage,
        delegation: &CapacityDelegationAuthSig,
    ) -> Result<String> {
        Ok(String::from_utf8(self.decrypt(message, delegation).await?)?)
    }

    /// Decrypt under `conditions`, which must be the set used to encrypt.
    #[instrument(skip_all, fields(chain = %self.config.chain, hash = %message.data_to_encrypt_hash))]
    pub async fn decrypt_with(
        &self,
        conditions: &ConditionSet,
        message: &EncryptedMessage,
        delegation: &CapacityDelegationAuthSig,
    ) -> Result<Vec<u8>> {
        let digest = conditions.digest();
        if digest != message.conditions_digest {
            return Err(ClientError::ConditionMismatch {
                expected: message.conditions_digest.to_hex(),
                got: digest.to_hex(),
            });
        }

        let session = self.session_signatures(delegation).await?;
        let response = self
            .network
            .decrypt(DecryptRequest {
                access_control_conditions: conditions.clone(),
                chain: self.config.chain,
                ciphertext: message.ciphertext.clone(),
                data_to_encrypt_hash: message.data_to_encrypt_hash.clone(),
                session_sigs: session.session_sigs,
            })
            .await
            .map_err(ClientError::network(Stage::Decrypt))?;

        Ok(response.decrypted_data)
    }
}
