//! Session credential issuance.
//!
//! Every decrypt runs one full round: fetch a freshness anchor, hand the
//! network a [`WalletAuthCallback`] bound to that anchor, and collect the
//! per-node session sigs. Nothing is cached between rounds.

use async_trait::async_trait;
use chrono::Duration;
use serde_json::Map;
use tracing::{debug, instrument};

use keygate_core::{
    sign_siwe, AuthSig, Blockhash, Chain, Recap, ResourceAbilityRequest, SessionSigs,
    SiweMessage, WalletSigner,
};
use keygate_delegation::CapacityDelegationAuthSig;
use keygate_network::{
    AuthCallback, AuthCallbackError, AuthCallbackParams, SessionSigsRequest, ThresholdNetwork,
};

use crate::error::{ClientError, Result, Stage};

/// Signs session statements for one issuance round.
///
/// Holds only shared references and the anchor, so the network may invoke it
/// concurrently, once per node.
pub struct WalletAuthCallback<'a, S: ?Sized> {
    signer: &'a S,
    anchor: &'a Blockhash,
    chain: Chain,
    domain: &'a str,
    statement: Option<&'a str>,
}

impl<'a, S: WalletSigner + ?Sized> WalletAuthCallback<'a, S> {
    pub fn new(signer: &'a S, anchor: &'a Blockhash, chain: Chain, domain: &'a str) -> Self {
        Self {
            signer,
            anchor,
            chain,
            domain,
            statement: None,
        }
    }

    pub fn with_statement(mut self, statement: Option<&'a str>) -> Self {
        self.statement = statement;
        self
    }

    /// The statement the wallet would sign for `params`.
    pub fn statement_for(
        &self,
        params: AuthCallbackParams,
    ) -> std::result::Result<SiweMessage, AuthCallbackError> {
        let uri = params.uri.ok_or(AuthCallbackError::MissingField("uri"))?;
        let expiration = params
            .expiration
            .ok_or(AuthCallbackError::MissingField("expiration"))?;
        let requests = params
            .resource_ability_requests
            .filter(|requests| !requests.is_empty())
            .ok_or(AuthCallbackError::MissingField("resourceAbilityRequests"))?;

        let mut recap = Recap::new();
        for request in &requests {
            recap.add_attenuation(&request.resource, request.ability, Map::new());
        }

        let mut message = SiweMessage::new(
            self.domain,
            self.signer.address(),
            uri,
            self.chain.chain_id(),
            self.anchor.as_str(),
        )
        .with_expiration(expiration);
        if let Some(statement) = self.statement {
            message = message.with_statement(statement);
        }
        message
            .with_recap(&recap)
            .map_err(|e| AuthCallbackError::Signing(e.to_string()))
    }
}

#[async_trait]
impl<S: WalletSigner + ?Sized> AuthCallback for WalletAuthCallback<'_, S> {
    async fn authorize(
        &self,
        params: AuthCallbackParams,
    ) -> std::result::Result<AuthSig, AuthCallbackError> {
        let message = self.statement_for(params)?;
        let auth_sig = sign_siwe(self.signer, &message)
            .await
            .map_err(|e| AuthCallbackError::Signing(e.to_string()))?;
        debug!(uri = %message.uri, nonce = %message.nonce, "signed session statement");
        Ok(auth_sig)
    }
}

/// The outcome of one issuance round.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Block hash the wallet's statement was bound to.
    pub anchor: Blockhash,
    pub session_sigs: SessionSigs,
}

/// Runs issuance rounds against a network on behalf of a wallet.
pub struct SessionIssuer<'a, N: ?Sized, S: ?Sized> {
    network: &'a N,
    signer: &'a S,
    chain: Chain,
    domain: &'a str,
    statement: Option<&'a str>,
    session_ttl: Option<Duration>,
}

impl<'a, N, S> SessionIssuer<'a, N, S>
where
    N: ThresholdNetwork + ?Sized,
    S: WalletSigner + ?Sized,
{
    pub fn new(network: &'a N, signer: &'a S, chain: Chain, domain: &'a str) -> Self {
        Self {
            network,
            signer,
            chain,
            domain,
            statement: None,
            session_ttl: None,
        }
    }

    pub fn with_statement(mut self, statement: Option<&'a str>) -> Self {
        self.statement = statement;
        self
    }

    pub fn with_session_ttl(mut self, session_ttl: Option<Duration>) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// Run one round, paying with `delegation`.
    #[instrument(skip_all, fields(chain = %self.chain, signer = %self.signer.address()))]
    pub async fn issue(&self, delegation: &CapacityDelegationAuthSig) -> Result<IssuedSession> {
        let anchor = self
            .network
            .latest_blockhash()
            .await
            .map_err(ClientError::network(Stage::Authorize))?;

        let callback = WalletAuthCallback::new(self.signer, &anchor, self.chain, self.domain)
            .with_statement(self.statement);

        let session_sigs = self
            .network
            .get_session_sigs(SessionSigsRequest {
                chain: self.chain,
                resource_ability_requests: vec![ResourceAbilityRequest::decrypt_any_condition()],
                auth_callback: &callback,
                capacity_delegation: Some(delegation.clone()),
                session_ttl: self.session_ttl,
            })
            .await
            .map_err(ClientError::network(Stage::Authorize))?;

        debug!(%anchor, nodes = session_sigs.len(), "issued session sigs");
        Ok(IssuedSession {
            anchor,
            session_sigs,
        })
    }
}
