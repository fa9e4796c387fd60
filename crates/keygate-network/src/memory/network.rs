//! An in-memory threshold network.
//!
//! Every node shares one master secret, so "threshold" here only governs how
//! many valid per-node session sigs a decrypt must present. Authorization
//! follows the real network: session sigs must be fresh, signed by a session
//! key the wallet authorized over a recent block hash, paid for by a capacity
//! delegation, and the wallet must satisfy the conditions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use keygate_core::crypto::SESSION_URI_PREFIX;
use keygate_core::error::ValidationError;
use keygate_core::{
    sign_session_sigs, validate_wallet_auth_sig, verify_session_sig, AuthSig, Blake3Hash,
    Blockhash, DataHash, Resource, ResourcePrefix, SessionGrant, SessionKeyPair, SessionSigs,
    SessionSigningPayload, ValidatedStatement,
};
use keygate_core::{Ability, Address, ResourceAbilityRequest};
use keygate_delegation::{claims_of, fingerprint_of, DelegationClaims, DELEGATION_URI};

use crate::error::{NetworkError, Result};
use crate::memory::cipher::MasterSecret;
use crate::memory::evaluator::evaluate;
use crate::memory::ledger::ChainLedger;
use crate::messages::{
    AuthCallbackParams, DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse,
    SessionSigsRequest,
};
use crate::traits::ThresholdNetwork;

/// Configuration for a [`MemoryNetwork`].
#[derive(Debug, Clone)]
pub struct MemoryNetworkConfig {
    /// Number of nodes session sigs are issued for.
    pub node_count: usize,

    /// Valid session sigs a decrypt must present.
    pub threshold: usize,

    /// Invoke the auth callback once per node, concurrently, instead of once.
    pub callback_per_node: bool,

    /// Oldest acceptable statement nonce, in blocks.
    pub max_anchor_age: u64,

    /// Session lifetime when the request does not set one.
    pub session_ttl: Duration,

    /// Whether decrypt requires a capacity delegation.
    pub require_capacity: bool,
}

impl Default for MemoryNetworkConfig {
    fn default() -> Self {
        Self {
            node_count: 3,
            threshold: 2,
            callback_per_node: false,
            max_anchor_age: 32,
            session_ttl: Duration::minutes(10),
            require_capacity: true,
        }
    }
}

/// In-memory [`ThresholdNetwork`].
pub struct MemoryNetwork {
    config: MemoryNetworkConfig,
    ledger: Arc<ChainLedger>,
    master: MasterSecret,
    node_urls: Vec<String>,
    connected: AtomicBool,

    /// Uses spent per delegation, keyed by delegation fingerprint.
    delegation_uses: Mutex<HashMap<Blake3Hash, u64>>,

    callback_invocations: AtomicUsize,
}

impl MemoryNetwork {
    pub fn new(ledger: Arc<ChainLedger>, config: MemoryNetworkConfig) -> Result<Self> {
        if config.node_count == 0 || config.threshold == 0 || config.threshold > config.node_count
        {
            return Err(NetworkError::InvalidRequest(format!(
                "threshold {} of {} nodes",
                config.threshold, config.node_count
            )));
        }
        let node_urls = (0..config.node_count)
            .map(|i| format!("http://127.0.0.1:{}", 7470 + i))
            .collect();
        Ok(Self {
            config,
            ledger,
            master: MasterSecret::generate(),
            node_urls,
            connected: AtomicBool::new(false),
            delegation_uses: Mutex::new(HashMap::new()),
            callback_invocations: AtomicUsize::new(0),
        })
    }

    pub fn ledger(&self) -> &Arc<ChainLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &MemoryNetworkConfig {
        &self.config
    }

    /// Times the auth callback has been invoked.
    pub fn callback_invocations(&self) -> usize {
        self.callback_invocations.load(Ordering::SeqCst)
    }

    /// Uses spent so far on a delegation.
    pub fn delegation_uses(&self, fingerprint: &Blake3Hash) -> u64 {
        self.delegation_uses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fingerprint)
            .copied()
            .unwrap_or(0)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NetworkError::NotConnected)
        }
    }

    async fn invoke_callback(
        &self,
        request: &SessionSigsRequest<'_>,
        params: AuthCallbackParams,
    ) -> Result<Vec<AuthSig>> {
        let calls = if self.config.callback_per_node {
            self.node_urls.len()
        } else {
            1
        };
        self.callback_invocations.fetch_add(calls, Ordering::SeqCst);

        let futures = (0..calls).map(|_| request.auth_callback.authorize(params.clone()));
        Ok(try_join_all(futures).await?)
    }

    /// Check a wallet capability presented for a session-issuance round.
    fn check_capability(
        &self,
        auth_sig: &AuthSig,
        session_uri: &str,
        requests: &[ResourceAbilityRequest],
    ) -> Result<Address> {
        let validated = validate_wallet_auth_sig(auth_sig, self.ledger.now()).map_err(rejected)?;
        validated.require_uri(session_uri).map_err(rejected)?;
        validated.require_scope(requests).map_err(rejected)?;

        let nonce = Blockhash::parse(&validated.message.nonce)
            .map_err(|_| NetworkError::StaleNonce(validated.message.nonce.clone()))?;
        match self.ledger.block_age(&nonce) {
            Some(age) if age <= self.config.max_anchor_age => Ok(validated.signer),
            _ => Err(NetworkError::StaleNonce(nonce.to_string())),
        }
    }

    /// Check one node's session sig; returns its payload.
    fn check_session_sig(
        &self,
        node_url: &str,
        auth_sig: &AuthSig,
        resource: &Resource,
        now: DateTime<Utc>,
    ) -> Result<SessionSigningPayload> {
        let payload = verify_session_sig(auth_sig).map_err(rejected)?;
        if payload.node_address != node_url {
            return Err(NetworkError::InvalidSessionSig(format!(
                "sig for {} presented to {node_url}",
                payload.node_address
            )));
        }
        if payload.is_expired_at(now) {
            return Err(NetworkError::SessionExpired);
        }
        if !payload.covers(resource, Ability::AccessControlConditionDecryption) {
            return Err(NetworkError::Unauthorized(format!(
                "session does not cover decryption of {resource}"
            )));
        }
        Ok(payload)
    }

    /// Find and validate the wallet capability authorizing the session key.
    fn session_wallet(
        &self,
        payload: &SessionSigningPayload,
        now: DateTime<Utc>,
    ) -> Result<ValidatedStatement> {
        let session_uri = format!("{SESSION_URI_PREFIX}{}", payload.session_key);
        let capability = payload
            .capabilities
            .iter()
            .filter(|c| c.is_wallet())
            .find(|c| c.signed_message.contains(&format!("URI: {session_uri}")))
            .ok_or_else(|| {
                NetworkError::Unauthorized("no wallet capability for session key".into())
            })?;

        let validated = validate_wallet_auth_sig(capability, now).map_err(rejected)?;
        validated.require_uri(&session_uri).map_err(rejected)?;
        validated
            .require_scope(&payload.resource_ability_requests)
            .map_err(rejected)?;
        Ok(validated)
    }

    /// Find the capacity delegation paying for a decrypt and check it has
    /// uses left. Spending happens in [`Self::spend_capacity`] once the
    /// decrypt has succeeded.
    fn check_capacity(
        &self,
        payload: &SessionSigningPayload,
        wallet: &Address,
        now: DateTime<Utc>,
    ) -> Result<Option<(Blake3Hash, DelegationClaims)>> {
        let delegation = payload
            .capabilities
            .iter()
            .find(|c| c.signed_message.contains(&format!("URI: {DELEGATION_URI}")));
        let Some(delegation) = delegation else {
            return if self.config.require_capacity {
                Err(NetworkError::CapacityRequired)
            } else {
                Ok(None)
            };
        };

        let claims = claims_of(delegation)
            .map_err(|e| NetworkError::Unauthorized(format!("invalid capacity delegation: {e}")))?;
        self.check_delegation(&claims, wallet, now)?;

        let fingerprint = fingerprint_of(delegation);
        if self.delegation_uses(&fingerprint) >= claims.uses {
            return Err(exhausted(&claims));
        }
        Ok(Some((fingerprint, claims)))
    }

    /// Spend one use of a checked delegation.
    fn spend_capacity(&self, fingerprint: Blake3Hash, claims: &DelegationClaims) -> Result<()> {
        let mut uses = self
            .delegation_uses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let spent = uses.entry(fingerprint).or_insert(0);
        if *spent >= claims.uses {
            return Err(exhausted(claims));
        }
        *spent += 1;
        debug!(
            token_id = %claims.capacity_token_id,
            spent = *spent,
            allowed = claims.uses,
            "spent capacity"
        );
        Ok(())
    }

    fn check_delegation(
        &self,
        claims: &DelegationClaims,
        wallet: &Address,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let allocation = self
            .ledger
            .allocation(&claims.capacity_token_id)
            .ok_or_else(|| NetworkError::CapacityNotFound(claims.capacity_token_id.to_string()))?;
        if allocation.owner != claims.delegator {
            return Err(NetworkError::Unauthorized(format!(
                "capacity {} is not owned by delegator {}",
                claims.capacity_token_id, claims.delegator
            )));
        }
        if allocation.is_expired_at(now) {
            return Err(NetworkError::CapacityExpired(format!(
                "allocation {} expired at {}",
                allocation.token_id, allocation.expires_at
            )));
        }
        if claims.is_expired_at(now) {
            return Err(NetworkError::CapacityExpired(format!(
                "delegation of {} expired",
                claims.capacity_token_id
            )));
        }
        if !claims.is_delegatee(wallet) {
            return Err(NetworkError::Unauthorized(format!(
                "{wallet} is not a delegatee of capacity {}",
                claims.capacity_token_id
            )));
        }
        Ok(())
    }
}

fn rejected(e: ValidationError) -> NetworkError {
    match e {
        ValidationError::Expired(_) => NetworkError::SessionExpired,
        ValidationError::UriMismatch { .. } | ValidationError::ScopeNotGranted(_) => {
            NetworkError::Unauthorized(e.to_string())
        }
        other => NetworkError::InvalidSessionSig(other.to_string()),
    }
}

fn exhausted(claims: &DelegationClaims) -> NetworkError {
    NetworkError::CapacityExhausted(format!(
        "all {} uses of capacity {} spent",
        claims.uses, claims.capacity_token_id
    ))
}

/// Resource naming one ciphertext's condition set.
fn condition_resource(digest: &Blake3Hash, data_hash: &DataHash) -> Resource {
    Resource::new(
        ResourcePrefix::AccessControlCondition,
        format!("{}/{}", digest.to_hex(), data_hash),
    )
}

#[async_trait]
impl ThresholdNetwork for MemoryNetwork {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!(nodes = self.node_urls.len(), threshold = self.config.threshold, "connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("disconnected");
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn latest_blockhash(&self) -> Result<Blockhash> {
        self.ensure_connected()?;
        Ok(self.ledger.mine_block())
    }

    fn node_urls(&self) -> Vec<String> {
        self.node_urls.clone()
    }

    async fn encrypt(&self, request: EncryptRequest) -> Result<EncryptResponse> {
        self.ensure_connected()?;

        let data_to_encrypt_hash = DataHash::of(&request.plaintext);
        let key = self.master.derive_key(
            &request.access_control_conditions.digest(),
            &data_to_encrypt_hash,
        );
        let ciphertext = key.seal(&request.plaintext)?;

        debug!(chain = %request.chain, hash = %data_to_encrypt_hash, "encrypted");
        Ok(EncryptResponse {
            ciphertext,
            data_to_encrypt_hash,
        })
    }

    async fn decrypt(&self, request: DecryptRequest) -> Result<DecryptResponse> {
        self.ensure_connected()?;

        let now = self.ledger.now();
        let digest = request.access_control_conditions.digest();
        let resource = condition_resource(&digest, &request.data_to_encrypt_hash);

        let mut valid = Vec::new();
        let mut last_error = None;
        for url in &self.node_urls {
            let Some(auth_sig) = request.session_sigs.get(url) else {
                continue;
            };
            match self.check_session_sig(url, auth_sig, &resource, now) {
                Ok(payload) => valid.push(payload),
                Err(e) => {
                    warn!(node = %url, error = %e, "rejected session sig");
                    last_error = Some(e);
                }
            }
        }
        if valid.len() < self.config.threshold {
            return Err(match last_error {
                Some(e) if valid.is_empty() => e,
                _ => NetworkError::ThresholdNotMet {
                    valid: valid.len(),
                    required: self.config.threshold,
                },
            });
        }

        let payload = &valid[0];
        if valid[1..]
            .iter()
            .any(|p| p.session_key != payload.session_key)
        {
            return Err(NetworkError::Unauthorized(
                "session sigs from different session keys".into(),
            ));
        }
        let wallet = self.session_wallet(payload, now)?.signer;

        if !evaluate(&self.ledger, &request.access_control_conditions, &wallet)? {
            info!(%wallet, "conditions not satisfied");
            return Err(NetworkError::ConditionNotSatisfied);
        }
        let capacity = self.check_capacity(payload, &wallet, now)?;

        let key = self.master.derive_key(&digest, &request.data_to_encrypt_hash);
        let decrypted_data = key.open(&request.ciphertext)?;
        if DataHash::of(&decrypted_data) != request.data_to_encrypt_hash {
            return Err(NetworkError::DecryptionFailed("data hash mismatch".into()));
        }
        if let Some((fingerprint, claims)) = capacity {
            self.spend_capacity(fingerprint, &claims)?;
        }

        info!(%wallet, nodes = valid.len(), "decrypted");
        Ok(DecryptResponse { decrypted_data })
    }

    async fn get_session_sigs(&self, request: SessionSigsRequest<'_>) -> Result<SessionSigs> {
        self.ensure_connected()?;
        if request.resource_ability_requests.is_empty() {
            return Err(NetworkError::InvalidRequest(
                "no resource ability requests".into(),
            ));
        }
        if let Some(delegation) = &request.capacity_delegation {
            delegation
                .claims()
                .map_err(|e| NetworkError::InvalidRequest(format!("capacity delegation: {e}")))?;
        }

        let keypair = SessionKeyPair::generate();
        let session_uri = keypair.uri();
        let issued_at = self.ledger.now();
        let ttl = request.session_ttl.unwrap_or(self.config.session_ttl);
        if ttl <= Duration::zero() {
            return Err(NetworkError::InvalidRequest(format!(
                "session ttl must be positive, got {ttl}"
            )));
        }
        let expiration = issued_at + ttl;

        let params = AuthCallbackParams {
            uri: Some(session_uri.clone()),
            expiration: Some(expiration),
            resource_ability_requests: Some(request.resource_ability_requests.clone()),
        };
        let auth_sigs = self.invoke_callback(&request, params).await?;

        let mut wallet = None;
        for auth_sig in &auth_sigs {
            let signer =
                self.check_capability(auth_sig, &session_uri, &request.resource_ability_requests)?;
            if wallet.replace(signer).is_some_and(|prev| prev != signer) {
                return Err(NetworkError::Unauthorized(
                    "nodes received capabilities from different wallets".into(),
                ));
            }
        }

        let wallet_capability = auth_sigs
            .into_iter()
            .next()
            .ok_or_else(|| NetworkError::Unauthorized("auth callback returned nothing".into()))?;
        let mut capabilities = vec![wallet_capability];
        if let Some(delegation) = request.capacity_delegation {
            capabilities.push(delegation.into_auth_sig());
        }
        let grant = SessionGrant {
            resource_ability_requests: request.resource_ability_requests,
            capabilities,
            issued_at,
            expiration,
        };
        let sigs = sign_session_sigs(&keypair, &grant, self.node_urls.iter().map(String::as_str))?;

        debug!(
            session_key = ?keypair.public_key(),
            nodes = sigs.len(),
            %expiration,
            "issued session sigs"
        );
        Ok(sigs)
    }
}
