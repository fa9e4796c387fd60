//! Authorization rules of the in-memory network, driven with a bare
//! wallet-signing callback.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::Map;

use keygate_core::{
    sign_siwe, AccessControlCondition, Address, AuthSig, Blockhash, Chain, ConditionSet,
    Recap, ResourceAbilityRequest, SessionSigs, SiweMessage, Wallet,
};
use keygate_delegation::{
    issue_delegation, CapacityDelegationAuthSig, DelegationRequest, RateLimitParams,
};
use keygate_network::memory::{
    Asset, ChainLedger, MemoryContracts, MemoryNetwork, MemoryNetworkConfig,
};
use keygate_network::{
    AuthCallback, AuthCallbackError, AuthCallbackParams, ContractClient, DecryptRequest,
    EncryptRequest, NetworkError, SessionSigsRequest, ThresholdNetwork,
};

struct SigningCallback {
    wallet: Wallet,
    nonce: Blockhash,
}

#[async_trait]
impl AuthCallback for SigningCallback {
    async fn authorize(&self, params: AuthCallbackParams) -> Result<AuthSig, AuthCallbackError> {
        let uri = params.uri.ok_or(AuthCallbackError::MissingField("uri"))?;
        let expiration = params
            .expiration
            .ok_or(AuthCallbackError::MissingField("expiration"))?;
        let requests = params
            .resource_ability_requests
            .ok_or(AuthCallbackError::MissingField("resourceAbilityRequests"))?;

        let mut recap = Recap::new();
        for request in &requests {
            recap.add_attenuation(&request.resource, request.ability, Map::new());
        }
        let message = SiweMessage::new(
            "localhost",
            self.wallet.address(),
            uri,
            Chain::Arbitrum.chain_id(),
            self.nonce.as_str(),
        )
        .with_expiration(expiration)
        .with_recap(&recap)
        .map_err(|e| AuthCallbackError::Signing(e.to_string()))?;

        sign_siwe(&self.wallet, &message)
            .await
            .map_err(|e| AuthCallbackError::Signing(e.to_string()))
    }
}

struct World {
    ledger: Arc<ChainLedger>,
    network: MemoryNetwork,
    wallet: Wallet,
    conditions: ConditionSet,
    delegation: CapacityDelegationAuthSig,
}

fn nft() -> Address {
    "0xfE34a72c55e512601E7d491A9c5b36373cE34d63".parse().unwrap()
}

async fn world(config: MemoryNetworkConfig) -> World {
    let ledger = Arc::new(ChainLedger::new());
    let network = MemoryNetwork::new(ledger.clone(), config).unwrap();
    network.connect().await.unwrap();

    let wallet = Wallet::generate();
    ledger.set_balance(Chain::Arbitrum, Asset::Native, &wallet.address(), u128::MAX / 2);
    ledger.set_balance(Chain::Arbitrum, Asset::Erc721(nft()), &wallet.address(), 1);

    let contracts = MemoryContracts::new(ledger.clone(), Arc::new(wallet.clone()), Chain::Arbitrum);
    contracts.connect().await.unwrap();
    let token_id = contracts
        .mint_capacity_credits(RateLimitParams::default())
        .await
        .unwrap();
    let delegation = issue_delegation(
        &wallet,
        &DelegationRequest::new(token_id, [wallet.address()], 10),
        &network.latest_blockhash().await.unwrap(),
    )
    .await
    .unwrap();

    World {
        ledger,
        network,
        wallet,
        conditions: ConditionSet::single(AccessControlCondition::erc721_holder(
            nft(),
            Chain::Arbitrum,
        )),
        delegation,
    }
}

async fn session_sigs(world: &World, nonce: Blockhash) -> Result<SessionSigs, NetworkError> {
    let callback = SigningCallback {
        wallet: world.wallet.clone(),
        nonce,
    };
    world
        .network
        .get_session_sigs(SessionSigsRequest {
            chain: Chain::Arbitrum,
            resource_ability_requests: vec![ResourceAbilityRequest::decrypt_any_condition()],
            auth_callback: &callback,
            capacity_delegation: Some(world.delegation.clone()),
            session_ttl: None,
        })
        .await
}

async fn encrypt(world: &World, plaintext: &[u8]) -> (String, keygate_core::DataHash) {
    let response = world
        .network
        .encrypt(EncryptRequest {
            access_control_conditions: world.conditions.clone(),
            chain: Chain::Arbitrum,
            plaintext: plaintext.to_vec(),
        })
        .await
        .unwrap();
    (response.ciphertext, response.data_to_encrypt_hash)
}

async fn decrypt(
    world: &World,
    ciphertext: String,
    data_to_encrypt_hash: keygate_core::DataHash,
    session_sigs: SessionSigs,
) -> Result<Vec<u8>, NetworkError> {
    world
        .network
        .decrypt(DecryptRequest {
            access_control_conditions: world.conditions.clone(),
            chain: Chain::Arbitrum,
            ciphertext,
            data_to_encrypt_hash,
            session_sigs,
        })
        .await
        .map(|r| r.decrypted_data)
}

#[tokio::test]
async fn round_trip() {
    let world = world(MemoryNetworkConfig::default()).await;
    let (ciphertext, hash) = encrypt(&world, b"Hello, world!").await;

    let nonce = world.network.latest_blockhash().await.unwrap();
    let sigs = session_sigs(&world, nonce).await.unwrap();
    assert_eq!(sigs.len(), 3);

    let plaintext = decrypt(&world, ciphertext, hash, sigs).await.unwrap();
    assert_eq!(plaintext, b"Hello, world!");
}

#[tokio::test]
async fn stale_nonce_rejected() {
    let world = world(MemoryNetworkConfig::default()).await;
    let nonce = world.network.latest_blockhash().await.unwrap();
    for _ in 0..=world.network.config().max_anchor_age {
        world.ledger.mine_block();
    }

    let err = session_sigs(&world, nonce).await.unwrap_err();
    assert!(matches!(err, NetworkError::StaleNonce(_)));
}

#[tokio::test]
async fn unknown_nonce_rejected() {
    let world = world(MemoryNetworkConfig::default()).await;
    let err = session_sigs(&world, Blockhash::from_bytes([9; 32]))
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::StaleNonce(_)));
}

#[tokio::test]
async fn below_threshold_rejected() {
    let world = world(MemoryNetworkConfig::default()).await;
    let (ciphertext, hash) = encrypt(&world, b"x").await;

    let nonce = world.network.latest_blockhash().await.unwrap();
    let sigs = session_sigs(&world, nonce).await.unwrap();
    let (url, sig) = sigs.iter().next().unwrap();
    let one: SessionSigs = [(url.to_string(), sig.clone())].into_iter().collect();

    let err = decrypt(&world, ciphertext, hash, one).await.unwrap_err();
    assert!(matches!(
        err,
        NetworkError::ThresholdNotMet {
            valid: 1,
            required: 2
        }
    ));
}

#[tokio::test]
async fn sigs_bound_to_their_node() {
    let world = world(MemoryNetworkConfig::default()).await;
    let (ciphertext, hash) = encrypt(&world, b"x").await;

    let nonce = world.network.latest_blockhash().await.unwrap();
    let sigs = session_sigs(&world, nonce).await.unwrap();
    let urls = world.network.node_urls();

    // Swap the first two nodes' sigs; only the third stays valid.
    let swapped: SessionSigs = [
        (urls[0].clone(), sigs.get(&urls[1]).unwrap().clone()),
        (urls[1].clone(), sigs.get(&urls[0]).unwrap().clone()),
        (urls[2].clone(), sigs.get(&urls[2]).unwrap().clone()),
    ]
    .into_iter()
    .collect();

    let err = decrypt(&world, ciphertext, hash, swapped).await.unwrap_err();
    assert!(matches!(err, NetworkError::ThresholdNotMet { valid: 1, .. }));
}

#[tokio::test]
async fn sigs_from_different_sessions_rejected() {
    let world = world(MemoryNetworkConfig::default()).await;
    let (ciphertext, hash) = encrypt(&world, b"x").await;

    let first = session_sigs(&world, world.network.latest_blockhash().await.unwrap())
        .await
        .unwrap();
    let second = session_sigs(&world, world.network.latest_blockhash().await.unwrap())
        .await
        .unwrap();
    let urls = world.network.node_urls();

    let mixed: SessionSigs = [
        (urls[0].clone(), first.get(&urls[0]).unwrap().clone()),
        (urls[1].clone(), second.get(&urls[1]).unwrap().clone()),
    ]
    .into_iter()
    .collect();

    let err = decrypt(&world, ciphertext, hash, mixed).await.unwrap_err();
    assert!(matches!(err, NetworkError::Unauthorized(_)));
    assert_eq!(world.network.delegation_uses(&world.delegation.fingerprint()), 0);
}

#[tokio::test]
async fn failed_decrypt_spends_no_capacity() {
    let world = world(MemoryNetworkConfig::default()).await;
    let (_, hash) = encrypt(&world, b"first").await;
    let (other_ciphertext, _) = encrypt(&world, b"second").await;

    let nonce = world.network.latest_blockhash().await.unwrap();
    let sigs = session_sigs(&world, nonce).await.unwrap();

    let err = decrypt(&world, other_ciphertext, hash, sigs).await.unwrap_err();
    assert!(matches!(err, NetworkError::DecryptionFailed(_)));
    assert_eq!(world.network.delegation_uses(&world.delegation.fingerprint()), 0);
}

#[tokio::test]
async fn capacity_required() {
    let world = world(MemoryNetworkConfig::default()).await;
    let (ciphertext, hash) = encrypt(&world, b"x").await;

    let callback = SigningCallback {
        wallet: world.wallet.clone(),
        nonce: world.network.latest_blockhash().await.unwrap(),
    };
    let sigs = world
        .network
        .get_session_sigs(SessionSigsRequest {
            chain: Chain::Arbitrum,
            resource_ability_requests: vec![ResourceAbilityRequest::decrypt_any_condition()],
            auth_callback: &callback,
            capacity_delegation: None,
            session_ttl: None,
        })
        .await
        .unwrap();

    let err = decrypt(&world, ciphertext, hash, sigs).await.unwrap_err();
    assert!(matches!(err, NetworkError::CapacityRequired));
}

#[tokio::test]
async fn expired_allocation_rejected() {
    let world = world(MemoryNetworkConfig::default()).await;
    let (ciphertext, hash) = encrypt(&world, b"x").await;

    world.ledger.advance_time(Duration::days(3));
    let nonce = world.network.latest_blockhash().await.unwrap();
    let sigs = session_sigs(&world, nonce).await.unwrap();

    let err = decrypt(&world, ciphertext, hash, sigs).await.unwrap_err();
    assert!(matches!(err, NetworkError::CapacityExpired(_)));
}

#[tokio::test]
async fn callback_invoked_per_node() {
    let world = world(MemoryNetworkConfig {
        callback_per_node: true,
        ..Default::default()
    })
    .await;

    let nonce = world.network.latest_blockhash().await.unwrap();
    session_sigs(&world, nonce).await.unwrap();
    assert_eq!(world.network.callback_invocations(), 3);
}

#[tokio::test]
async fn operations_require_connection() {
    let world = world(MemoryNetworkConfig::default()).await;
    world.network.disconnect().await.unwrap();
    assert!(!world.network.is_ready());

    assert!(matches!(
        world.network.latest_blockhash().await,
        Err(NetworkError::NotConnected)
    ));
}

#[test]
fn threshold_must_fit_node_count() {
    let config = MemoryNetworkConfig {
        node_count: 2,
        threshold: 3,
        ..Default::default()
    };
    assert!(MemoryNetwork::new(Arc::new(ChainLedger::new()), config).is_err());
}
