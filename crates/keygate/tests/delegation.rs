//! Capacity allocations and their delegation, as seen from the client.

use chrono::Duration;

use keygate::delegation::{CapacityDelegationAuthSig, DelegationError, RateLimitParams};
use keygate::network::{ErrorClass, NetworkError};
use keygate::{ClientConfig, ClientError, Stage, Wallet};
use keygate_testkit::TestWorld;

#[tokio::test]
async fn exhausted_delegation_refused() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();

    let token_id = client
        .mint_capacity_token(RateLimitParams::default())
        .await
        .unwrap();
    let delegation = client
        .delegate_capacity(token_id, [client.address()], 2)
        .await
        .unwrap();
    let message = client.encrypt_string("limited").await.unwrap();

    client.decrypt(&message, &delegation).await.unwrap();
    client.decrypt(&message, &delegation).await.unwrap();
    let err = client.decrypt(&message, &delegation).await.unwrap_err();

    assert!(matches!(
        err.network_error(),
        Some(NetworkError::CapacityExhausted(_))
    ));
    assert_eq!(err.class(), ErrorClass::Capacity);
    assert_eq!(world.network.delegation_uses(&delegation.fingerprint()), 2);
}

#[tokio::test]
async fn re_encoded_delegation_shares_its_uses() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();

    let token_id = client
        .mint_capacity_token(RateLimitParams::default())
        .await
        .unwrap();
    let delegation = client
        .delegate_capacity(token_id, [client.address()], 1)
        .await
        .unwrap();
    let message = client.encrypt_string("limited").await.unwrap();
    client.decrypt(&message, &delegation).await.unwrap();

    let mut auth_sig = delegation.auth_sig().clone();
    auth_sig.sig = auth_sig.sig.trim_start_matches("0x").to_uppercase();
    let re_encoded = CapacityDelegationAuthSig::from_auth_sig(auth_sig);
    assert_ne!(re_encoded, delegation);

    let err = client.decrypt(&message, &re_encoded).await.unwrap_err();
    assert!(matches!(
        err.network_error(),
        Some(NetworkError::CapacityExhausted(_))
    ));
    assert_eq!(world.network.delegation_uses(&delegation.fingerprint()), 1);
}

#[tokio::test]
async fn delegation_for_other_wallets_refused() {
    let world = TestWorld::new();
    let owner = world.client(world.outsider());
    let reader = world.client(world.holder());
    owner.connect().await.unwrap();
    reader.connect().await.unwrap();

    let token_id = owner
        .mint_capacity_token(RateLimitParams::default())
        .await
        .unwrap();
    let someone_else = Wallet::generate().address();
    let delegation = owner
        .delegate_capacity(token_id, [owner.address(), someone_else], 10)
        .await
        .unwrap();

    let message = reader.encrypt_string("not yours").await.unwrap();
    let err = reader.decrypt(&message, &delegation).await.unwrap_err();

    assert!(matches!(
        err.network_error(),
        Some(NetworkError::Unauthorized(_))
    ));
    assert_eq!(err.class(), ErrorClass::Authorization);
}

#[tokio::test]
async fn delegated_capacity_pays_for_another_wallet() {
    let world = TestWorld::new();
    let owner = world.client(world.outsider());
    let reader_wallet = Wallet::generate();
    world.give_nft(&reader_wallet.address());
    let reader = world.client(reader_wallet);
    owner.connect().await.unwrap();
    reader.connect().await.unwrap();

    let token_id = owner
        .mint_capacity_token(RateLimitParams::default())
        .await
        .unwrap();
    let delegation = owner
        .delegate_capacity(token_id, [reader.address()], 1)
        .await
        .unwrap();

    // Travels as opaque bytes.
    let bytes = delegation.to_bytes().unwrap();
    let received = CapacityDelegationAuthSig::from_bytes(&bytes).unwrap();

    let message = reader.encrypt_string("paid by the owner").await.unwrap();
    let plaintext = reader.decrypt_string(&message, &received).await.unwrap();
    assert_eq!(plaintext, "paid by the owner");
}

#[tokio::test]
async fn expired_allocation_refused() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();
    let delegation = client.mint_capacity_credits().await.unwrap();
    let message = client.encrypt_string("later").await.unwrap();

    world.ledger.advance_time(Duration::days(3));
    let err = client.decrypt(&message, &delegation).await.unwrap_err();

    assert!(matches!(
        err.network_error(),
        Some(NetworkError::CapacityExpired(_))
    ));
}

#[tokio::test]
async fn unfunded_mint_surfaces_verbatim() {
    let world = TestWorld::new();
    let client = world.client(Wallet::generate());
    client.connect().await.unwrap();

    let err = client.mint_capacity_credits().await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Mint));
    assert!(matches!(
        err.network_error(),
        Some(NetworkError::InsufficientFunds { available: 0, .. })
    ));
}

#[tokio::test]
async fn invalid_delegations_rejected_locally() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();
    let token_id = client
        .mint_capacity_token(RateLimitParams::default())
        .await
        .unwrap();

    let err = client
        .delegate_capacity(token_id.clone(), [client.address()], 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Delegation(DelegationError::ZeroUses)
    ));

    let err = client
        .delegate_capacity(token_id, Vec::new(), 5)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Delegation(DelegationError::NoDelegatees)
    ));
}

#[tokio::test]
async fn configured_uses_land_in_self_delegation() {
    let world = TestWorld::new();
    let client = world.client_with(
        world.holder(),
        world.nft_conditions(),
        ClientConfig {
            delegation_uses: 3,
            ..Default::default()
        },
    );
    client.connect().await.unwrap();

    let delegation = client.mint_capacity_credits().await.unwrap();
    let claims = delegation.claims().unwrap();
    assert_eq!(claims.delegator, client.address());
    assert_eq!(claims.uses, 3);
    assert!(claims.is_delegatee(&client.address()));
}
