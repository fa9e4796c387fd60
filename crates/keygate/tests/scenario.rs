//! End-to-end encrypt/decrypt scenarios against the in-memory network.

use proptest::prelude::*;

use keygate::core::{AccessControlCondition, ConditionSet};
use keygate::network::{ErrorClass, NetworkError, ThresholdNetwork};
use keygate::{ClientConfig, ClientError, Stage};
use keygate_testkit::generators::{address, plaintext};
use keygate_testkit::vectors::HELLO_WORLD_HASH;
use keygate_testkit::TestWorld;

#[tokio::test]
async fn hello_world_round_trip() {
    let world = TestWorld::new();
    let client = world.client(world.holder());

    let (message, decrypted) = client
        .connected(|client| async move {
            let delegation = client.mint_capacity_credits().await?;
            let message = client.encrypt_string("Hello, world!").await?;
            let decrypted = client.decrypt_string(&message, &delegation).await?;
            Ok((message, decrypted))
        })
        .await
        .unwrap();

    assert_eq!(decrypted, "Hello, world!");
    assert_eq!(message.data_to_encrypt_hash.as_str(), HELLO_WORLD_HASH);
    assert_eq!(message.conditions_digest, world.nft_conditions().digest());
}

#[tokio::test]
async fn wallet_without_token_is_refused() {
    let world = TestWorld::new();
    let outsider = world.client(world.outsider());
    outsider.connect().await.unwrap();

    let delegation = outsider.mint_capacity_credits().await.unwrap();
    let message = outsider.encrypt_string("Hello, world!").await.unwrap();
    let err = outsider.decrypt(&message, &delegation).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Decrypt));
    assert!(matches!(
        err.network_error(),
        Some(NetworkError::ConditionNotSatisfied)
    ));
    assert_eq!(err.class(), ErrorClass::Authorization);
}

#[tokio::test]
async fn ciphertext_is_not_bit_stable() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();
    let delegation = client.mint_capacity_credits().await.unwrap();

    let first = client.encrypt(b"same bytes").await.unwrap();
    let second = client.encrypt(b"same bytes").await.unwrap();
    assert_ne!(first.ciphertext, second.ciphertext);
    assert_eq!(first.data_to_encrypt_hash, second.data_to_encrypt_hash);

    assert_eq!(client.decrypt(&first, &delegation).await.unwrap(), b"same bytes");
    assert_eq!(client.decrypt(&second, &delegation).await.unwrap(), b"same bytes");
}

#[tokio::test]
async fn condition_mismatch_caught_before_network() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();
    let delegation = client.mint_capacity_credits().await.unwrap();
    let message = client.encrypt_string("Hello, world!").await.unwrap();

    let other = ConditionSet::single(AccessControlCondition::erc721_holder(
        "0x0000000000000000000000000000000000000001".parse().unwrap(),
        world.chain,
    ));
    let rounds = world.network.callback_invocations();
    let err = client
        .decrypt_with(&other, &message, &delegation)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::ConditionMismatch { .. }));
    assert_eq!(err.class(), ErrorClass::Precondition);
    assert_eq!(world.network.callback_invocations(), rounds);
}

#[tokio::test]
async fn encrypt_with_explicit_conditions() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();
    let delegation = client.mint_capacity_credits().await.unwrap();

    // Any funded wallet qualifies.
    let rich = ConditionSet::single(AccessControlCondition::native_min_balance(world.chain, 1));
    let message = client.encrypt_with(&rich, b"for the funded").await.unwrap();
    let plaintext = client
        .decrypt_with(&rich, &message, &delegation)
        .await
        .unwrap();
    assert_eq!(plaintext, b"for the funded");
}

#[tokio::test]
async fn connected_disconnects_after_success() {
    let world = TestWorld::new();
    let client = world.client(world.holder());

    client
        .connected(|client| async move { client.mint_capacity_credits().await })
        .await
        .unwrap();
    assert!(!world.network.is_ready());
}

#[tokio::test]
async fn connected_disconnects_after_failure() {
    let world = TestWorld::new();
    let client = world.client(world.outsider());

    let err = client
        .connected(|client| async move {
            let delegation = client.mint_capacity_credits().await?;
            let message = client.encrypt_string("x").await?;
            client.decrypt(&message, &delegation).await
        })
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Decrypt));
    assert!(!world.network.is_ready());
}

#[tokio::test]
async fn operations_fail_when_disconnected() {
    let world = TestWorld::new();
    let client = world.client(world.holder());

    let err = client.encrypt_string("x").await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Encrypt));
    assert!(matches!(err.network_error(), Some(NetworkError::NotConnected)));
    assert_eq!(err.class(), ErrorClass::Transport);
}

#[tokio::test]
async fn invalid_utf8_reported() {
    let world = TestWorld::new();
    let client = world.client(world.holder());
    client.connect().await.unwrap();
    let delegation = client.mint_capacity_credits().await.unwrap();

    let message = client.encrypt(&[0xff, 0xfe, 0xfd]).await.unwrap();
    let err = client.decrypt_string(&message, &delegation).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidUtf8(_)));
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn decrypt_inverts_encrypt(plaintext in plaintext(256)) {
        let world = TestWorld::new();
        let client = world.client(world.holder());

        let decrypted = runtime().block_on(client.connected(|client| {
            let plaintext = plaintext.clone();
            async move {
                let delegation = client.mint_capacity_credits().await?;
                let message = client.encrypt(&plaintext).await?;
                client.decrypt(&message, &delegation).await
            }
        }));
        prop_assert_eq!(decrypted.unwrap(), plaintext);
    }

    #[test]
    fn unsatisfied_conditions_never_decrypt(contracts in prop::collection::vec(address(), 1..4)) {
        let world = TestWorld::new();
        let conditions = ConditionSet::new(
            contracts
                .into_iter()
                .map(|contract| AccessControlCondition::erc721_holder(contract, world.chain))
                .collect(),
        )
        .unwrap();
        let client = world.client_with(world.outsider(), conditions, ClientConfig::default());

        let result = runtime().block_on(client.connected(|client| async move {
            let delegation = client.mint_capacity_credits().await?;
            let message = client.encrypt(b"secret").await?;
            client.decrypt(&message, &delegation).await
        }));
        let err = result.unwrap_err();
        prop_assert!(matches!(
            err.network_error(),
            Some(NetworkError::ConditionNotSatisfied)
        ));
    }
}
