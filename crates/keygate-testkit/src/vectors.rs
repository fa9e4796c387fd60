//! Golden test vectors.
//!
//! Fixed inputs with outputs that other wallet, SIWE and ReCap
//! implementations agree on.

use chrono::{TimeZone, Utc};

use keygate_core::{
    Ability, Blockhash, Chain, DataHash, Recap, Resource, SiweMessage, Wallet,
};

/// First account of the standard local development mnemonic.
pub const DEV_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// EIP-55 address of [`DEV_PRIVATE_KEY`].
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Hex SHA-256 of `"Hello, world!"`.
pub const HELLO_WORLD_HASH: &str =
    "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3";

/// Recap granting decryption under any condition.
pub const DECRYPT_ANY_RECAP_URN: &str = "urn:recap:eyJhdHQiOnsibGl0LWFjY2Vzc2NvbnRyb2xjb25kaXRpb246Ly8qIjp7IlRocmVzaG9sZC9EZWNyeXB0aW9uIjpbe31dfX0sInByZiI6W119";

/// Statement mirror of [`DECRYPT_ANY_RECAP_URN`].
pub const DECRYPT_ANY_STATEMENT: &str = "I further authorize the stated URI to perform the \
     following actions on my behalf: (1) 'Threshold': 'Decryption' for \
     'lit-accesscontrolcondition://*'.";

/// Rendering of [`dev_session_statement`].
pub const DEV_SESSION_STATEMENT_TEXT: &str = "localhost wants you to sign in with your Ethereum account:\n\
     0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n\
     \n\
     I further authorize the stated URI to perform the following actions on my behalf: \
     (1) 'Threshold': 'Decryption' for 'lit-accesscontrolcondition://*'.\n\
     \n\
     URI: lit:session:0000000000000000000000000000000000000000000000000000000000000000\n\
     Version: 1\n\
     Chain ID: 42161\n\
     Nonce: 0x2222222222222222222222222222222222222222222222222222222222222222\n\
     Issued At: 2024-01-01T00:00:00.000Z\n\
     Expiration Time: 2024-01-01T00:10:00.000Z\n\
     Resources:\n\
     - urn:recap:eyJhdHQiOnsibGl0LWFjY2Vzc2NvbnRyb2xjb25kaXRpb246Ly8qIjp7IlRocmVzaG9sZC9EZWNyeXB0aW9uIjpbe31dfX0sInByZiI6W119";

/// The dev wallet.
pub fn dev_wallet() -> Wallet {
    match Wallet::from_hex(DEV_PRIVATE_KEY) {
        Ok(wallet) => wallet,
        Err(e) => panic!("DEV_PRIVATE_KEY is invalid: {e}"),
    }
}

pub fn decrypt_any_recap() -> Recap {
    Recap::new().with_attenuation(
        &Resource::all_access_control_conditions(),
        Ability::AccessControlConditionDecryption,
    )
}

/// A session statement for the dev wallet at a fixed time.
pub fn dev_session_statement() -> SiweMessage {
    let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let expiration = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
    let message = SiweMessage::new(
        "localhost",
        dev_wallet().address(),
        format!("lit:session:{}", "0".repeat(64)),
        Chain::Arbitrum.chain_id(),
        Blockhash::from_bytes([0x22; 32]).as_str(),
    )
    .with_issued_at(issued_at)
    .with_expiration(expiration);

    match message.with_recap(&decrypt_any_recap()) {
        Ok(message) => message,
        Err(e) => panic!("recap encoding failed: {e}"),
    }
}

/// Check every vector; returns the name of the first mismatch.
pub fn verify_all_vectors() -> Result<(), String> {
    if dev_wallet().address().to_checksum() != DEV_ADDRESS {
        return Err("dev address".into());
    }
    if DataHash::of(b"Hello, world!").as_str() != HELLO_WORLD_HASH {
        return Err("hello world hash".into());
    }
    let recap = decrypt_any_recap();
    if recap.to_urn().map_err(|e| e.to_string())? != DECRYPT_ANY_RECAP_URN {
        return Err("decrypt-any recap urn".into());
    }
    if recap.statement() != DECRYPT_ANY_STATEMENT {
        return Err("decrypt-any statement".into());
    }
    if dev_session_statement().to_string() != DEV_SESSION_STATEMENT_TEXT {
        return Err("dev session statement".into());
    }
    Ok(())
}
