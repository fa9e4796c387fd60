//! keygate-demo: encrypt and decrypt "Hello, world!" against an in-memory
//! network, gated on holding an ERC721.
//!
//! Reads the wallet key from `KEYGATE_PRIVATE_KEY` (or `PRIVATE_KEY`) and the
//! chain from `KEYGATE_CHAIN`. Log level follows `RUST_LOG`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use keygate::core::{AccessControlCondition, Address, ConditionSet};
use keygate::network::memory::{
    Asset, ChainLedger, MemoryContracts, MemoryNetwork, MemoryNetworkConfig,
};
use keygate::{Client, ClientConfig, WalletConfig};

const NFT_CONTRACT: &str = "0xfE34a72c55e512601E7d491A9c5b36373cE34d63";

const FUNDING_WEI: u128 = 10_000_000_000_000_000_000;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = ClientConfig::from_env().context("reading client configuration")?;
    let wallet = WalletConfig::from_env()
        .context("set KEYGATE_PRIVATE_KEY to a hex secp256k1 key")?
        .wallet()?;
    let chain = config.chain;
    let nft: Address = NFT_CONTRACT.parse()?;

    // Seed the simulated chain: gas money and one token of the gating NFT.
    let ledger = Arc::new(ChainLedger::new());
    ledger.set_balance(chain, Asset::Native, &wallet.address(), FUNDING_WEI);
    ledger.set_balance(chain, Asset::Erc721(nft), &wallet.address(), 1);

    let network = MemoryNetwork::new(ledger.clone(), MemoryNetworkConfig::default())?;
    let contracts = MemoryContracts::new(ledger, Arc::new(wallet.clone()), chain);
    let conditions = ConditionSet::single(AccessControlCondition::erc721_holder(nft, chain));

    let client = Client::new(network, contracts, wallet, conditions, config);
    info!(address = %client.address(), %chain, "starting");

    let decrypted = client
        .connected(|client| async move {
            let delegation = client.mint_capacity_credits().await?;
            let message = client.encrypt_string("Hello, world!").await?;
            info!(ciphertext = %message.ciphertext, hash = %message.data_to_encrypt_hash, "encrypted");
            client.decrypt_string(&message, &delegation).await
        })
        .await?;

    println!("{decrypted}");
    Ok(())
}
