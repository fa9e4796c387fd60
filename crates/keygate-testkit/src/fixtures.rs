//! Test fixtures and helpers.
//!
//! A [`TestWorld`] is one simulated chain with a threshold network on top.
//! Wallets are funded and handed tokens directly on the ledger.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use keygate::{Client, ClientConfig};
use keygate_core::{
    AccessControlCondition, Address, Chain, ConditionSet, Wallet, WalletSignature, WalletSigner,
};
use keygate_network::memory::{
    Asset, ChainLedger, MemoryContracts, MemoryNetwork, MemoryNetworkConfig,
};

/// The ERC721 contract the standard scenario gates on.
pub const NFT_CONTRACT: &str = "0xfE34a72c55e512601E7d491A9c5b36373cE34d63";

/// Native balance given to funded wallets; enough for many mints.
pub const FUNDING_WEI: u128 = 1_000_000_000_000_000_000_000;

/// A client wired to a [`TestWorld`].
pub type TestClient<S = Wallet> = Client<Arc<MemoryNetwork>, Arc<MemoryContracts>, S>;

/// A simulated chain and network.
pub struct TestWorld {
    pub ledger: Arc<ChainLedger>,
    pub network: Arc<MemoryNetwork>,
    pub chain: Chain,
}

impl TestWorld {
    /// A world with the default network on arbitrum.
    pub fn new() -> Self {
        Self::with_config(MemoryNetworkConfig::default())
    }

    pub fn with_config(config: MemoryNetworkConfig) -> Self {
        let ledger = Arc::new(ChainLedger::new());
        let network = match MemoryNetwork::new(ledger.clone(), config) {
            Ok(network) => Arc::new(network),
            Err(e) => panic!("invalid test network config: {e}"),
        };
        Self {
            ledger,
            network,
            chain: Chain::Arbitrum,
        }
    }

    /// The gating NFT contract.
    pub fn nft(&self) -> Address {
        match NFT_CONTRACT.parse() {
            Ok(address) => address,
            Err(e) => panic!("bad NFT_CONTRACT: {e}"),
        }
    }

    /// "Holds at least one token of the NFT."
    pub fn nft_conditions(&self) -> ConditionSet {
        ConditionSet::single(AccessControlCondition::erc721_holder(self.nft(), self.chain))
    }

    pub fn fund(&self, address: &Address) {
        self.ledger
            .set_balance(self.chain, Asset::Native, address, FUNDING_WEI);
    }

    pub fn give_nft(&self, address: &Address) {
        self.ledger
            .credit(self.chain, Asset::Erc721(self.nft()), address, 1);
    }

    /// A funded wallet holding the NFT.
    pub fn holder(&self) -> Wallet {
        let wallet = Wallet::generate();
        self.fund(&wallet.address());
        self.give_nft(&wallet.address());
        wallet
    }

    /// A funded wallet without the NFT.
    pub fn outsider(&self) -> Wallet {
        let wallet = Wallet::generate();
        self.fund(&wallet.address());
        wallet
    }

    /// A client for `signer` gated on the NFT, with default config.
    pub fn client<S>(&self, signer: S) -> TestClient<S>
    where
        S: WalletSigner + Clone + 'static,
    {
        self.client_with(signer, self.nft_conditions(), ClientConfig::default())
    }

    pub fn client_with<S>(
        &self,
        signer: S,
        conditions: ConditionSet,
        config: ClientConfig,
    ) -> TestClient<S>
    where
        S: WalletSigner + Clone + 'static,
    {
        let contracts =
            MemoryContracts::new(self.ledger.clone(), Arc::new(signer.clone()), self.chain);
        Client::new(
            self.network.clone(),
            Arc::new(contracts),
            signer,
            conditions,
            ClientConfig {
                chain: self.chain,
                ..config
            },
        )
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// A wallet that counts the signatures it produces.
#[derive(Clone)]
pub struct CountingSigner {
    wallet: Wallet,
    signatures: Arc<AtomicUsize>,
}

impl CountingSigner {
    pub fn new(wallet: Wallet) -> Self {
        Self {
            wallet,
            signatures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Signatures produced so far, by this signer and its clones.
    pub fn signatures(&self) -> usize {
        self.signatures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for CountingSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_message(&self, message: &[u8]) -> keygate_core::error::Result<WalletSignature> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        self.wallet.sign_message(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_has_nft_and_funds() {
        let world = TestWorld::new();
        let wallet = world.holder();

        assert_eq!(
            world
                .ledger
                .balance(world.chain, Asset::Erc721(world.nft()), &wallet.address()),
            1
        );
        assert_eq!(
            world.ledger.balance(world.chain, Asset::Native, &wallet.address()),
            FUNDING_WEI
        );
    }

    #[tokio::test]
    async fn test_counting_signer_counts_clones() {
        let signer = CountingSigner::new(Wallet::generate());
        let clone = signer.clone();

        clone.sign_message(b"one").await.unwrap();
        signer.sign_message(b"two").await.unwrap();
        assert_eq!(signer.signatures(), 2);
    }
}
