//! In-memory contract client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use keygate_core::{CapacityTokenId, Chain, WalletSigner};
use keygate_delegation::RateLimitParams;

use crate::error::{NetworkError, Result};
use crate::memory::ledger::ChainLedger;
use crate::traits::ContractClient;

/// Wei charged per requests-per-kilosecond per day.
pub const DEFAULT_PRICE_PER_RPKS_DAY: u128 = 1_000_000_000_000;

/// Contract client over a [`ChainLedger`], paying from the signer's native
/// balance on one chain.
pub struct MemoryContracts {
    ledger: Arc<ChainLedger>,
    signer: Arc<dyn WalletSigner>,
    chain: Chain,
    price_per_rpks_day: u128,
    connected: AtomicBool,
}

impl MemoryContracts {
    pub fn new(ledger: Arc<ChainLedger>, signer: Arc<dyn WalletSigner>, chain: Chain) -> Self {
        Self {
            ledger,
            signer,
            chain,
            price_per_rpks_day: DEFAULT_PRICE_PER_RPKS_DAY,
            connected: AtomicBool::new(false),
        }
    }

    pub fn with_price(mut self, price_per_rpks_day: u128) -> Self {
        self.price_per_rpks_day = price_per_rpks_day;
        self
    }

    /// Price of minting `params`.
    pub fn price_of(&self, params: &RateLimitParams) -> u128 {
        self.price_per_rpks_day
            .saturating_mul(u128::from(params.requests_per_kilosecond))
            .saturating_mul(u128::from(params.days_until_utc_midnight_expiration))
    }
}

#[async_trait]
impl ContractClient for MemoryContracts {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn mint_capacity_credits(&self, params: RateLimitParams) -> Result<CapacityTokenId> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(NetworkError::NotConnected);
        }
        params
            .validate()
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let owner = self.signer.address();
        let price = self.price_of(&params);
        let allocation = self.ledger.mint_allocation(self.chain, owner, &params, price)?;
        self.ledger.mine_block();

        info!(
            token_id = %allocation.token_id,
            %owner,
            rpks = params.requests_per_kilosecond,
            expires_at = %allocation.expires_at,
            "minted capacity credits"
        );
        Ok(allocation.token_id)
    }
}
