//! Simulated chain state shared by the in-memory network and contracts.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::trace;

use keygate_core::{Address, Blockhash, CapacityTokenId, Chain};
use keygate_delegation::{CapacityAllocation, RateLimitParams};

use crate::error::{NetworkError, Result};

/// Block hashes older than this are forgotten.
pub const RECENT_BLOCK_WINDOW: usize = 256;

/// A balance-bearing asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Erc20(Address),
    Erc721(Address),
    Erc1155(Address, u64),
}

/// In-memory chain state.
///
/// Thread-safe via RwLock. The clock can be moved forward to test expiry.
pub struct ChainLedger {
    inner: RwLock<LedgerInner>,
}

struct LedgerInner {
    height: u64,

    /// `(height, hash)` of recent blocks, oldest first.
    recent_blocks: VecDeque<(u64, Blockhash)>,

    balances: HashMap<(Chain, Asset, Address), u128>,

    allocations: BTreeMap<CapacityTokenId, CapacityAllocation>,
    next_token_id: u64,

    clock_offset: Duration,
}

impl ChainLedger {
    /// A ledger at height zero with a genesis block.
    pub fn new() -> Self {
        let ledger = Self {
            inner: RwLock::new(LedgerInner {
                height: 0,
                recent_blocks: VecDeque::new(),
                balances: HashMap::new(),
                allocations: BTreeMap::new(),
                next_token_id: 1,
                clock_offset: Duration::zero(),
            }),
        };
        ledger.mine_block();
        ledger
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current simulated time.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.read().clock_offset
    }

    /// Move the simulated clock forward.
    pub fn advance_time(&self, by: Duration) {
        self.write().clock_offset += by;
    }

    pub fn height(&self) -> u64 {
        self.read().height
    }

    /// Append a block and return its hash.
    pub fn mine_block(&self) -> Blockhash {
        let mut inner = self.write();

        let mut hasher = blake3::Hasher::new_derive_key("keygate-ledger-v0-block");
        hasher.update(&inner.height.to_le_bytes());
        if let Some((_, prev)) = inner.recent_blocks.back() {
            hasher.update(prev.as_str().as_bytes());
        }
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        hasher.update(&salt);
        let hash = Blockhash::from_bytes(*hasher.finalize().as_bytes());

        inner.height += 1;
        let height = inner.height;
        inner.recent_blocks.push_back((height, hash.clone()));
        while inner.recent_blocks.len() > RECENT_BLOCK_WINDOW {
            inner.recent_blocks.pop_front();
        }
        trace!(height, %hash, "mined block");
        hash
    }

    /// Blocks mined since `hash`, if it is still recent.
    pub fn block_age(&self, hash: &Blockhash) -> Option<u64> {
        let inner = self.read();
        inner
            .recent_blocks
            .iter()
            .find(|(_, h)| h == hash)
            .map(|(height, _)| inner.height - height)
    }

    pub fn balance(&self, chain: Chain, asset: Asset, holder: &Address) -> u128 {
        self.read()
            .balances
            .get(&(chain, asset, *holder))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_balance(&self, chain: Chain, asset: Asset, holder: &Address, amount: u128) {
        self.write().balances.insert((chain, asset, *holder), amount);
    }

    pub fn credit(&self, chain: Chain, asset: Asset, holder: &Address, amount: u128) {
        let mut inner = self.write();
        let balance = inner.balances.entry((chain, asset, *holder)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Charge `owner` the `price` of a mint and record the allocation.
    ///
    /// Either both happen or neither does: a mint that cannot be recorded
    /// leaves the balance untouched.
    pub fn mint_allocation(
        &self,
        chain: Chain,
        owner: Address,
        params: &RateLimitParams,
        price: u128,
    ) -> Result<CapacityAllocation> {
        let mut inner = self.write();
        let minted_at = Utc::now() + inner.clock_offset;
        let token_id = CapacityTokenId::new(inner.next_token_id);
        let allocation = CapacityAllocation::mint(token_id.clone(), owner, params, minted_at)
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let balance = inner.balances.entry((chain, Asset::Native, owner)).or_insert(0);
        if *balance < price {
            return Err(NetworkError::InsufficientFunds {
                needed: price,
                available: *balance,
            });
        }
        *balance -= price;

        inner.next_token_id += 1;
        inner.allocations.insert(token_id, allocation.clone());
        Ok(allocation)
    }

    pub fn allocation(&self, token_id: &CapacityTokenId) -> Option<CapacityAllocation> {
        self.read().allocations.get(token_id).cloned()
    }
}

impl Default for ChainLedger {
    fn default() -> Self {
        Self::new()
    }
}
