//! In-memory network, chain and contracts.
//!
//! Used by tests, the testkit and the demo binary in place of the real
//! decryption network and chain RPC.

pub mod cipher;
pub mod contracts;
pub mod evaluator;
pub mod ledger;
pub mod network;

pub use contracts::MemoryContracts;
pub use ledger::{Asset, ChainLedger};
pub use network::{MemoryNetwork, MemoryNetworkConfig};
