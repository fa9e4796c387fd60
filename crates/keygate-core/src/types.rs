//! Strong type definitions shared across keygate crates.
//!
//! Identifiers that travel as strings on the wire are newtypes so they cannot
//! be swapped for one another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::sha256;
use crate::error::CoreError;

/// A chain from the network's supported-chains registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "ethereum")]
    Ethereum,
    #[serde(rename = "arbitrum")]
    Arbitrum,
    #[serde(rename = "arbitrumSepolia")]
    ArbitrumSepolia,
}

impl Chain {
    /// All supported chains.
    pub const ALL: [Chain; 3] = [Chain::Ethereum, Chain::Arbitrum, Chain::ArbitrumSepolia];

    /// The registry identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Arbitrum => "arbitrum",
            Chain::ArbitrumSepolia => "arbitrumSepolia",
        }
    }

    /// EVM chain id.
    pub fn chain_id(self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Arbitrum => 42161,
            Chain::ArbitrumSepolia => 421614,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownChain(s.to_string()))
    }
}

/// A recent block hash used as the freshness anchor of a signed statement.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blockhash(String);

impl Blockhash {
    /// Create from 32 raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Parse a `0x`-prefixed 32-byte hex string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let stripped = s
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::DecodingError(format!("blockhash without 0x: {s}")))?;
        let bytes = hex::decode(stripped)
            .map_err(|_| CoreError::DecodingError(format!("blockhash not hex: {s}")))?;
        if bytes.len() != 32 {
            return Err(CoreError::DecodingError(format!("blockhash length: {s}")));
        }
        Ok(Self(s.to_lowercase()))
    }

    /// The hex string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({})", &self.0[..self.0.len().min(18)])
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a minted capacity (rate-limit) allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityTokenId(String);

impl CapacityTokenId {
    /// Create from a numeric token id.
    pub fn new(id: u64) -> Self {
        Self(id.to_string())
    }

    /// The decimal string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CapacityTokenId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::DecodingError(format!("capacity token id: {s}")));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for CapacityTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex SHA-256 of a plaintext (`dataToEncryptHash`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataHash(String);

impl DataHash {
    /// Hash a plaintext.
    pub fn of(plaintext: &[u8]) -> Self {
        Self(hex::encode(sha256(plaintext)))
    }

    /// Wrap a hash received from elsewhere.
    pub fn from_hex(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The hex string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
