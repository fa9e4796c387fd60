//! Client configuration.
//!
//! Everything except the private key has a default. The key is read from
//! `KEYGATE_PRIVATE_KEY`, falling back to `PRIVATE_KEY`, and held in zeroized
//! memory until it becomes a [`Wallet`].

use std::fmt;

use chrono::Duration;
use zeroize::Zeroizing;

use keygate_core::{Chain, Wallet};
use keygate_delegation::RateLimitParams;

use crate::error::{ClientError, Result};

/// Environment variable holding the wallet's private key.
pub const PRIVATE_KEY_VAR: &str = "KEYGATE_PRIVATE_KEY";

/// Accepted in place of [`PRIVATE_KEY_VAR`].
pub const FALLBACK_PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";

/// Environment variable selecting the chain.
pub const CHAIN_VAR: &str = "KEYGATE_CHAIN";

/// Environment variable overriding the statement domain.
pub const DOMAIN_VAR: &str = "KEYGATE_DOMAIN";

/// Configuration for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Chain conditions are evaluated on.
    pub chain: Chain,

    /// Domain named in every signed statement.
    pub domain: String,

    /// Human-readable text placed before the capability summary.
    pub statement: Option<String>,

    /// Session lifetime requested from the network; the network's default when unset.
    pub session_ttl: Option<Duration>,

    /// Uses granted by a self-delegation after minting.
    pub delegation_uses: u64,

    /// Lifetime of a self-delegation.
    pub delegation_ttl: Duration,

    /// What `mint_capacity_credits` buys.
    pub rate_limit: RateLimitParams,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain: Chain::Arbitrum,
            domain: "localhost".to_string(),
            statement: None,
            session_ttl: None,
            delegation_uses: 1_000_000_000_000_000,
            delegation_ttl: Duration::days(7),
            rate_limit: RateLimitParams::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `KEYGATE_CHAIN` and `KEYGATE_DOMAIN`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(chain) = lookup(CHAIN_VAR) {
            config.chain = chain
                .parse()
                .map_err(|_| ClientError::InvalidConfig(format!("{CHAIN_VAR}={chain}")))?;
        }
        if let Some(domain) = lookup(DOMAIN_VAR).filter(|d| !d.is_empty()) {
            config.domain = domain;
        }
        Ok(config)
    }
}

/// The wallet's secret, as configured.
pub struct WalletConfig {
    private_key: Zeroizing<String>,
}

impl WalletConfig {
    pub fn from_key(private_key: impl Into<String>) -> Self {
        Self {
            private_key: Zeroizing::new(private_key.into()),
        }
    }

    /// Read the key from `KEYGATE_PRIVATE_KEY` or `PRIVATE_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        lookup(PRIVATE_KEY_VAR)
            .or_else(|| lookup(FALLBACK_PRIVATE_KEY_VAR))
            .filter(|key| !key.trim().is_empty())
            .map(Self::from_key)
            .ok_or(ClientError::MissingConfig(PRIVATE_KEY_VAR))
    }

    /// Build the wallet.
    pub fn wallet(&self) -> Result<Wallet> {
        Wallet::from_hex(&self.private_key)
            .map_err(|e| ClientError::InvalidConfig(format!("{PRIVATE_KEY_VAR}: {e}")))
    }
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &"***SECRET***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.chain, Chain::Arbitrum);
        assert_eq!(config.domain, "localhost");
        assert_eq!(config.rate_limit, RateLimitParams::default());
    }

    #[test]
    fn test_chain_override() {
        let config = ClientConfig::from_lookup(env(&[(CHAIN_VAR, "ethereum")])).unwrap();
        assert_eq!(config.chain, Chain::Ethereum);

        let err = ClientConfig::from_lookup(env(&[(CHAIN_VAR, "dogechain")])).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }

    #[test]
    fn test_private_key_fallback() {
        let primary = WalletConfig::from_lookup(env(&[(PRIVATE_KEY_VAR, DEV_KEY)])).unwrap();
        let fallback =
            WalletConfig::from_lookup(env(&[(FALLBACK_PRIVATE_KEY_VAR, DEV_KEY)])).unwrap();

        assert_eq!(
            primary.wallet().unwrap().address(),
            fallback.wallet().unwrap().address()
        );
    }

    #[test]
    fn test_missing_key() {
        let err = WalletConfig::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ClientError::MissingConfig(PRIVATE_KEY_VAR)));

        let err = WalletConfig::from_lookup(env(&[(PRIVATE_KEY_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, ClientError::MissingConfig(_)));
    }

    #[test]
    fn test_bad_key_and_redaction() {
        let config = WalletConfig::from_key("0x1234");
        assert!(matches!(config.wallet(), Err(ClientError::InvalidConfig(_))));

        let config = WalletConfig::from_key(DEV_KEY);
        assert!(!format!("{config:?}").contains("ac0974"));
    }
}
