//! Capacity delegations.
//!
//! The owner of a capacity allocation lets other wallets spend it by signing
//! a SIWE statement whose recap grants `Auth/Auth` on the allocation's
//! `lit-ratelimitincrease` resource. The restriction object names the
//! delegatees and a use budget. The resulting auth sig is a bearer token: the
//! holder attaches it to session requests and the network verifies it.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use keygate_core::{
    recover_address, sign_siwe, Ability, Address, AuthSig, Blake3Hash, Blockhash,
    CapacityTokenId, Chain, Recap, Resource, ResourcePrefix, SiweMessage, WalletSigner,
};

use crate::error::{DelegationError, Result};

/// URI of every capacity delegation statement.
pub const DELEGATION_URI: &str = "lit:capability:delegation";

/// How long a delegation stays valid unless overridden.
pub const DEFAULT_DELEGATION_TTL_DAYS: i64 = 7;

/// What the owner wants to delegate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    pub capacity_token_id: CapacityTokenId,
    pub delegatees: BTreeSet<Address>,
    pub uses: u64,
    pub expiration: DateTime<Utc>,
    pub domain: String,
    pub chain: Chain,
}

impl DelegationRequest {
    pub fn new(
        capacity_token_id: CapacityTokenId,
        delegatees: impl IntoIterator<Item = Address>,
        uses: u64,
    ) -> Self {
        Self {
            capacity_token_id,
            delegatees: delegatees.into_iter().collect(),
            uses,
            expiration: Utc::now() + Duration::days(DEFAULT_DELEGATION_TTL_DAYS),
            domain: "localhost".to_string(),
            chain: Chain::Ethereum,
        }
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.delegatees.is_empty() {
            return Err(DelegationError::NoDelegatees);
        }
        if self.uses == 0 {
            return Err(DelegationError::ZeroUses);
        }
        Ok(())
    }
}

/// Restriction object attached to the `Auth/Auth` grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DelegationRestriction {
    nft_id: Vec<String>,
    delegate_to: Vec<String>,
    uses: String,
}

impl DelegationRestriction {
    fn into_map(self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(DelegationError::SerializationError(
                "restriction is not an object".into(),
            )),
            Err(e) => Err(DelegationError::SerializationError(e.to_string())),
        }
    }
}

/// What a delegation says, once its signature has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationClaims {
    pub delegator: Address,
    pub capacity_token_id: CapacityTokenId,
    pub delegatees: BTreeSet<Address>,
    pub uses: u64,
    pub issued_at: DateTime<Utc>,
    pub expiration: Option<DateTime<Utc>>,
}

impl DelegationClaims {
    pub fn is_delegatee(&self, address: &Address) -> bool {
        self.delegatees.contains(address)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.map_or(false, |exp| exp <= now)
    }
}

/// A signed capacity delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityDelegationAuthSig(AuthSig);

impl CapacityDelegationAuthSig {
    /// Wrap an auth sig received from elsewhere. Call [`Self::claims`] to
    /// check it.
    pub fn from_auth_sig(auth_sig: AuthSig) -> Self {
        Self(auth_sig)
    }

    pub fn auth_sig(&self) -> &AuthSig {
        &self.0
    }

    pub fn into_auth_sig(self) -> AuthSig {
        self.0
    }

    /// Stable identifier of this delegation, used to count uses.
    pub fn fingerprint(&self) -> Blake3Hash {
        fingerprint_of(&self.0)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| DelegationError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| DelegationError::SerializationError(e.to_string()))
    }

    /// Verify the signature and decode the delegation's claims.
    ///
    /// Expiry is not checked here; callers compare against their own clock.
    pub fn claims(&self) -> Result<DelegationClaims> {
        claims_of(&self.0)
    }
}

/// Identifier of a delegation auth sig, independent of how its signature is
/// encoded.
///
/// Keyed on the signed statement: any other statement recovers to a
/// different delegator, so the statement alone pins the delegation.
pub fn fingerprint_of(auth_sig: &AuthSig) -> Blake3Hash {
    let mut hasher = blake3::Hasher::new_derive_key("keygate-delegation-v0-fingerprint");
    hasher.update(auth_sig.signed_message.as_bytes());
    Blake3Hash::from_bytes(*hasher.finalize().as_bytes())
}

/// Decode the claims of a delegation auth sig.
pub fn claims_of(auth_sig: &AuthSig) -> Result<DelegationClaims> {
    if !auth_sig.is_wallet() {
        return Err(DelegationError::NotADelegation(format!(
            "derived via {}",
            auth_sig.derived_via
        )));
    }

    let message: SiweMessage = auth_sig.signed_message.parse()?;
    if message.uri != DELEGATION_URI {
        return Err(DelegationError::NotADelegation(format!("uri {}", message.uri)));
    }

    let recovered = recover_address(
        auth_sig.signed_message.as_bytes(),
        &auth_sig.wallet_signature()?,
    )?;
    if recovered != message.address {
        return Err(keygate_core::ValidationError::AddressMismatch {
            claimed: message.address.to_checksum(),
            recovered: recovered.to_checksum(),
        }
        .into());
    }

    let recap = message
        .recap()?
        .ok_or_else(|| DelegationError::NotADelegation("no recap".into()))?;
    let resource = recap
        .resources()
        .filter_map(|uri| uri.parse::<Resource>().ok())
        .find(|r| r.prefix() == ResourcePrefix::RateLimitIncrease)
        .ok_or_else(|| DelegationError::NotADelegation("no rate-limit resource".into()))?;
    let restriction = recap
        .restrictions(&resource, Ability::RateLimitIncreaseAuth)
        .and_then(|r| r.first())
        .ok_or_else(|| DelegationError::NotADelegation("no Auth/Auth grant".into()))?;
    let restriction: DelegationRestriction = serde_json::from_value(restriction.clone())
        .map_err(|e| DelegationError::NotADelegation(e.to_string()))?;

    let capacity_token_id: CapacityTokenId = resource.key().parse()?;
    if !restriction.nft_id.iter().any(|id| id == capacity_token_id.as_str()) {
        return Err(DelegationError::NotADelegation(
            "nft_id does not name the delegated resource".into(),
        ));
    }
    let delegatees = restriction
        .delegate_to
        .iter()
        .map(|a| a.parse::<Address>())
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    let uses = restriction
        .uses
        .parse()
        .map_err(|_| DelegationError::NotADelegation(format!("uses {}", restriction.uses)))?;

    Ok(DelegationClaims {
        delegator: recovered,
        capacity_token_id,
        delegatees,
        uses,
        issued_at: message.issued_at,
        expiration: message.expiration_time,
    })
}

/// Sign a capacity delegation as `owner`.
///
/// Whether `owner` actually holds the allocation is checked by the network
/// when the delegation is spent.
pub async fn issue_delegation<S>(
    owner: &S,
    request: &DelegationRequest,
    nonce: &Blockhash,
) -> Result<CapacityDelegationAuthSig>
where
    S: WalletSigner + ?Sized,
{
    request.validate()?;

    let restriction = DelegationRestriction {
        nft_id: vec![request.capacity_token_id.to_string()],
        delegate_to: request.delegatees.iter().map(Address::to_hex).collect(),
        uses: request.uses.to_string(),
    };
    let mut recap = Recap::new();
    recap.add_attenuation(
        &Resource::rate_limit_increase(request.capacity_token_id.as_str()),
        Ability::RateLimitIncreaseAuth,
        restriction.into_map()?,
    );

    let message = SiweMessage::new(
        request.domain.clone(),
        owner.address(),
        DELEGATION_URI,
        request.chain.chain_id(),
        nonce.as_str(),
    )
    .with_expiration(request.expiration)
    .with_recap(&recap)?;

    let auth_sig = sign_siwe(owner, &message).await?;
    debug!(
        token_id = %request.capacity_token_id,
        delegatees = request.delegatees.len(),
        uses = request.uses,
        "issued capacity delegation"
    );
    Ok(CapacityDelegationAuthSig(auth_sig))
}
