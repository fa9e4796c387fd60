//! Request and response types exchanged with the network.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use keygate_core::{Chain, ConditionSet, DataHash, ResourceAbilityRequest, SessionSigs};
use keygate_delegation::CapacityDelegationAuthSig;

use crate::traits::AuthCallback;

/// Encrypt `plaintext` so that only wallets satisfying `conditions` can read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptRequest {
    pub access_control_conditions: ConditionSet,
    pub chain: Chain,
    pub plaintext: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptResponse {
    /// Base64 ciphertext.
    pub ciphertext: String,
    pub data_to_encrypt_hash: DataHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    pub access_control_conditions: ConditionSet,
    pub chain: Chain,
    pub ciphertext: String,
    pub data_to_encrypt_hash: DataHash,
    pub session_sigs: SessionSigs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptResponse {
    pub decrypted_data: Vec<u8>,
}

/// What the network hands the auth callback.
///
/// Every field is optional on the wire; a callback must refuse to sign when
/// one it needs is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCallbackParams {
    pub uri: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub resource_ability_requests: Option<Vec<ResourceAbilityRequest>>,
}

/// Ask the network for session sigs.
pub struct SessionSigsRequest<'a> {
    pub chain: Chain,
    pub resource_ability_requests: Vec<ResourceAbilityRequest>,
    pub auth_callback: &'a dyn AuthCallback,
    pub capacity_delegation: Option<CapacityDelegationAuthSig>,
    /// Session lifetime, counted from the network's clock. Defaults to the
    /// network's session TTL.
    pub session_ttl: Option<Duration>,
}

impl std::fmt::Debug for SessionSigsRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigsRequest")
            .field("chain", &self.chain)
            .field("resource_ability_requests", &self.resource_ability_requests)
            .field("capacity_delegation", &self.capacity_delegation.is_some())
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}
