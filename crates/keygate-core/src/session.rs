//! Per-node session signatures.
//!
//! Once the wallet has authorized a session key, that key signs one
//! [`SessionSigningPayload`] per node. The payload names the node, so a sig
//! lifted from one node's bundle is rejected by every other node.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth_sig::{AuthSig, SessionSigs};
use crate::crypto::SessionKeyPair;
use crate::error::{CoreError, ValidationError};
use crate::resource::{Ability, Resource, ResourceAbilityRequest};

/// What a session key signs for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSigningPayload {
    pub session_key: String,
    pub resource_ability_requests: Vec<ResourceAbilityRequest>,
    pub capabilities: Vec<AuthSig>,
    pub issued_at: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    pub node_address: String,
}

impl SessionSigningPayload {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }

    /// Whether some requested pair covers `resource` with `ability`.
    pub fn covers(&self, resource: &Resource, ability: Ability) -> bool {
        self.resource_ability_requests
            .iter()
            .any(|r| r.ability == ability && r.resource.covers(resource))
    }
}

/// The parts of a payload shared by every node.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub resource_ability_requests: Vec<ResourceAbilityRequest>,
    pub capabilities: Vec<AuthSig>,
    pub issued_at: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
}

/// Sign one payload per node with `keypair`.
pub fn sign_session_sigs<'a>(
    keypair: &SessionKeyPair,
    grant: &SessionGrant,
    node_urls: impl IntoIterator<Item = &'a str>,
) -> Result<SessionSigs, CoreError> {
    let session_key = keypair.public_key().to_hex();
    node_urls
        .into_iter()
        .map(|url| {
            let payload = SessionSigningPayload {
                session_key: session_key.clone(),
                resource_ability_requests: grant.resource_ability_requests.clone(),
                capabilities: grant.capabilities.clone(),
                issued_at: grant.issued_at,
                expiration: grant.expiration,
                node_address: url.to_string(),
            };
            let message = serde_json::to_string(&payload)
                .map_err(|e| CoreError::EncodingError(e.to_string()))?;
            Ok((url.to_string(), AuthSig::from_session_key(keypair, message)))
        })
        .collect()
}

/// Check a session sig's signature and return its payload.
pub fn verify_session_sig(auth_sig: &AuthSig) -> Result<SessionSigningPayload, ValidationError> {
    if !auth_sig.is_session() {
        return Err(ValidationError::UnsupportedDerivation(
            auth_sig.derived_via.clone(),
        ));
    }
    let (public_key, signature) = auth_sig.session_signature()?;
    public_key
        .verify(auth_sig.signed_message.as_bytes(), &signature)
        .map_err(|_| ValidationError::SignatureFailed)?;

    let payload: SessionSigningPayload = serde_json::from_str(&auth_sig.signed_message)
        .map_err(|e| ValidationError::StructuralError(e.to_string()))?;
    if payload.session_key != public_key.to_hex() {
        return Err(ValidationError::AddressMismatch {
            claimed: payload.session_key,
            recovered: public_key.to_hex(),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn grant() -> SessionGrant {
        let now = Utc::now();
        SessionGrant {
            resource_ability_requests: vec![ResourceAbilityRequest::decrypt_any_condition()],
            capabilities: Vec::new(),
            issued_at: now,
            expiration: now + Duration::minutes(10),
        }
    }

    #[test]
    fn test_one_sig_per_node() {
        let keypair = SessionKeyPair::generate();
        let nodes = ["http://node-0", "http://node-1", "http://node-2"];
        let sigs = sign_session_sigs(&keypair, &grant(), nodes).unwrap();

        assert_eq!(sigs.len(), 3);
        for url in nodes {
            let payload = verify_session_sig(sigs.get(url).unwrap()).unwrap();
            assert_eq!(payload.node_address, url);
            assert_eq!(payload.session_key, keypair.public_key().to_hex());
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let keypair = SessionKeyPair::generate();
        let sigs = sign_session_sigs(&keypair, &grant(), ["http://node-0"]).unwrap();
        let mut sig = sigs.get("http://node-0").unwrap().clone();
        sig.signed_message = sig.signed_message.replace("node-0", "node-9");

        assert!(matches!(
            verify_session_sig(&sig),
            Err(ValidationError::SignatureFailed)
        ));
    }

    #[test]
    fn test_payload_covers_wildcard() {
        let keypair = SessionKeyPair::generate();
        let sigs = sign_session_sigs(&keypair, &grant(), ["n"]).unwrap();
        let payload = verify_session_sig(sigs.get("n").unwrap()).unwrap();

        let specific = "lit-accesscontrolcondition://abc".parse().unwrap();
        assert!(payload.covers(&specific, Ability::AccessControlConditionDecryption));
        assert!(!payload.covers(&specific, Ability::AccessControlConditionSigning));
        assert!(!payload.is_expired_at(Utc::now()));
    }
}
