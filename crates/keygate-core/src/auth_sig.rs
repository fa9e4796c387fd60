//! Auth sigs: a signed message plus enough context to verify it.
//!
//! Two kinds travel through the system. Wallet auth sigs carry an EIP-191
//! signature over a SIWE statement. Session sigs carry an Ed25519 signature
//! by an ephemeral session key over a JSON [`SessionSigningPayload`].
//!
//! [`SessionSigningPayload`]: crate::session::SessionSigningPayload

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, SessionKeyPair};
use crate::error::{CoreError, Result};
use crate::siwe::SiweMessage;
use crate::wallet::{Address, WalletSignature, WalletSigner};

/// `derivedVia` of a wallet `personal_sign` signature.
pub const WALLET_DERIVATION: &str = "web3.eth.personal.sign";

/// `derivedVia` of a session-key signature.
pub const SESSION_DERIVATION: &str = "litSessionSignViaNacl";

/// `algo` of a session-key signature.
pub const SESSION_ALGORITHM: &str = "ed25519";

/// A signature with its signed message and claimed signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSig {
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
}

impl AuthSig {
    /// Wrap a wallet signature over `message`.
    pub fn from_wallet(address: Address, message: String, signature: &WalletSignature) -> Self {
        Self {
            sig: signature.to_hex(),
            derived_via: WALLET_DERIVATION.to_string(),
            signed_message: message,
            address: address.to_checksum(),
            algo: None,
        }
    }

    /// Sign `message` with a session key.
    pub fn from_session_key(keypair: &SessionKeyPair, message: String) -> Self {
        let signature = keypair.sign(message.as_bytes());
        Self {
            sig: signature.to_hex(),
            derived_via: SESSION_DERIVATION.to_string(),
            signed_message: message,
            address: keypair.public_key().to_hex(),
            algo: Some(SESSION_ALGORITHM.to_string()),
        }
    }

    pub fn is_wallet(&self) -> bool {
        self.derived_via == WALLET_DERIVATION
    }

    pub fn is_session(&self) -> bool {
        self.derived_via == SESSION_DERIVATION
            && self.algo.as_deref() == Some(SESSION_ALGORITHM)
    }

    /// The wallet signature, for wallet auth sigs.
    pub fn wallet_signature(&self) -> Result<WalletSignature> {
        WalletSignature::from_hex(&self.sig)
    }

    /// The session key and signature, for session sigs.
    pub fn session_signature(&self) -> Result<(Ed25519PublicKey, Ed25519Signature)> {
        Ok((
            Ed25519PublicKey::from_hex(&self.address)?,
            Ed25519Signature::from_hex(&self.sig)?,
        ))
    }
}

/// Render `message` and have `signer` sign it.
pub async fn sign_siwe<S>(signer: &S, message: &SiweMessage) -> Result<AuthSig>
where
    S: WalletSigner + ?Sized,
{
    if message.address != signer.address() {
        return Err(CoreError::SigningFailed(format!(
            "statement names {} but signer is {}",
            message.address,
            signer.address()
        )));
    }
    let text = message.to_string();
    let signature = signer.sign_message(text.as_bytes()).await?;
    Ok(AuthSig::from_wallet(signer.address(), text, &signature))
}

/// Session sigs keyed by node URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSigs(BTreeMap<String, AuthSig>);

impl SessionSigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_url: impl Into<String>, sig: AuthSig) {
        self.0.insert(node_url.into(), sig);
    }

    pub fn get(&self, node_url: &str) -> Option<&AuthSig> {
        self.0.get(node_url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AuthSig)> {
        self.0.iter().map(|(url, sig)| (url.as_str(), sig))
    }
}

impl FromIterator<(String, AuthSig)> for SessionSigs {
    fn from_iter<I: IntoIterator<Item = (String, AuthSig)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{recover_address, Wallet};

    #[tokio::test]
    async fn test_sign_siwe_recovers_to_signer() {
        let wallet = Wallet::generate();
        let message = SiweMessage::new("localhost", wallet.address(), "lit:session:00", 1, "n0nce");

        let auth_sig = sign_siwe(&wallet, &message).await.unwrap();
        assert!(auth_sig.is_wallet());
        assert_eq!(auth_sig.signed_message, message.to_string());

        let signature = auth_sig.wallet_signature().unwrap();
        let recovered = recover_address(auth_sig.signed_message.as_bytes(), &signature).unwrap();
        assert_eq!(recovered, wallet.address());
    }

    #[tokio::test]
    async fn test_sign_siwe_refuses_foreign_address() {
        let wallet = Wallet::generate();
        let other = Wallet::generate();
        let message = SiweMessage::new("localhost", other.address(), "lit:session:00", 1, "n0nce");

        assert!(sign_siwe(&wallet, &message).await.is_err());
    }

    #[test]
    fn test_session_key_sig() {
        let keypair = SessionKeyPair::generate();
        let auth_sig = AuthSig::from_session_key(&keypair, "{}".to_string());

        assert!(auth_sig.is_session());
        let (key, sig) = auth_sig.session_signature().unwrap();
        assert_eq!(key, keypair.public_key());
        key.verify(b"{}", &sig).unwrap();
    }

    #[test]
    fn test_wire_format() {
        let keypair = SessionKeyPair::generate();
        let json = serde_json::to_value(AuthSig::from_session_key(&keypair, "m".into())).unwrap();
        assert_eq!(json["derivedVia"], SESSION_DERIVATION);
        assert_eq!(json["signedMessage"], "m");
        assert_eq!(json["algo"], "ed25519");

        let wallet = Wallet::generate();
        let sig = wallet.sign_personal(b"m").unwrap();
        let json = serde_json::to_value(AuthSig::from_wallet(wallet.address(), "m".into(), &sig))
            .unwrap();
        assert!(json.get("algo").is_none());
    }
}
