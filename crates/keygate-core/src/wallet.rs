//! Wallet identity: secp256k1 keys, account addresses and EIP-191 signing.
//!
//! The wallet is the subject of every access-control condition and the
//! signer of every delegation and session statement. Signing goes through the
//! [`WalletSigner`] trait so that a remote or hardware signer can stand in for
//! the in-memory [`Wallet`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::keccak256;
use crate::error::{CoreError, Result};

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive the address of a secp256k1 public key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.as_affine().to_encoded_point(false);
        // Skip the 0x04 uncompressed-point tag.
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }

    /// Lowercase hex without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// EIP-55 mixed-case checksum form, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let lower = self.to_hex();
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| CoreError::InvalidAddress(s.into()))?;
        let arr: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidAddress(s.into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 65-byte recoverable signature: `r || s || v` with `v` in {27, 28}.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WalletSignature(pub [u8; 65]);

impl WalletSignature {
    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| CoreError::InvalidSignature)?;
        let arr: [u8; 65] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidSignature)?;
        Ok(Self(arr))
    }

    fn split(&self) -> Result<(Signature, RecoveryId)> {
        let signature =
            Signature::from_slice(&self.0[..64]).map_err(|_| CoreError::InvalidSignature)?;
        let v = match self.0[64] {
            27 | 28 => self.0[64] - 27,
            0 | 1 => self.0[64],
            _ => return Err(CoreError::InvalidSignature),
        };
        let recovery_id = RecoveryId::from_byte(v).ok_or(CoreError::InvalidSignature)?;
        Ok((signature, recovery_id))
    }
}

impl fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletSig({}...)", &self.to_hex()[..18])
    }
}

/// The EIP-191 `personal_sign` digest of a message.
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
    let mut prefixed = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

/// Recover the address that produced `signature` over `message`.
pub fn recover_address(message: &[u8], signature: &WalletSignature) -> Result<Address> {
    let (sig, recovery_id) = signature.split()?;
    let digest = personal_message_digest(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|_| CoreError::RecoveryFailed)?;
    Ok(Address::from_verifying_key(&key))
}

/// An in-memory secp256k1 wallet.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Generate a new random wallet.
    pub fn generate() -> Self {
        Self::from_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Create from 32 raw private-key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_key(signing_key))
    }

    /// Create from a hex private key, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = hex::decode(stripped)
            .map_err(|_| CoreError::InvalidPrivateKey("not valid hex".into()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidPrivateKey("expected 32 bytes".into()))?;
        Self::from_bytes(&arr)
    }

    fn from_key(signing_key: SigningKey) -> Self {
        let address = Address::from_verifying_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// The wallet's account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `message` with EIP-191 `personal_sign`.
    pub fn sign_personal(&self, message: &[u8]) -> Result<WalletSignature> {
        let digest = personal_message_digest(message);
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CoreError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = 27 + recovery_id.to_byte();
        Ok(WalletSignature(bytes))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("signing_key", &"***SECRET***")
            .finish()
    }
}

/// Anything that can sign statements on behalf of an address.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The address signatures recover to.
    fn address(&self) -> Address;

    /// Sign `message` with EIP-191 `personal_sign`.
    async fn sign_message(&self, message: &[u8]) -> Result<WalletSignature>;
}

#[async_trait]
impl WalletSigner for Wallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<WalletSignature> {
        self.sign_personal(message)
    }
}

#[async_trait]
impl<T: WalletSigner + ?Sized> WalletSigner for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<WalletSignature> {
        (**self).sign_message(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // First default account of the common local development mnemonic.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_known_key_derives_known_address() {
        let wallet = Wallet::from_hex(DEV_KEY).unwrap();
        assert_eq!(wallet.address().to_checksum(), DEV_ADDRESS);
    }

    #[test]
    fn test_sign_and_recover() {
        let wallet = Wallet::generate();
        let sig = wallet.sign_personal(b"sign me").unwrap();

        assert_eq!(recover_address(b"sign me", &sig).unwrap(), wallet.address());
        assert_ne!(recover_address(b"sign me!", &sig).unwrap(), wallet.address());
    }

    #[test]
    fn test_address_parse_is_case_insensitive() {
        let lower: Address = DEV_ADDRESS.to_lowercase().parse().unwrap();
        let checksummed: Address = DEV_ADDRESS.parse().unwrap();
        assert_eq!(lower, checksummed);
        assert_eq!(lower.to_string(), DEV_ADDRESS);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_signature_v_byte() {
        let wallet = Wallet::generate();
        let sig = wallet.sign_personal(b"v").unwrap();
        assert!(sig.0[64] == 27 || sig.0[64] == 28);

        let parsed = WalletSignature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = Wallet::from_hex(DEV_KEY).unwrap();
        let debug = format!("{wallet:?}");
        assert!(!debug.contains("ac0974bec39a17e3"));
        assert!(debug.contains("SECRET"));
    }

    proptest::proptest! {
        #[test]
        fn signatures_recover_to_signer(seed in proptest::array::uniform32(1u8..), message: Vec<u8>) {
            let wallet = Wallet::from_bytes(&seed).unwrap();
            let sig = wallet.sign_personal(&message).unwrap();
            proptest::prop_assert_eq!(recover_address(&message, &sig).unwrap(), wallet.address());
        }
    }

    #[tokio::test]
    async fn test_wallet_signer_trait() {
        let wallet = Wallet::generate();
        let signer: Arc<dyn WalletSigner> = Arc::new(wallet.clone());
        let sig = signer.sign_message(b"async").await.unwrap();
        assert_eq!(recover_address(b"async", &sig).unwrap(), wallet.address());
    }
}
