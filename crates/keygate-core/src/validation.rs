//! Verification of wallet auth sigs.
//!
//! A verifier trusts nothing in an [`AuthSig`] except the signature: the
//! statement is re-parsed from `signedMessage` and the signer recovered from
//! it. Checks on URI, nonce and scope are left to the caller, which knows what
//! it expects.

use chrono::{DateTime, Utc};

use crate::auth_sig::AuthSig;
use crate::error::ValidationError;
use crate::recap::Recap;
use crate::resource::ResourceAbilityRequest;
use crate::siwe::SiweMessage;
use crate::wallet::{recover_address, Address};

/// A wallet auth sig that passed [`validate_wallet_auth_sig`].
#[derive(Debug, Clone)]
pub struct ValidatedStatement {
    pub signer: Address,
    pub message: SiweMessage,
    pub recap: Recap,
}

impl ValidatedStatement {
    /// Require the statement to name `expected` as its URI.
    pub fn require_uri(&self, expected: &str) -> Result<(), ValidationError> {
        if self.message.uri != expected {
            return Err(ValidationError::UriMismatch {
                expected: expected.to_string(),
                got: self.message.uri.clone(),
            });
        }
        Ok(())
    }

    /// Require the recap to grant every requested pair.
    pub fn require_scope(&self, requests: &[ResourceAbilityRequest]) -> Result<(), ValidationError> {
        for request in requests {
            if !self.recap.permits(&request.resource, request.ability) {
                return Err(ValidationError::ScopeNotGranted(format!(
                    "{} on {}",
                    request.ability.recap_key(),
                    request.resource
                )));
            }
        }
        Ok(())
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.message.expiration_time
    }
}

/// Verify a wallet auth sig at time `now`.
///
/// The signature must recover to both the claimed `address` and the address
/// in the statement, and the statement must carry an unexpired expiration.
pub fn validate_wallet_auth_sig(
    auth_sig: &AuthSig,
    now: DateTime<Utc>,
) -> Result<ValidatedStatement, ValidationError> {
    if !auth_sig.is_wallet() {
        return Err(ValidationError::UnsupportedDerivation(
            auth_sig.derived_via.clone(),
        ));
    }

    let message: SiweMessage = auth_sig.signed_message.parse()?;
    let signature = auth_sig.wallet_signature()?;
    let recovered = recover_address(auth_sig.signed_message.as_bytes(), &signature)?;

    let claimed: Address = auth_sig.address.parse()?;
    if recovered != claimed || recovered != message.address {
        return Err(ValidationError::AddressMismatch {
            claimed: claimed.to_checksum(),
            recovered: recovered.to_checksum(),
        });
    }

    let expiration = message
        .expiration_time
        .ok_or(ValidationError::MissingField("expiration"))?;
    if expiration <= now {
        return Err(ValidationError::Expired(expiration.to_rfc3339()));
    }

    let recap = message.recap()?.unwrap_or_default();
    Ok(ValidatedStatement {
        signer: recovered,
        message,
        recap,
    })
}
