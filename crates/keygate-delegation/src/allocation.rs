//! Capacity allocations: minted rate-limit capacity on the network.

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use keygate_core::{Address, CapacityTokenId};

use crate::error::{DelegationError, Result};

/// Parameters for minting a capacity allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitParams {
    /// Sustained request rate the allocation buys.
    pub requests_per_kilosecond: u64,

    /// The allocation expires at UTC midnight this many days after minting.
    pub days_until_utc_midnight_expiration: u32,
}

impl Default for RateLimitParams {
    fn default() -> Self {
        Self {
            requests_per_kilosecond: 80,
            days_until_utc_midnight_expiration: 2,
        }
    }
}

impl RateLimitParams {
    pub fn validate(&self) -> Result<()> {
        if self.requests_per_kilosecond == 0 {
            return Err(DelegationError::InvalidRateLimit(
                "requests_per_kilosecond must be positive".into(),
            ));
        }
        if self.days_until_utc_midnight_expiration == 0 {
            return Err(DelegationError::InvalidRateLimit(
                "expiration must be at least one day out".into(),
            ));
        }
        Ok(())
    }

    /// Expiry of an allocation minted at `minted_at`.
    pub fn expiration_from(&self, minted_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        minted_at
            .date_naive()
            .checked_add_days(Days::new(u64::from(self.days_until_utc_midnight_expiration)))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc())
            .ok_or_else(|| DelegationError::InvalidRateLimit("expiration out of range".into()))
    }
}

/// A minted allocation as recorded by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityAllocation {
    pub token_id: CapacityTokenId,
    pub owner: Address,
    pub requests_per_kilosecond: u64,
    pub minted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CapacityAllocation {
    /// Record a mint of `params` by `owner` at `minted_at`.
    pub fn mint(
        token_id: CapacityTokenId,
        owner: Address,
        params: &RateLimitParams,
        minted_at: DateTime<Utc>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            token_id,
            owner,
            requests_per_kilosecond: params.requests_per_kilosecond,
            minted_at,
            expires_at: params.expiration_from(minted_at)?,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_params() {
        let params = RateLimitParams::default();
        assert_eq!(params.requests_per_kilosecond, 80);
        assert_eq!(params.days_until_utc_midnight_expiration, 2);
        params.validate().unwrap();
    }

    #[test]
    fn test_expiration_is_utc_midnight() {
        let minted_at = Utc.with_ymd_and_hms(2024, 2, 28, 17, 45, 12).unwrap();
        let expires = RateLimitParams::default().expiration_from(minted_at).unwrap();
        assert_eq!(expires, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_params() {
        let zero_rate = RateLimitParams {
            requests_per_kilosecond: 0,
            ..Default::default()
        };
        assert!(zero_rate.validate().is_err());

        let zero_days = RateLimitParams {
            days_until_utc_midnight_expiration: 0,
            ..Default::default()
        };
        assert!(zero_days.validate().is_err());
    }

    #[test]
    fn test_allocation_expiry() {
        let owner: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        let minted_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let allocation = CapacityAllocation::mint(
            CapacityTokenId::new(1),
            owner,
            &RateLimitParams::default(),
            minted_at,
        )
        .unwrap();

        assert!(!allocation.is_expired_at(minted_at));
        assert!(allocation.is_expired_at(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()));
    }
}
