//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keygate_core::{AccessControlCondition, Address, Chain, ConditionSet, Wallet};

/// Generate a random wallet.
pub fn wallet() -> impl Strategy<Value = Wallet> {
    any::<[u8; 32]>().prop_filter_map("not a valid secp256k1 scalar", |bytes| {
        Wallet::from_bytes(&bytes).ok()
    })
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address)
}

pub fn chain() -> impl Strategy<Value = Chain> {
    prop::sample::select(Chain::ALL.to_vec())
}

/// Generate a single condition of any supported shape.
pub fn condition() -> impl Strategy<Value = AccessControlCondition> {
    prop_oneof![
        (address(), chain()).prop_map(|(contract, chain)| {
            AccessControlCondition::erc721_holder(contract, chain)
        }),
        (address(), chain(), any::<u64>()).prop_map(|(contract, chain, min)| {
            AccessControlCondition::erc20_min_balance(contract, chain, u128::from(min))
        }),
        (address(), chain(), any::<u64>()).prop_map(|(contract, chain, id)| {
            AccessControlCondition::erc1155_holder(contract, chain, id)
        }),
        (chain(), any::<u64>()).prop_map(|(chain, min)| {
            AccessControlCondition::native_min_balance(chain, u128::from(min))
        }),
    ]
}

/// Generate a non-empty condition set of up to `max_len` conditions.
pub fn condition_set(max_len: usize) -> impl Strategy<Value = ConditionSet> {
    prop::collection::vec(condition(), 1..=max_len.max(1)).prop_filter_map(
        "empty condition set",
        |conditions| ConditionSet::new(conditions).ok(),
    )
}

/// Generate plaintext bytes of up to `max_len`.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn condition_set_json_roundtrip(set in condition_set(4)) {
            let json = set.to_json().unwrap();
            let parsed = ConditionSet::from_json(&json).unwrap();
            prop_assert_eq!(parsed.digest(), set.digest());
            prop_assert_eq!(parsed, set);
        }

        #[test]
        fn wallet_address_is_stable(wallet in wallet()) {
            let reparsed: Address = wallet.address().to_checksum().parse().unwrap();
            prop_assert_eq!(reparsed, wallet.address());
        }
    }
}
