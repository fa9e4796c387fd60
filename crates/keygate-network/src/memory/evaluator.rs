//! Evaluation of access-control conditions against the ledger.

use keygate_core::condition::USER_ADDRESS_PLACEHOLDER;
use keygate_core::{
    AccessControlCondition, Address, Comparator, ConditionParameter, ConditionSet,
    StandardContractType,
};

use crate::error::{NetworkError, Result};
use crate::memory::ledger::{Asset, ChainLedger};

/// Whether every condition in `conditions` holds for `wallet`.
pub fn evaluate(ledger: &ChainLedger, conditions: &ConditionSet, wallet: &Address) -> Result<bool> {
    for condition in conditions.conditions() {
        if !evaluate_one(ledger, condition, wallet)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate_one(
    ledger: &ChainLedger,
    condition: &AccessControlCondition,
    wallet: &Address,
) -> Result<bool> {
    let params = condition
        .parameters()
        .iter()
        .map(|p| resolve(p, wallet))
        .collect::<Vec<_>>();

    let returned = match (condition.standard_contract_type(), condition.method()) {
        (StandardContractType::Native, "eth_getBalance") => {
            let holder = address_param(&params, 0)?;
            ledger.balance(condition.chain(), Asset::Native, &holder)
        }
        (StandardContractType::ERC20, "balanceOf") => {
            let holder = address_param(&params, 0)?;
            ledger.balance(condition.chain(), Asset::Erc20(contract(condition)?), &holder)
        }
        (StandardContractType::ERC721, "balanceOf") => {
            let holder = address_param(&params, 0)?;
            ledger.balance(condition.chain(), Asset::Erc721(contract(condition)?), &holder)
        }
        (StandardContractType::ERC1155, "balanceOf") => {
            let holder = address_param(&params, 0)?;
            let id = params
                .get(1)
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| NetworkError::InvalidRequest("ERC1155 token id".into()))?;
            ledger.balance(
                condition.chain(),
                Asset::Erc1155(contract(condition)?, id),
                &holder,
            )
        }
        (standard, method) => {
            return Err(NetworkError::InvalidRequest(format!(
                "unsupported call {method} on {standard:?}"
            )))
        }
    };

    let test = condition.return_value_test();
    let expected = if test.value == USER_ADDRESS_PLACEHOLDER {
        wallet.to_checksum()
    } else {
        test.value.clone()
    };
    compare(returned, test.comparator, &expected)
}

fn resolve(param: &ConditionParameter, wallet: &Address) -> String {
    match param {
        ConditionParameter::CurrentSigner => wallet.to_checksum(),
        ConditionParameter::Literal(value) => value.clone(),
    }
}

fn address_param(params: &[String], index: usize) -> Result<Address> {
    params
        .get(index)
        .ok_or_else(|| NetworkError::InvalidRequest(format!("missing parameter {index}")))?
        .parse()
        .map_err(|_| NetworkError::InvalidRequest(format!("parameter {index} is not an address")))
}

fn contract(condition: &AccessControlCondition) -> Result<Address> {
    condition
        .contract_address()
        .copied()
        .ok_or_else(|| NetworkError::InvalidRequest("condition has no contract".into()))
}

fn compare(returned: u128, comparator: Comparator, expected: &str) -> Result<bool> {
    let numeric = || {
        expected
            .parse::<u128>()
            .map_err(|_| NetworkError::InvalidRequest(format!("non-numeric test value {expected}")))
    };
    Ok(match comparator {
        Comparator::Contains => returned.to_string().contains(expected),
        Comparator::Eq => returned == numeric()?,
        Comparator::Ne => returned != numeric()?,
        Comparator::Gt => returned > numeric()?,
        Comparator::Ge => returned >= numeric()?,
        Comparator::Lt => returned < numeric()?,
        Comparator::Le => returned <= numeric()?,
    })
}
