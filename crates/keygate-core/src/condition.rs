//! Access-control conditions: declarative predicates over on-chain state.
//!
//! A condition names a contract call (`method` with `parameters`) on a chain
//! and a test on its return value. The network evaluates it live at decrypt
//! time; nothing here touches a chain.
//!
//! The requesting wallet is referred to with [`ConditionParameter::CurrentSigner`]
//! (`:userAddress` on the wire). It is substituted by the evaluator and is
//! never resolved locally.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::crypto::Blake3Hash;
use crate::error::{CoreError, Result};
use crate::types::Chain;
use crate::wallet::Address;

/// Wire form of [`ConditionParameter::CurrentSigner`].
pub const USER_ADDRESS_PLACEHOLDER: &str = ":userAddress";

/// A single parameter of the contract call a condition evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionParameter {
    /// A fixed value passed through verbatim.
    Literal(String),
    /// The address of the wallet requesting decryption.
    CurrentSigner,
}

impl ConditionParameter {
    /// A literal parameter.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    fn as_wire(&self) -> &str {
        match self {
            Self::Literal(value) => value,
            Self::CurrentSigner => USER_ADDRESS_PLACEHOLDER,
        }
    }
}

impl Serialize for ConditionParameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ConditionParameter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(if s == USER_ADDRESS_PLACEHOLDER {
            Self::CurrentSigner
        } else {
            Self::Literal(s)
        })
    }
}

/// Token standard of the contract being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardContractType {
    ERC20,
    ERC721,
    ERC1155,
    /// Native chain balance; no contract.
    #[serde(rename = "")]
    Native,
}

/// Comparison applied to the call's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "contains")]
    Contains,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Contains => "contains",
        };
        f.write_str(s)
    }
}

/// Expected-value test on a call result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReturnValueTest {
    pub comparator: Comparator,
    pub value: String,
}

impl ReturnValueTest {
    pub fn new(comparator: Comparator, value: impl Into<String>) -> Self {
        Self {
            comparator,
            value: value.into(),
        }
    }
}

mod contract_address {
    use super::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Address>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(address) => serializer.serialize_str(&address.to_checksum()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Address>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(None);
        }
        s.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

/// A predicate over on-chain state.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlCondition {
    #[serde(with = "contract_address")]
    contract_address: Option<Address>,
    standard_contract_type: StandardContractType,
    chain: Chain,
    method: String,
    parameters: Vec<ConditionParameter>,
    return_value_test: ReturnValueTest,
}

impl AccessControlCondition {
    /// Create a condition from its parts.
    pub fn new(
        contract_address: Option<Address>,
        standard_contract_type: StandardContractType,
        chain: Chain,
        method: impl Into<String>,
        parameters: Vec<ConditionParameter>,
        return_value_test: ReturnValueTest,
    ) -> Self {
        Self {
            contract_address,
            standard_contract_type,
            chain,
            method: method.into(),
            parameters,
            return_value_test,
        }
    }

    /// The requesting wallet holds at least one token of an ERC721 collection.
    pub fn erc721_holder(contract: Address, chain: Chain) -> Self {
        Self::new(
            Some(contract),
            StandardContractType::ERC721,
            chain,
            "balanceOf",
            vec![ConditionParameter::CurrentSigner],
            ReturnValueTest::new(Comparator::Gt, "0"),
        )
    }

    /// The requesting wallet holds at least `min` units of an ERC20 token.
    pub fn erc20_min_balance(contract: Address, chain: Chain, min: u128) -> Self {
        Self::new(
            Some(contract),
            StandardContractType::ERC20,
            chain,
            "balanceOf",
            vec![ConditionParameter::CurrentSigner],
            ReturnValueTest::new(Comparator::Ge, min.to_string()),
        )
    }

    /// The requesting wallet holds at least one unit of ERC1155 token `token_id`.
    pub fn erc1155_holder(contract: Address, chain: Chain, token_id: u64) -> Self {
        Self::new(
            Some(contract),
            StandardContractType::ERC1155,
            chain,
            "balanceOf",
            vec![
                ConditionParameter::CurrentSigner,
                ConditionParameter::literal(token_id.to_string()),
            ],
            ReturnValueTest::new(Comparator::Gt, "0"),
        )
    }

    /// The requesting wallet's native balance is at least `min_wei`.
    pub fn native_min_balance(chain: Chain, min_wei: u128) -> Self {
        Self::new(
            None,
            StandardContractType::Native,
            chain,
            "eth_getBalance",
            vec![
                ConditionParameter::CurrentSigner,
                ConditionParameter::literal("latest"),
            ],
            ReturnValueTest::new(Comparator::Ge, min_wei.to_string()),
        )
    }

    pub fn contract_address(&self) -> Option<&Address> {
        self.contract_address.as_ref()
    }

    pub fn standard_contract_type(&self) -> StandardContractType {
        self.standard_contract_type
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn parameters(&self) -> &[ConditionParameter] {
        &self.parameters
    }

    pub fn return_value_test(&self) -> &ReturnValueTest {
        &self.return_value_test
    }

    /// Whether any parameter refers to the requesting wallet.
    pub fn references_signer(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| matches!(p, ConditionParameter::CurrentSigner))
            || self.return_value_test.value == USER_ADDRESS_PLACEHOLDER
    }
}

/// A non-empty list of conditions that must all hold.
///
/// The same set must be supplied at encrypt and decrypt time; compare sets
/// with [`ConditionSet::digest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConditionSet(Vec<AccessControlCondition>);

impl ConditionSet {
    /// Create a set; fails if `conditions` is empty.
    pub fn new(conditions: Vec<AccessControlCondition>) -> Result<Self> {
        if conditions.is_empty() {
            return Err(CoreError::EmptyConditionSet);
        }
        Ok(Self(conditions))
    }

    /// A set containing one condition.
    pub fn single(condition: AccessControlCondition) -> Self {
        Self(vec![condition])
    }

    pub fn conditions(&self) -> &[AccessControlCondition] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical JSON encoding, as sent to the network.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.0).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse a JSON array of conditions.
    pub fn from_json(json: &str) -> Result<Self> {
        let conditions: Vec<AccessControlCondition> =
            serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        Self::new(conditions)
    }

    /// Blake3 digest of the canonical encoding.
    pub fn digest(&self) -> Blake3Hash {
        // Serializing plain data to a Vec cannot fail.
        let bytes = serde_json::to_vec(&self.0).unwrap_or_default();
        Blake3Hash::hash(&bytes)
    }
}

impl<'de> Deserialize<'de> for ConditionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let conditions = Vec::<AccessControlCondition>::deserialize(deserializer)?;
        Self::new(conditions).map_err(serde::de::Error::custom)
    }
}
