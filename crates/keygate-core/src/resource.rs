//! Resources and the abilities a session may exercise on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Kind of network resource, identified by its URI prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourcePrefix {
    AccessControlCondition,
    RateLimitIncrease,
    Pkp,
    LitAction,
}

impl ResourcePrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessControlCondition => "lit-accesscontrolcondition",
            Self::RateLimitIncrease => "lit-ratelimitincrease",
            Self::Pkp => "lit-pkp",
            Self::LitAction => "lit-litaction",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        [
            Self::AccessControlCondition,
            Self::RateLimitIncrease,
            Self::Pkp,
            Self::LitAction,
        ]
        .into_iter()
        .find(|p| p.as_str() == s)
    }
}

/// Wildcard resource key.
pub const WILDCARD: &str = "*";

/// A network resource: `prefix://key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resource {
    prefix: ResourcePrefix,
    key: String,
}

impl Resource {
    pub fn new(prefix: ResourcePrefix, key: impl Into<String>) -> Self {
        Self {
            prefix,
            key: key.into(),
        }
    }

    /// Every access-control-condition resource.
    pub fn all_access_control_conditions() -> Self {
        Self::new(ResourcePrefix::AccessControlCondition, WILDCARD)
    }

    /// The rate-limit allocation with the given token id.
    pub fn rate_limit_increase(token_id: impl Into<String>) -> Self {
        Self::new(ResourcePrefix::RateLimitIncrease, token_id)
    }

    pub fn prefix(&self) -> ResourcePrefix {
        self.prefix
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `prefix://key`.
    pub fn uri(&self) -> String {
        format!("{}://{}", self.prefix.as_str(), self.key)
    }

    /// Whether a grant on `self` covers `requested`.
    pub fn covers(&self, requested: &Resource) -> bool {
        self.prefix == requested.prefix && (self.key == WILDCARD || self.key == requested.key)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

impl FromStr for Resource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, key) = s
            .split_once("://")
            .ok_or_else(|| CoreError::InvalidResource(s.to_string()))?;
        let prefix =
            ResourcePrefix::parse(prefix).ok_or_else(|| CoreError::InvalidResource(s.to_string()))?;
        if key.is_empty() {
            return Err(CoreError::InvalidResource(s.to_string()));
        }
        Ok(Self::new(prefix, key))
    }
}

impl TryFrom<String> for Resource {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Resource> for String {
    fn from(resource: Resource) -> Self {
        resource.uri()
    }
}

/// An action a session may perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ability {
    AccessControlConditionDecryption,
    AccessControlConditionSigning,
    RateLimitIncreaseAuth,
    PkpSigning,
    LitActionExecution,
}

impl Ability {
    /// ReCap `(namespace, name)` pair.
    pub fn recap_pair(self) -> (&'static str, &'static str) {
        match self {
            Self::AccessControlConditionDecryption => ("Threshold", "Decryption"),
            Self::AccessControlConditionSigning => ("Threshold", "Signing"),
            Self::RateLimitIncreaseAuth => ("Auth", "Auth"),
            Self::PkpSigning => ("Threshold", "Signing"),
            Self::LitActionExecution => ("Threshold", "Execution"),
        }
    }

    /// ReCap ability key, `Namespace/Name`.
    pub fn recap_key(self) -> String {
        let (namespace, name) = self.recap_pair();
        format!("{namespace}/{name}")
    }

    /// The resource prefix this ability applies to.
    pub fn resource_prefix(self) -> ResourcePrefix {
        match self {
            Self::AccessControlConditionDecryption | Self::AccessControlConditionSigning => {
                ResourcePrefix::AccessControlCondition
            }
            Self::RateLimitIncreaseAuth => ResourcePrefix::RateLimitIncrease,
            Self::PkpSigning => ResourcePrefix::Pkp,
            Self::LitActionExecution => ResourcePrefix::LitAction,
        }
    }
}

/// One requested `(resource, ability)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAbilityRequest {
    pub resource: Resource,
    pub ability: Ability,
}

impl ResourceAbilityRequest {
    /// Pair a resource with an ability; fails if the ability does not apply.
    pub fn new(resource: Resource, ability: Ability) -> Result<Self, CoreError> {
        if ability.resource_prefix() != resource.prefix() {
            return Err(CoreError::AbilityMismatch {
                ability: ability.recap_key(),
                resource: resource.uri(),
            });
        }
        Ok(Self { resource, ability })
    }

    /// Decrypt anything gated by an access-control condition.
    pub fn decrypt_any_condition() -> Self {
        Self {
            resource: Resource::all_access_control_conditions(),
            ability: Ability::AccessControlConditionDecryption,
        }
    }
}
