//! ReCap capability objects (EIP-5573) embedded in sign-in statements.
//!
//! A recap lists, per resource URI, the `Namespace/Name` abilities granted to
//! the statement's URI, each with a list of restriction objects. It travels
//! as a `urn:recap:` resource and is mirrored in human-readable form at the
//! end of the statement.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::resource::{Ability, Resource};

/// Scheme prefix of an encoded recap resource.
pub const RECAP_URN_PREFIX: &str = "urn:recap:";

const STATEMENT_PREFIX: &str =
    "I further authorize the stated URI to perform the following actions on my behalf:";

/// A capability object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recap {
    att: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
    prf: Vec<String>,
}

impl Recap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `ability` on `resource`, restricted by `restriction` (may be empty).
    pub fn add_attenuation(
        &mut self,
        resource: &Resource,
        ability: Ability,
        restriction: Map<String, Value>,
    ) {
        self.att
            .entry(resource.uri())
            .or_default()
            .entry(ability.recap_key())
            .or_default()
            .push(Value::Object(restriction));
    }

    pub fn with_attenuation(mut self, resource: &Resource, ability: Ability) -> Self {
        self.add_attenuation(resource, ability, Map::new());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.att.is_empty()
    }

    /// Whether some granted resource covers `resource` with `ability`.
    pub fn permits(&self, resource: &Resource, ability: Ability) -> bool {
        let key = ability.recap_key();
        self.att.iter().any(|(uri, abilities)| {
            abilities.contains_key(&key)
                && uri
                    .parse::<Resource>()
                    .map(|granted| granted.covers(resource))
                    .unwrap_or(false)
        })
    }

    /// Restriction objects attached to an exact `(resource, ability)` grant.
    pub fn restrictions(&self, resource: &Resource, ability: Ability) -> Option<&[Value]> {
        self.att
            .get(&resource.uri())
            .and_then(|abilities| abilities.get(&ability.recap_key()))
            .map(Vec::as_slice)
    }

    /// Granted resource URIs.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.att.keys().map(String::as_str)
    }

    /// `urn:recap:` + base64url(JSON).
    pub fn to_urn(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(format!("{RECAP_URN_PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decode a `urn:recap:` resource.
    pub fn from_urn(urn: &str) -> Result<Self> {
        let encoded = urn
            .strip_prefix(RECAP_URN_PREFIX)
            .ok_or_else(|| CoreError::MalformedRecap("missing urn:recap: prefix".into()))?;
        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CoreError::MalformedRecap(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| CoreError::MalformedRecap(e.to_string()))
    }

    /// Human-readable mirror of the grants, appended to the statement.
    pub fn statement(&self) -> String {
        let mut out = String::from(STATEMENT_PREFIX);
        let mut index = 1;

        for (uri, abilities) in &self.att {
            let mut by_namespace: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
            for key in abilities.keys() {
                if let Some((namespace, name)) = key.split_once('/') {
                    by_namespace.entry(namespace).or_default().push(name);
                }
            }
            for (namespace, names) in by_namespace {
                let names = names
                    .iter()
                    .map(|n| format!("'{n}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!(" ({index}) '{namespace}': {names} for '{uri}'."));
                index += 1;
            }
        }
        out
    }
}
