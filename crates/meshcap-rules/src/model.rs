//! Rule document model.
//!
//! A rule document is one JSON object per ruleset:
//!
//! ```json
//! {
//!     "name": "zcl-base",
//!     "depends_on": ["other"],
//!     "rules": [
//!         {
//!             "description": "on/off server cluster",
//!             "filter": "0x0006 in endpoint.in_clusters",
//!             "actions": {
//!                 "add": { "onoff": { "Endpoint": "self" } },
//!                 "remove": { "legacy": {} }
//!             },
//!             "rules": [ ... child rules ... ]
//!         }
//!     ]
//! }
//! ```
//!
//! Setting values are templates: a JSON string is an expression source,
//! anything else is a literal. A capability mapped to `{}` is significant on
//! its own (present, no configuration).

use std::collections::BTreeMap;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::expr::Value;

/// A named, independently loadable group of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Unique ruleset name; the table key.
    pub name: String,
    /// Names of rulesets whose rules must be compiled before this one's.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Top-level rules in declared order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A declarative rule node: a filter plus capability add/remove actions,
/// optionally refined by child rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Human-readable description, used in diagnostics.
    #[serde(default)]
    pub description: String,
    /// Boolean filter expression source. Mandatory; use `"true"` for an
    /// unconditional rule.
    pub filter: String,
    /// Capability actions applied when the filter matches.
    #[serde(default)]
    pub actions: Actions,
    /// Child rules, evaluated only when this rule matched.
    #[serde(default, rename = "rules")]
    pub children: Vec<Rule>,
}

/// Capability settings keyed by capability name, then setting name.
pub type SettingsMap = BTreeMap<String, BTreeMap<String, SettingTemplate>>;

/// Add/remove action templates of one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actions {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub add: SettingsMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub remove: SettingsMap,
}

impl Actions {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// A setting value as authored: either a literal or an expression source.
///
/// Documents carry untyped template values; the distinction is made here,
/// at the data-model boundary, and both forms compile to expression handles
/// so the executor never sees raw document values.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingTemplate {
    /// Expression source, compiled and evaluated per device.
    Expression(String),
    /// Constant value taken verbatim from the document.
    Literal(Value),
}

impl Serialize for SettingTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SettingTemplate::Expression(source) => serializer.serialize_str(source),
            SettingTemplate::Literal(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SettingTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::String(source) => Ok(SettingTemplate::Expression(source)),
            other => literal_value(&other)
                .map(SettingTemplate::Literal)
                .map_err(D::Error::custom),
        }
    }
}

fn literal_value(raw: &serde_json::Value) -> Result<Value, String> {
    match raw {
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("unsupported numeric literal: {}", n)),
        serde_json::Value::Array(items) => items
            .iter()
            .map(literal_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(format!("unsupported setting literal: {}", other)),
    }
}
