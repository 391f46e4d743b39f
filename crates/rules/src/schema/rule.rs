//! Rule, action, and combine-logic types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Condition;

/// A detection rule.
///
/// Rules are value objects: a hot update replaces the whole definition for
/// an id, and the engine diffs old against new with `PartialEq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Higher is more important.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// When the highest-priority exclusive match of a cycle, suppresses
    /// every other alert of that cycle.
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub combine_logic: CombineLogic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
}

/// What a match produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    pub alert_type: String,
    pub severity: String,
    #[serde(default)]
    pub notify: Vec<String>,
}

pub(crate) fn default_true() -> bool {
    true
}

/// How a rule's conditions are combined.
///
/// Parsed case-insensitively. Unrecognised values are kept verbatim rather
/// than rejected at load time; the rule's worker stops when it meets one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CombineLogic {
    #[default]
    And,
    Or,
    Unsupported(String),
}

impl From<String> for CombineLogic {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AND" => CombineLogic::And,
            "OR" => CombineLogic::Or,
            _ => CombineLogic::Unsupported(raw),
        }
    }
}

impl From<CombineLogic> for String {
    fn from(logic: CombineLogic) -> Self {
        match logic {
            CombineLogic::And => "AND".to_string(),
            CombineLogic::Or => "OR".to_string(),
            CombineLogic::Unsupported(raw) => raw,
        }
    }
}

impl fmt::Display for CombineLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineLogic::And => f.write_str("AND"),
            CombineLogic::Or => f.write_str("OR"),
            CombineLogic::Unsupported(raw) => f.write_str(raw),
        }
    }
}
