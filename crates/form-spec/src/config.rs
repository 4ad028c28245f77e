use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What the field factory does with a `type_id` it cannot map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldTypePolicy {
    #[default]
    Error,
    Skip,
}

/// Engine-wide settings shared by every form build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct EngineConfig {
    /// Extra type ids mapped onto built-in ones, e.g. `{"phone": "text"}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub unknown_field_types: UnknownFieldTypePolicy,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }
}
