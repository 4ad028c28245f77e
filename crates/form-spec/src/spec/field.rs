use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Access level granted to one role on one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Required,
    Editable,
    Readonly,
    Hidden,
}

/// Per-role access entry attached to a stored field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Access {
    pub access_id: String,
    pub level: AccessLevel,
}

/// One option of a choice field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Item {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

/// Declarative validation rule, e.g. `{"type": "MINLENGTH", "value": "3"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Field definition shared by raw schemas and stored forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    pub slug: String,
    #[serde(alias = "type")]
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accesses: Vec<Access>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl FieldDefinition {
    /// Minimal definition; everything else defaults to empty.
    pub fn new(slug: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            type_id: type_id.into(),
            label: None,
            description: None,
            order: None,
            required: false,
            disabled: false,
            multiple: false,
            items: Vec::new(),
            validations: Vec::new(),
            defaults: Vec::new(),
            accesses: Vec::new(),
            parameters: None,
        }
    }

    /// Access entry recorded for `role`, if any.
    pub fn access_for(&self, role: &str) -> Option<AccessLevel> {
        self.accesses
            .iter()
            .find(|access| access.access_id == role)
            .map(|access| access.level)
    }
}
