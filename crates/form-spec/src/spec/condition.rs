use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a condition test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    In,
    NotIn,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::In => "in",
            Operator::NotIn => "not_in",
        }
    }
}

/// Predicate over one trigger field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionTestSpec {
    pub field_id: String,
    pub operator: Operator,
    pub values: Vec<Value>,
}

/// Declarative conditional display rule.
///
/// `action` names an entry of the condition registry (`display_iff` and
/// `hide_iff` are always available).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionSpec {
    pub name: String,
    pub action: String,
    pub fields_ids: Vec<String>,
    pub tests: Vec<ConditionTestSpec>,
}
