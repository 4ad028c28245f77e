use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BuildError, ConditionEvaluationError};
use crate::field::FieldSpec;
use crate::spec::condition::{ConditionSpec, Operator};

/// Cleaned values keyed by field slug.
pub type CleanedData = Map<String, Value>;

/// Decides what happens to a condition's targets once its tests are known.
pub trait ConditionAction: fmt::Debug + Send + Sync {
    /// Registry key, e.g. `display_iff`.
    fn name(&self) -> &str;

    /// Whether the targets stay active, given whether every test held.
    fn keep_fields(&self, tests_hold: bool) -> bool;
}

/// Keep the targets only when every test holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayIff;

impl ConditionAction for DisplayIff {
    fn name(&self) -> &str {
        "display_iff"
    }

    fn keep_fields(&self, tests_hold: bool) -> bool {
        tests_hold
    }
}

/// Remove the targets when every test holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct HideIff;

impl ConditionAction for HideIff {
    fn name(&self) -> &str {
        "hide_iff"
    }

    fn keep_fields(&self, tests_hold: bool) -> bool {
        !tests_hold
    }
}

/// Compiled predicate over one trigger field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTest {
    field_id: String,
    operator: Operator,
    values: Vec<Value>,
}

impl ConditionTest {
    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn evaluate(&self, data: &CleanedData) -> Result<bool, ConditionEvaluationError> {
        let reference = data
            .get(&self.field_id)
            .ok_or_else(|| ConditionEvaluationError::MissingTrigger(self.field_id.clone()))?;
        let first_matches = || {
            self.values
                .first()
                .is_some_and(|expected| matches_value(reference, expected))
        };
        let any_matches = || {
            self.values
                .iter()
                .any(|expected| matches_value(reference, expected))
        };
        Ok(match self.operator {
            Operator::Eq => first_matches(),
            Operator::Neq => !first_matches(),
            Operator::In => any_matches(),
            Operator::NotIn => !any_matches(),
        })
    }
}

/// A list reference (multiple choice) matches when it contains the value.
fn matches_value(reference: &Value, expected: &Value) -> bool {
    match (reference, expected) {
        (Value::Array(_), Value::Array(_)) => reference == expected,
        (Value::Array(items), _) => items.iter().any(|item| same_scalar(item, expected)),
        _ => same_scalar(reference, expected),
    }
}

fn same_scalar(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(number), Value::String(text))
        | (Value::String(text), Value::Number(number)) => {
            match (number.as_f64(), text.trim().parse::<f64>()) {
                (Some(number), Ok(parsed)) => number == parsed,
                _ => false,
            }
        }
        (Value::String(text), Value::Bool(flag)) | (Value::Bool(flag), Value::String(text)) => {
            text.trim() == flag.to_string()
        }
        _ => left == right,
    }
}

/// One compiled conditional display rule.
#[derive(Debug, Clone)]
pub struct Condition {
    name: String,
    action: Arc<dyn ConditionAction>,
    fields_ids: Vec<String>,
    tests: Vec<ConditionTest>,
}

impl Condition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &str {
        self.action.name()
    }

    /// Targets governed by this condition.
    pub fn fields_ids(&self) -> &[String] {
        &self.fields_ids
    }

    pub fn tests(&self) -> &[ConditionTest] {
        &self.tests
    }

    /// Whether the targets should be kept for this cleaned data. A test whose
    /// trigger has no cleaned value counts as false.
    pub fn keep_fields(&self, data: &CleanedData) -> bool {
        let tests_hold = self.tests.iter().all(|test| match test.evaluate(data) {
            Ok(result) => result,
            Err(err) => {
                debug!(condition = %self.name, error = %err, "condition test treated as false");
                false
            }
        });
        self.action.keep_fields(tests_hold)
    }
}

/// Conditions attached to one form. Order never changes the outcome.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConditionSet {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.iter()
    }
}

/// Actions available to condition specs, keyed by name.
#[derive(Debug, Clone)]
pub struct ConditionRegistry {
    actions: BTreeMap<String, Arc<dyn ConditionAction>>,
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DisplayIff).register(HideIff);
        registry
    }
}

impl ConditionRegistry {
    /// Registry without any action.
    pub fn empty() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    pub fn register<A>(&mut self, action: A) -> &mut Self
    where
        A: ConditionAction + 'static,
    {
        self.actions
            .insert(action.name().to_string(), Arc::new(action));
        self
    }

    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Compiles condition specs against the fields produced for this build.
    ///
    /// `defined` holds every slug the form defines; references outside it are
    /// fatal. Targets that are defined but were not produced (skipped for the
    /// role) are dropped, and so is a condition left without targets.
    pub fn build(
        &self,
        defined: &BTreeSet<String>,
        fields: &[FieldSpec],
        specs: &[ConditionSpec],
    ) -> Result<ConditionSet, BuildError> {
        let produced: BTreeSet<&str> = fields.iter().map(|field| field.slug.as_str()).collect();
        let mut conditions = Vec::with_capacity(specs.len());

        for spec in specs {
            let action = self
                .actions
                .get(&spec.action)
                .ok_or_else(|| BuildError::UnknownAction {
                    condition: spec.name.clone(),
                    action: spec.action.clone(),
                })?;

            if spec.fields_ids.is_empty()
                || spec.tests.is_empty()
                || spec.tests.iter().any(|test| test.values.is_empty())
            {
                return Err(BuildError::EmptyCondition(spec.name.clone()));
            }

            let undefined: BTreeSet<&String> = spec
                .fields_ids
                .iter()
                .chain(spec.tests.iter().map(|test| &test.field_id))
                .filter(|slug| !defined.contains(*slug))
                .collect();
            if !undefined.is_empty() {
                return Err(BuildError::UndefinedFieldReference {
                    condition: spec.name.clone(),
                    slugs: undefined.into_iter().cloned().collect(),
                });
            }

            let mut fields_ids: Vec<String> = Vec::with_capacity(spec.fields_ids.len());
            for slug in &spec.fields_ids {
                if produced.contains(slug.as_str()) && !fields_ids.contains(slug) {
                    fields_ids.push(slug.clone());
                }
            }
            if fields_ids.is_empty() {
                debug!(
                    condition = %spec.name,
                    "no target field left for this build; condition dropped"
                );
                continue;
            }

            conditions.push(Condition {
                name: spec.name.clone(),
                action: Arc::clone(action),
                fields_ids,
                tests: spec
                    .tests
                    .iter()
                    .map(|test| ConditionTest {
                        field_id: test.field_id.clone(),
                        operator: test.operator,
                        values: test.values.clone(),
                    })
                    .collect(),
            });
        }

        Ok(ConditionSet { conditions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::condition::ConditionTestSpec;
    use serde_json::json;

    fn data(value: Value) -> CleanedData {
        value.as_object().cloned().unwrap_or_default()
    }

    fn test(operator: Operator, values: Vec<Value>) -> ConditionTest {
        ConditionTest {
            field_id: "a".into(),
            operator,
            values,
        }
    }

    #[test]
    fn operators_compare_cleaned_values() {
        let cleaned = data(json!({ "a": "blue" }));
        assert!(test(Operator::Eq, vec![json!("blue")]).evaluate(&cleaned).unwrap());
        assert!(test(Operator::Neq, vec![json!("red")]).evaluate(&cleaned).unwrap());
        assert!(test(Operator::In, vec![json!("red"), json!("blue")]).evaluate(&cleaned).unwrap());
        assert!(!test(Operator::NotIn, vec![json!("blue")]).evaluate(&cleaned).unwrap());
    }

    #[test]
    fn list_references_match_on_membership() {
        let cleaned = data(json!({ "a": ["x", "y"] }));
        assert!(test(Operator::Eq, vec![json!("y")]).evaluate(&cleaned).unwrap());
        assert!(!test(Operator::In, vec![json!("z")]).evaluate(&cleaned).unwrap());
    }

    #[test]
    fn numbers_and_text_compare_loosely() {
        let cleaned = data(json!({ "a": 10 }));
        assert!(test(Operator::Eq, vec![json!("10")]).evaluate(&cleaned).unwrap());
        assert!(test(Operator::Eq, vec![json!(10.0)]).evaluate(&cleaned).unwrap());
    }

    #[test]
    fn numeric_text_matches_regardless_of_number_spelling() {
        for trigger in [json!(10), json!(10.0)] {
            let cleaned = data(json!({ "a": trigger }));
            assert!(test(Operator::Eq, vec![json!("10")]).evaluate(&cleaned).unwrap());
            assert!(test(Operator::Eq, vec![json!("10.0")]).evaluate(&cleaned).unwrap());
            assert!(!test(Operator::Neq, vec![json!("10")]).evaluate(&cleaned).unwrap());
            assert!(test(Operator::In, vec![json!("3"), json!("10")]).evaluate(&cleaned).unwrap());
        }

        let text = data(json!({ "a": "10.0" }));
        assert!(test(Operator::Eq, vec![json!(10)]).evaluate(&text).unwrap());
        let number = data(json!({ "a": 10 }));
        assert!(!test(Operator::Eq, vec![json!("ten")]).evaluate(&number).unwrap());
    }

    #[test]
    fn missing_trigger_is_reported() {
        let error = test(Operator::Eq, vec![json!(true)])
            .evaluate(&CleanedData::new())
            .unwrap_err();
        assert_eq!(error, ConditionEvaluationError::MissingTrigger("a".into()));
    }

    #[test]
    fn missing_trigger_counts_as_false() {
        let display = Condition {
            name: "show".into(),
            action: Arc::new(DisplayIff),
            fields_ids: vec!["b".into()],
            tests: vec![test(Operator::Eq, vec![json!(true)])],
        };
        assert!(!display.keep_fields(&CleanedData::new()));

        let hide = Condition {
            action: Arc::new(HideIff),
            ..display
        };
        assert!(hide.keep_fields(&CleanedData::new()));
    }

    #[test]
    fn build_rejects_unknown_actions_and_empty_rules() {
        let registry = ConditionRegistry::default();
        let defined = BTreeSet::from(["a".to_string(), "b".to_string()]);
        let spec = ConditionSpec {
            name: "c".into(),
            action: "explode_iff".into(),
            fields_ids: vec!["b".into()],
            tests: vec![ConditionTestSpec {
                field_id: "a".into(),
                operator: Operator::Eq,
                values: vec![json!(true)],
            }],
        };
        let error = registry.build(&defined, &[], &[spec.clone()]).unwrap_err();
        assert!(matches!(error, BuildError::UnknownAction { .. }));

        let empty = ConditionSpec {
            action: "display_iff".into(),
            tests: vec![],
            ..spec
        };
        let error = registry.build(&defined, &[], &[empty]).unwrap_err();
        assert!(matches!(error, BuildError::EmptyCondition(_)));
    }

    #[test]
    fn registry_accepts_custom_actions() {
        #[derive(Debug)]
        struct AlwaysKeep;

        impl ConditionAction for AlwaysKeep {
            fn name(&self) -> &str {
                "always_keep"
            }

            fn keep_fields(&self, _tests_hold: bool) -> bool {
                true
            }
        }

        let mut registry = ConditionRegistry::default();
        registry.register(AlwaysKeep);
        assert!(registry.contains("always_keep"));
        assert_eq!(
            registry.actions().collect::<Vec<_>>(),
            vec!["always_keep", "display_iff", "hide_iff"]
        );
    }
}
