use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::spec::condition::ConditionSpec;
use crate::spec::field::FieldDefinition;

/// Problem found in the conditions of a form definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CohesionIssue {
    /// The condition targets or tests slugs the form does not define.
    UndefinedFields { condition: String, slugs: Vec<String> },
    /// One action targets the same slugs from several conditions.
    DuplicateTargets { action: String, slugs: Vec<String> },
}

impl fmt::Display for CohesionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CohesionIssue::UndefinedFields { condition, slugs } => write!(
                f,
                "condition ({}) is using undefined fields ({})",
                condition,
                slugs.join(", ")
            ),
            CohesionIssue::DuplicateTargets { action, slugs } => write!(
                f,
                "action {} is used many times for the same fields ({})",
                action,
                slugs.join(", ")
            ),
        }
    }
}

/// Lints condition references against the defined fields.
pub fn check_cohesion(
    fields: &[FieldDefinition],
    conditions: &[ConditionSpec],
) -> Vec<CohesionIssue> {
    let defined: BTreeSet<&str> = fields.iter().map(|field| field.slug.as_str()).collect();
    let mut issues = Vec::new();
    let mut targets_by_action: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for condition in conditions {
        let mut missing = BTreeSet::new();
        for slug in &condition.fields_ids {
            targets_by_action
                .entry(condition.action.as_str())
                .or_default()
                .push(slug);
            if !defined.contains(slug.as_str()) {
                missing.insert(slug.clone());
            }
        }
        for test in &condition.tests {
            if !defined.contains(test.field_id.as_str()) {
                missing.insert(test.field_id.clone());
            }
        }
        if !missing.is_empty() {
            issues.push(CohesionIssue::UndefinedFields {
                condition: condition.name.clone(),
                slugs: missing.into_iter().collect(),
            });
        }
    }

    for (action, slugs) in targets_by_action {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for slug in slugs {
            *counts.entry(slug).or_default() += 1;
        }
        let duplicates: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(slug, _)| slug.to_string())
            .collect();
        if !duplicates.is_empty() {
            issues.push(CohesionIssue::DuplicateTargets {
                action: action.to_string(),
                slugs: duplicates,
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::condition::{ConditionTestSpec, Operator};
    use serde_json::json;

    fn condition(name: &str, targets: &[&str], trigger: &str) -> ConditionSpec {
        ConditionSpec {
            name: name.into(),
            action: "display_iff".into(),
            fields_ids: targets.iter().map(|slug| slug.to_string()).collect(),
            tests: vec![ConditionTestSpec {
                field_id: trigger.into(),
                operator: Operator::Eq,
                values: vec![json!(true)],
            }],
        }
    }

    #[test]
    fn reports_undefined_targets_and_triggers() {
        let fields = vec![FieldDefinition::new("a", "checkbox")];
        let issues = check_cohesion(&fields, &[condition("c1", &["ghost"], "phantom")]);
        assert_eq!(
            issues,
            vec![CohesionIssue::UndefinedFields {
                condition: "c1".into(),
                slugs: vec!["ghost".into(), "phantom".into()],
            }]
        );
        assert_eq!(
            issues[0].to_string(),
            "condition (c1) is using undefined fields (ghost, phantom)"
        );
    }

    #[test]
    fn reports_duplicate_targets_per_action() {
        let fields = vec![
            FieldDefinition::new("a", "checkbox"),
            FieldDefinition::new("b", "checkbox"),
            FieldDefinition::new("c", "text"),
        ];
        let issues = check_cohesion(
            &fields,
            &[condition("c1", &["c"], "a"), condition("c2", &["c"], "b")],
        );
        assert_eq!(
            issues,
            vec![CohesionIssue::DuplicateTargets {
                action: "display_iff".into(),
                slugs: vec!["c".into()],
            }]
        );
    }
}
