use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::condition::{CleanedData, ConditionSet};
use crate::field::FieldSpec;

/// Error messages keyed by field slug.
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// A built form: ordered fields plus the compiled conditions.
///
/// Immutable once built, so one definition can serve any number of
/// concurrent validations.
#[derive(Debug, Clone)]
pub struct FormDefinition {
    label: Option<String>,
    description: String,
    fields: Vec<FieldSpec>,
    conditions: ConditionSet,
}

impl FormDefinition {
    pub(crate) fn new(
        label: Option<String>,
        description: String,
        fields: Vec<FieldSpec>,
        conditions: ConditionSet,
    ) -> Self {
        Self {
            label,
            description,
            fields,
            conditions,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Fields in render order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, slug: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.slug == slug)
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    /// Form bound to submitted data. Non-object submissions bind as empty.
    pub fn bind(&self, data: &Value) -> DynamicForm<'_> {
        DynamicForm {
            definition: self,
            fields: self.fields.iter().collect(),
            data: Some(data.as_object().cloned().unwrap_or_default()),
            cleaned_data: CleanedData::new(),
            errors: FormErrors::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn unbound(&self) -> DynamicForm<'_> {
        DynamicForm {
            definition: self,
            fields: self.fields.iter().collect(),
            data: None,
            cleaned_data: CleanedData::new(),
            errors: FormErrors::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Binds, validates and summarizes one submission.
    pub fn validate(&self, data: &Value) -> ValidationReport {
        let mut form = self.bind(data);
        form.is_valid();
        form.report()
    }
}

/// One validation of a [`FormDefinition`].
#[derive(Debug)]
pub struct DynamicForm<'a> {
    definition: &'a FormDefinition,
    fields: Vec<&'a FieldSpec>,
    data: Option<CleanedData>,
    cleaned_data: CleanedData,
    errors: FormErrors,
    removed: BTreeSet<String>,
}

impl<'a> DynamicForm<'a> {
    pub fn definition(&self) -> &'a FormDefinition {
        self.definition
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    /// Cleans every active field, then prunes conditional fields. Unbound
    /// forms are never valid.
    pub fn is_valid(&mut self) -> bool {
        self.full_clean();
        self.is_bound() && self.errors.is_empty()
    }

    fn full_clean(&mut self) {
        self.cleaned_data.clear();
        self.errors.clear();
        let Some(data) = &self.data else {
            return;
        };

        for field in &self.fields {
            match field.clean(data.get(&field.slug)) {
                Ok(value) => {
                    self.cleaned_data.insert(field.slug.clone(), value);
                }
                Err(errors) => {
                    self.errors.insert(
                        field.slug.clone(),
                        errors.into_iter().map(|error| error.message).collect(),
                    );
                }
            }
        }

        self.clean();
    }

    /// Applies the conditional removal pass to the current cleaned data:
    /// removed fields lose their cleaned value, their errors and their place
    /// in the active field list. Returns the removed slugs.
    pub fn clean(&mut self) -> BTreeSet<String> {
        let removed = self.get_removed_fields(&self.cleaned_data);
        for slug in &removed {
            self.cleaned_data.remove(slug);
            self.errors.remove(slug);
            self.fields.retain(|field| &field.slug != slug);
        }
        if !removed.is_empty() {
            debug!(removed = ?removed, "conditional fields removed");
        }
        self.removed.extend(removed.iter().cloned());
        removed
    }

    /// Slugs that every targeting condition wants removed.
    ///
    /// Each condition is evaluated once against the same snapshot; a slug is
    /// kept as soon as one condition keeps it, and slugs no condition
    /// targets are always kept.
    pub fn get_removed_fields(&self, cleaned_data: &CleanedData) -> BTreeSet<String> {
        let mut condition_targets: BTreeMap<&str, Vec<bool>> = BTreeMap::new();
        for condition in self.definition.conditions() {
            let keep = condition.keep_fields(cleaned_data);
            for slug in condition.fields_ids() {
                condition_targets.entry(slug.as_str()).or_default().push(keep);
            }
        }

        condition_targets
            .into_iter()
            .filter(|(_, decisions)| !decisions.iter().any(|keep| *keep))
            .map(|(slug, _)| slug.to_string())
            .collect()
    }

    pub fn cleaned_data(&self) -> &CleanedData {
        &self.cleaned_data
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Active fields, in render order.
    pub fn fields(&self) -> impl Iterator<Item = &'a FieldSpec> + '_ {
        self.fields.iter().copied()
    }

    pub fn has_field(&self, slug: &str) -> bool {
        self.fields.iter().any(|field| field.slug == slug)
    }

    pub fn removed_fields(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn report(&self) -> ValidationReport {
        ValidationReport {
            valid: self.is_bound() && self.errors.is_empty(),
            cleaned_data: self.cleaned_data.clone(),
            errors: self.errors.clone(),
            removed_fields: self.removed.iter().cloned().collect(),
            active_fields: self.fields.iter().map(|field| field.slug.clone()).collect(),
        }
    }
}

/// Serializable outcome of one validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub cleaned_data: CleanedData,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: FormErrors,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_fields: Vec<String>,
    pub active_fields: Vec<String>,
}
