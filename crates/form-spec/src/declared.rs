use crate::error::BuildError;
use crate::spec::field::FieldDefinition;
use crate::spec::form::StoredForm;

/// Form authored in code, saved as a [`StoredForm`].
///
/// ```
/// use form_spec::{DeclaredForm, FieldDefinition};
///
/// let form = DeclaredForm::new()
///     .field(FieldDefinition::new("name", "text"))
///     .field(FieldDefinition::new("subscribe", "checkbox"))
///     .to_stored(Some("Signup"), None, None)
///     .expect("label given");
/// assert_eq!(form.fields[1].order, Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeclaredForm {
    fields: Vec<FieldDefinition>,
}

impl DeclaredForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field; redeclaring a slug replaces it in place.
    pub fn field(mut self, definition: FieldDefinition) -> Self {
        match self
            .fields
            .iter_mut()
            .find(|existing| existing.slug == definition.slug)
        {
            Some(existing) => *existing = definition,
            None => self.fields.push(definition),
        }
        self
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Saves the declared fields, numbering them in declaration order.
    ///
    /// Without `instance` a new form is created and `label` is mandatory.
    /// With `instance` its fields are replaced; label and description change
    /// only when given.
    pub fn to_stored(
        &self,
        label: Option<&str>,
        description: Option<&str>,
        instance: Option<StoredForm>,
    ) -> Result<StoredForm, BuildError> {
        let mut form = match instance {
            Some(form) => clean_stored(form, label, description),
            None => {
                let label = label
                    .filter(|label| !label.is_empty())
                    .ok_or(BuildError::MissingLabel)?;
                StoredForm {
                    label: label.to_string(),
                    description: description.unwrap_or_default().to_string(),
                    ..StoredForm::default()
                }
            }
        };

        form.fields = self
            .fields
            .iter()
            .enumerate()
            .map(|(order, definition)| FieldDefinition {
                order: Some(order as u32),
                ..definition.clone()
            })
            .collect();
        Ok(form)
    }
}

/// Drops every field of `form` and applies non-empty label/description.
pub fn clean_stored(
    mut form: StoredForm,
    label: Option<&str>,
    description: Option<&str>,
) -> StoredForm {
    form.fields.clear();
    if let Some(label) = label.filter(|label| !label.is_empty()) {
        form.label = label.to_string();
    }
    if let Some(description) = description.filter(|description| !description.is_empty()) {
        form.description = description.to_string();
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_requires_a_label() {
        let error = DeclaredForm::new()
            .field(FieldDefinition::new("name", "text"))
            .to_stored(None, None, None)
            .unwrap_err();
        assert!(matches!(error, BuildError::MissingLabel));
    }

    #[test]
    fn update_replaces_fields_and_keeps_identity() {
        let existing = StoredForm {
            id: Some(7),
            label: "Old".into(),
            description: "Kept".into(),
            fields: vec![FieldDefinition::new("legacy", "text")],
            conditions: vec![],
        };
        let form = DeclaredForm::new()
            .field(FieldDefinition::new("email", "email"))
            .to_stored(Some("New"), None, Some(existing))
            .expect("update");
        assert_eq!(form.id, Some(7));
        assert_eq!(form.label, "New");
        assert_eq!(form.description, "Kept");
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.fields[0].slug, "email");
        assert_eq!(form.fields[0].order, Some(0));
    }

    #[test]
    fn redeclared_slug_replaces_previous_definition() {
        let declared = DeclaredForm::new()
            .field(FieldDefinition::new("a", "text"))
            .field(FieldDefinition::new("b", "text"))
            .field(FieldDefinition::new("a", "number"));
        assert_eq!(declared.fields().len(), 2);
        assert_eq!(declared.fields()[0].type_id, "number");
    }
}
