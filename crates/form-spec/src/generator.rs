use std::collections::BTreeSet;

use tracing::debug;

use crate::condition::ConditionRegistry;
use crate::config::EngineConfig;
use crate::error::BuildError;
use crate::factory::{AccessContext, FieldFactory, Produced};
use crate::form::FormDefinition;
use crate::spec::condition::ConditionSpec;
use crate::spec::field::FieldDefinition;
use crate::spec::form::{FormSchema, StoredForm};

/// Assembles [`FormDefinition`]s from schemas or stored forms.
#[derive(Debug, Clone, Default)]
pub struct FormGenerator {
    factory: FieldFactory,
    registry: ConditionRegistry,
}

impl FormGenerator {
    pub fn new(factory: FieldFactory, registry: ConditionRegistry) -> Self {
        Self { factory, registry }
    }

    /// Generator with the default condition registry.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(FieldFactory::new(config), ConditionRegistry::default())
    }

    pub fn factory(&self) -> &FieldFactory {
        &self.factory
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    /// Builds from a raw schema; per-role accesses are not consulted.
    pub fn from_schema(&self, schema: &FormSchema) -> Result<FormDefinition, BuildError> {
        self.assemble(
            schema.label.clone(),
            schema.description.clone(),
            &schema.fields,
            &schema.conditions,
            AccessContext::Schema,
        )
    }

    /// Builds a stored form as seen by `role`. Fields hidden for the role are
    /// left out entirely.
    pub fn from_stored(
        &self,
        form: &StoredForm,
        role: Option<&str>,
    ) -> Result<FormDefinition, BuildError> {
        self.assemble(
            Some(form.label.clone()),
            form.description.clone(),
            &form.fields,
            &form.conditions,
            AccessContext::Role(role),
        )
    }

    fn assemble(
        &self,
        label: Option<String>,
        description: String,
        definitions: &[FieldDefinition],
        conditions: &[ConditionSpec],
        access: AccessContext<'_>,
    ) -> Result<FormDefinition, BuildError> {
        let mut defined = BTreeSet::new();
        for definition in definitions {
            if !defined.insert(definition.slug.clone()) {
                return Err(BuildError::DuplicateSlug(definition.slug.clone()));
            }
        }

        let mut fields = Vec::with_capacity(definitions.len());
        for definition in ordered(definitions) {
            match self.factory.produce(definition, access)? {
                Produced::Field(field) => fields.push(*field),
                Produced::Skipped(reason) => {
                    debug!(slug = %definition.slug, reason = ?reason, "field skipped");
                }
            }
        }

        let conditions = self.registry.build(&defined, &fields, conditions)?;
        debug!(
            fields = fields.len(),
            conditions = conditions.len(),
            "form definition built"
        );
        Ok(FormDefinition::new(label, description, fields, conditions))
    }
}

/// Stable sort on `order`; a definition without one sorts by its position.
fn ordered(definitions: &[FieldDefinition]) -> Vec<&FieldDefinition> {
    let mut keyed: Vec<(u32, &FieldDefinition)> = definitions
        .iter()
        .enumerate()
        .map(|(index, definition)| (definition.order.unwrap_or(index as u32), definition))
        .collect();
    keyed.sort_by_key(|(order, _)| *order);
    keyed.into_iter().map(|(_, definition)| definition).collect()
}

/// Builds a raw schema with the default generator.
pub fn build_from_schema(schema: &FormSchema) -> Result<FormDefinition, BuildError> {
    FormGenerator::default().from_schema(schema)
}

/// Builds a stored form for `role` with the default generator.
pub fn build_for_role(form: &StoredForm, role: Option<&str>) -> Result<FormDefinition, BuildError> {
    FormGenerator::default().from_stored(form, role)
}
