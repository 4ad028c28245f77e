use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{EngineConfig, UnknownFieldTypePolicy};
use crate::error::BuildError;
use crate::field::{FieldKind, FieldSpec};
use crate::spec::field::{AccessLevel, FieldDefinition, Item};
use crate::validators::Validator;

/// Where required/disabled flags come from for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessContext<'a> {
    /// Raw schema: the definition's own `required` and `disabled` flags.
    Schema,
    /// Stored form: the access level recorded for the role, if any.
    Role(Option<&'a str>),
}

/// Why a definition produced no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    UnknownType,
}

/// Outcome of [`FieldFactory::produce`].
#[derive(Debug, Clone)]
pub enum Produced {
    Field(Box<FieldSpec>),
    Skipped(SkipReason),
}

/// Turns field definitions into validatable fields.
#[derive(Debug, Clone, Default)]
pub struct FieldFactory {
    aliases: BTreeMap<String, String>,
    unknown_types: UnknownFieldTypePolicy,
}

impl FieldFactory {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            aliases: config.field_aliases.clone(),
            unknown_types: config.unknown_field_types,
        }
    }

    /// Registers an extra `type_id` handled like the built-in `builtin` type.
    pub fn with_alias(mut self, type_id: impl Into<String>, builtin: impl Into<String>) -> Self {
        self.aliases.insert(type_id.into(), builtin.into());
        self
    }

    pub fn kind_of(&self, definition: &FieldDefinition) -> Option<FieldKind> {
        let type_id = self
            .aliases
            .get(&definition.type_id)
            .map(String::as_str)
            .unwrap_or(&definition.type_id);
        FieldKind::from_type_id(type_id, definition.multiple)
    }

    pub fn produce(
        &self,
        definition: &FieldDefinition,
        access: AccessContext<'_>,
    ) -> Result<Produced, BuildError> {
        let Some(kind) = self.kind_of(definition) else {
            return match self.unknown_types {
                UnknownFieldTypePolicy::Error => Err(BuildError::UnknownFieldType {
                    slug: definition.slug.clone(),
                    type_id: definition.type_id.clone(),
                }),
                UnknownFieldTypePolicy::Skip => {
                    warn!(
                        slug = %definition.slug,
                        type_id = %definition.type_id,
                        "skipping field of unknown type"
                    );
                    Ok(Produced::Skipped(SkipReason::UnknownType))
                }
            };
        };

        let (required, disabled) = match access {
            AccessContext::Schema => (definition.required, definition.disabled),
            AccessContext::Role(role) => match role.and_then(|role| definition.access_for(role)) {
                Some(AccessLevel::Hidden) => {
                    debug!(slug = %definition.slug, role = ?role, "field hidden for role");
                    return Ok(Produced::Skipped(SkipReason::Hidden));
                }
                Some(AccessLevel::Required) => (true, false),
                Some(AccessLevel::Readonly) => (false, true),
                Some(AccessLevel::Editable) | None => (false, false),
            },
        };

        let validators = definition
            .validations
            .iter()
            .map(|validation| {
                Validator::compile(&definition.slug, validation, kind == FieldKind::Date)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Produced::Field(Box::new(FieldSpec {
            slug: definition.slug.clone(),
            type_id: definition.type_id.clone(),
            kind,
            label: definition.label.clone(),
            help_text: definition.description.clone(),
            required: required && !kind.is_format(),
            disabled,
            initial: initial_value(kind, &definition.defaults),
            choices: ordered_items(&definition.items),
            validators,
            parameters: definition.parameters.clone(),
            render_hint: kind.render_hint(),
        })))
    }
}

fn initial_value(kind: FieldKind, defaults: &[String]) -> Option<Value> {
    let defaults: Vec<&String> = defaults.iter().filter(|value| !value.is_empty()).collect();
    if defaults.is_empty() {
        return None;
    }
    if kind.is_multiple() {
        Some(Value::Array(
            defaults.into_iter().cloned().map(Value::String).collect(),
        ))
    } else {
        defaults.first().map(|value| Value::String((*value).clone()))
    }
}

fn ordered_items(items: &[Item]) -> Vec<Item> {
    let mut ordered: Vec<(u32, &Item)> = items
        .iter()
        .enumerate()
        .map(|(index, item)| (item.order.unwrap_or(index as u32), item))
        .collect();
    ordered.sort_by_key(|(order, _)| *order);
    ordered.into_iter().map(|(_, item)| item.clone()).collect()
}
