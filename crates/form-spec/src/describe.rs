use serde_json::{Map, Value, json};

use crate::field::{FieldKind, FieldSpec, RenderHint};
use crate::form::FormDefinition;

/// JSON view of a built form as one role sees it: resolved required and
/// disabled flags, ordered fields, and the compiled conditions.
pub fn describe(definition: &FormDefinition) -> Value {
    let fields = definition
        .fields()
        .iter()
        .map(describe_field)
        .collect::<Vec<_>>();

    let conditions = definition
        .conditions()
        .iter()
        .map(|condition| {
            let tests = condition
                .tests()
                .iter()
                .map(|test| {
                    json!({
                        "field_id": test.field_id(),
                        "operator": test.operator().as_str(),
                        "values": test.values(),
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "name": condition.name(),
                "action": condition.action(),
                "fields_ids": condition.fields_ids(),
                "tests": tests,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "label": definition.label(),
        "description": definition.description(),
        "fields": fields,
        "conditions": conditions,
    })
}

fn describe_field(field: &FieldSpec) -> Value {
    let mut map = Map::new();
    map.insert("slug".into(), Value::String(field.slug.clone()));
    map.insert("type".into(), Value::String(field.type_id.clone()));
    map.insert(
        "label".into(),
        field.label.clone().map(Value::String).unwrap_or(Value::Null),
    );
    map.insert(
        "help_text".into(),
        field
            .help_text
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    map.insert("required".into(), Value::Bool(field.required));
    map.insert("disabled".into(), Value::Bool(field.disabled));
    map.insert("multiple".into(), Value::Bool(field.kind.is_multiple()));
    if field.kind.has_choices() {
        map.insert(
            "items".into(),
            Value::Array(
                field
                    .choices
                    .iter()
                    .map(|item| json!({ "value": item.value, "label": item.label }))
                    .collect(),
            ),
        );
    }
    if let Some(initial) = &field.initial {
        map.insert("initial".into(), initial.clone());
    }
    if field.render_hint == RenderHint::Custom {
        map.insert("render_hint".into(), Value::String("custom".into()));
    }
    if !field.validators.is_empty() {
        map.insert(
            "validations".into(),
            Value::Array(
                field
                    .validators
                    .iter()
                    .map(|validator| Value::String(validator.kind().to_string()))
                    .collect(),
            ),
        );
    }
    if let Some(parameters) = &field.parameters {
        map.insert("parameters".into(), parameters.clone());
    }
    if field.kind == FieldKind::File {
        map.insert("upload".into(), Value::Bool(true));
    }
    Value::Object(map)
}
