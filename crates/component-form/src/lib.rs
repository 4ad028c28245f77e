use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use form_spec::{
    BuildError, EngineConfig, FormDefinition, FormGenerator, FormSchema, StoredForm,
    check_cohesion, describe as describe_form,
};

const DEFAULT_SCHEMA: &str = include_str!("../../form-spec/tests/fixtures/signup_schema.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse submission: {0}")]
    DataParse(#[source] serde_json::Error),
    #[error("config must set only one of schema_json and stored_form_json")]
    AmbiguousSource,
    #[error("form build failed: {0}")]
    Build(#[from] BuildError),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    schema_json: Option<String>,
    #[serde(default)]
    stored_form_json: Option<String>,
    #[serde(default)]
    engine: EngineConfig,
}

enum FormSource {
    Schema(FormSchema),
    Stored(StoredForm),
}

impl FormSource {
    fn build(
        &self,
        config: &EngineConfig,
        role: Option<&str>,
    ) -> Result<FormDefinition, BuildError> {
        let generator = FormGenerator::from_config(config);
        match self {
            FormSource::Schema(schema) => generator.from_schema(schema),
            FormSource::Stored(form) => generator.from_stored(form, role),
        }
    }

    fn issues(&self) -> Vec<form_spec::CohesionIssue> {
        match self {
            FormSource::Schema(schema) => check_cohesion(&schema.fields, &schema.conditions),
            FormSource::Stored(form) => check_cohesion(&form.fields, &form.conditions),
        }
    }
}

fn load_config(config_json: &str) -> Result<(ComponentConfig, FormSource), ComponentError> {
    let config: ComponentConfig = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let source = match (&config.schema_json, &config.stored_form_json) {
        (Some(_), Some(_)) => return Err(ComponentError::AmbiguousSource),
        (_, Some(stored)) => {
            FormSource::Stored(serde_json::from_str(stored).map_err(ComponentError::ConfigParse)?)
        }
        (schema, None) => {
            let raw = schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
            FormSource::Schema(serde_json::from_str(raw).map_err(ComponentError::ConfigParse)?)
        }
    };
    Ok((config, source))
}

fn build_form(config_json: &str, role: Option<&str>) -> Result<FormDefinition, ComponentError> {
    let (config, source) = load_config(config_json)?;
    Ok(source.build(&config.engine, role)?)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn role_arg(role: &str) -> Option<&str> {
    Some(role.trim()).filter(|role| !role.is_empty())
}

/// Role view of the configured form. An empty `role` means no role.
pub fn describe(config_json: &str, role: &str) -> String {
    respond(build_form(config_json, role_arg(role)).map(|form| describe_form(&form)))
}

/// Validates one submission and reports cleaned data, errors and removals.
pub fn validate_submission(config_json: &str, role: &str, data_json: &str) -> String {
    respond(build_form(config_json, role_arg(role)).and_then(|form| {
        let data: Value = serde_json::from_str(data_json).map_err(ComponentError::DataParse)?;
        let report = form.validate(&data);
        debug!(valid = report.valid, removed = report.removed_fields.len(), "submission validated");
        serde_json::to_value(report).map_err(ComponentError::JsonEncode)
    }))
}

/// Lints conditions and confirms the form builds.
pub fn check_form(config_json: &str) -> String {
    respond(load_config(config_json).and_then(|(config, source)| {
        let issues = source.issues();
        let build = source.build(&config.engine, None).err().map(|err| err.to_string());
        Ok(json!({
            "ok": issues.is_empty() && build.is_none(),
            "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "build_error": build,
        }))
    }))
}

/// JSON Schema describing the accepted form schema document.
pub fn json_schema() -> String {
    let schema = schemars::schema_for!(FormSchema);
    respond(serde_json::to_value(schema).map_err(ComponentError::JsonEncode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored_config() -> String {
        let stored = include_str!("../../form-spec/tests/fixtures/stored_form.json");
        json!({ "stored_form_json": stored }).to_string()
    }

    #[test]
    fn describe_defaults_to_bundled_schema() {
        let payload = describe("", "");
        let view: Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(view["label"], "Signup");
        assert_eq!(view["fields"][0]["slug"], "intro");
    }

    #[test]
    fn describe_applies_role_to_stored_form() {
        let payload = describe(&stored_config(), "guest");
        let view: Value = serde_json::from_str(&payload).expect("json");
        let slugs: Vec<&str> = view["fields"]
            .as_array()
            .expect("fields")
            .iter()
            .filter_map(|field| field["slug"].as_str())
            .collect();
        assert_eq!(slugs, vec!["badge", "name", "manager", "reports"]);
    }

    #[test]
    fn validate_submission_reports_removed_fields() {
        let data = json!({ "has_company": false, "plan": "free", "email": "a@b.io" });
        let result = validate_submission("", "", &data.to_string());
        let parsed: Value = serde_json::from_str(&result).expect("json");
        assert_eq!(parsed["valid"], true);
        assert_eq!(parsed["removed_fields"], json!(["company", "seats"]));
        assert!(parsed["cleaned_data"].get("company").is_none());
    }

    #[test]
    fn validate_submission_returns_field_errors() {
        let result = validate_submission(&stored_config(), "staff", r#"{"manager": true}"#);
        let parsed: Value = serde_json::from_str(&result).expect("json");
        assert_eq!(parsed["valid"], false);
        assert_eq!(parsed["errors"]["salary"][0], "This field is required.");
    }

    #[test]
    fn bad_submission_is_an_error_payload() {
        let result = validate_submission("", "", "{not json");
        let parsed: Value = serde_json::from_str(&result).expect("json");
        assert!(
            parsed["error"]
                .as_str()
                .is_some_and(|error| error.starts_with("failed to parse submission"))
        );
    }

    #[test]
    fn conflicting_sources_are_rejected() {
        let config = json!({ "schema_json": "{}", "stored_form_json": "{}" }).to_string();
        let parsed: Value = serde_json::from_str(&describe(&config, "")).expect("json");
        assert_eq!(
            parsed["error"],
            "config must set only one of schema_json and stored_form_json"
        );
    }

    #[test]
    fn check_form_lists_cohesion_issues() {
        let schema = json!({
            "description": "broken",
            "fields": [{ "slug": "a", "type_id": "checkbox" }],
            "conditions": [{
                "name": "ghost",
                "action": "display_iff",
                "fields_ids": ["b"],
                "tests": [{ "field_id": "a", "operator": "eq", "values": [true] }]
            }]
        });
        let config = json!({ "schema_json": schema.to_string() }).to_string();
        let parsed: Value = serde_json::from_str(&check_form(&config)).expect("json");
        assert_eq!(parsed["ok"], false);
        assert_eq!(
            parsed["issues"][0],
            "condition (ghost) is using undefined fields (b)"
        );
        assert!(parsed["build_error"].as_str().is_some());
    }

    #[test]
    fn check_form_accepts_bundled_schema() {
        let parsed: Value = serde_json::from_str(&check_form("")).expect("json");
        assert_eq!(parsed["ok"], true);
        assert!(parsed["build_error"].is_null());
    }

    #[test]
    fn engine_config_reaches_the_factory() {
        let schema = json!({
            "description": "alias",
            "fields": [{ "slug": "phone", "type_id": "phone", "required": true }]
        });
        let config = json!({
            "schema_json": schema.to_string(),
            "engine": { "field_aliases": { "phone": "text" } }
        })
        .to_string();
        let parsed: Value =
            serde_json::from_str(&validate_submission(&config, "", "{}")).expect("json");
        assert_eq!(parsed["errors"]["phone"][0], "This field is required.");
    }

    #[test]
    fn json_schema_describes_fields() {
        let parsed: Value = serde_json::from_str(&json_schema()).expect("json");
        assert!(
            parsed["properties"]
                .as_object()
                .is_some_and(|properties| properties.contains_key("fields"))
        );
    }
}
