use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::FieldError;
use crate::spec::field::Item;
use crate::validators::{DATE_FORMAT, Validator, parse_date};

/// Built-in field families the factory can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Paragraph,
    Email,
    Number,
    Date,
    Checkbox,
    Choice,
    MultipleChoice,
    File,
    HelpText,
    Title,
    Separator,
}

impl FieldKind {
    /// Maps a built-in `type_id`; `multiple` only matters for dropdowns.
    pub fn from_type_id(type_id: &str, multiple: bool) -> Option<Self> {
        let kind = match type_id {
            "text" => FieldKind::Text,
            "paragraph" => FieldKind::Paragraph,
            "email" => FieldKind::Email,
            "number" => FieldKind::Number,
            "date" => FieldKind::Date,
            "checkbox" => FieldKind::Checkbox,
            "dropdown" if multiple => FieldKind::MultipleChoice,
            "dropdown" | "radios" | "radios_buttons" => FieldKind::Choice,
            "checkboxes" => FieldKind::MultipleChoice,
            "file" => FieldKind::File,
            "help_text" => FieldKind::HelpText,
            "title" => FieldKind::Title,
            "separator" => FieldKind::Separator,
            _ => return None,
        };
        Some(kind)
    }

    /// Layout-only kinds that never take input.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            FieldKind::HelpText | FieldKind::Title | FieldKind::Separator
        )
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, FieldKind::MultipleChoice)
    }

    pub fn has_choices(&self) -> bool {
        matches!(self, FieldKind::Choice | FieldKind::MultipleChoice)
    }

    pub fn render_hint(&self) -> RenderHint {
        if self.is_format() {
            RenderHint::Custom
        } else {
            RenderHint::Default
        }
    }
}

/// Tells the rendering collaborator whether the field needs its own
/// bound-field presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderHint {
    Default,
    Custom,
}

/// A produced, validatable field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub slug: String,
    pub type_id: String,
    pub kind: FieldKind,
    pub label: Option<String>,
    pub help_text: Option<String>,
    pub required: bool,
    pub disabled: bool,
    pub initial: Option<Value>,
    pub choices: Vec<Item>,
    pub validators: Vec<Validator>,
    pub parameters: Option<Value>,
    pub render_hint: RenderHint,
}

impl FieldSpec {
    /// Cleans one raw submitted value. Disabled fields ignore the submission
    /// and clean their initial value instead.
    pub fn clean(&self, raw: Option<&Value>) -> Result<Value, Vec<FieldError>> {
        if self.kind.is_format() {
            return Ok(Value::Null);
        }
        let raw = if self.disabled {
            self.initial.as_ref()
        } else {
            raw
        };

        let value = self.to_value(raw).map_err(|error| vec![error])?;
        if is_empty(&value) {
            return if self.required {
                Err(vec![FieldError::required()])
            } else {
                Ok(value)
            };
        }

        self.check_choices(&value).map_err(|error| vec![error])?;

        let errors: Vec<FieldError> = self
            .validators
            .iter()
            .filter_map(|validator| validator.validate(&value).err())
            .collect();
        if errors.is_empty() {
            Ok(value)
        } else {
            Err(errors)
        }
    }

    fn to_value(&self, raw: Option<&Value>) -> Result<Value, FieldError> {
        let raw = raw.unwrap_or(&Value::Null);
        match self.kind {
            FieldKind::Text | FieldKind::Paragraph | FieldKind::Choice => scalar_text(raw),
            FieldKind::Email => {
                let value = scalar_text(raw)?;
                match value.as_str() {
                    Some(text) if !text.is_empty() && !looks_like_email(text) => {
                        Err(FieldError::invalid("Enter a valid email address."))
                    }
                    _ => Ok(value),
                }
            }
            FieldKind::Number => to_number(raw),
            FieldKind::Date => to_date(raw),
            FieldKind::Checkbox => Ok(Value::Bool(to_bool(raw))),
            FieldKind::MultipleChoice => to_list(raw),
            FieldKind::File => Ok(raw.clone()),
            FieldKind::HelpText | FieldKind::Title | FieldKind::Separator => Ok(Value::Null),
        }
    }

    fn check_choices(&self, value: &Value) -> Result<(), FieldError> {
        if !self.kind.has_choices() {
            return Ok(());
        }
        let selected: Vec<&str> = match value {
            Value::String(text) => vec![text.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        for candidate in selected {
            if !self.choices.iter().any(|item| item.value == candidate) {
                return Err(FieldError::new(
                    "invalid_choice",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        candidate
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(flag) => !flag,
        _ => false,
    }
}

fn scalar_text(raw: &Value) -> Result<Value, FieldError> {
    match raw {
        Value::Null => Ok(Value::String(String::new())),
        Value::String(text) => Ok(Value::String(text.trim().to_string())),
        Value::Number(number) => Ok(Value::String(number.to_string())),
        Value::Bool(flag) => Ok(Value::String(flag.to_string())),
        _ => Err(FieldError::invalid("Enter a valid value.")),
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[^\s@\p{Cc}]+@",
        r"[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?",
        r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
    ))
    .expect("email pattern compiles")
});

/// Local part without spaces, then dot-separated domain labels; no empty
/// label and no trailing dot.
fn looks_like_email(text: &str) -> bool {
    EMAIL_RE.is_match(text)
}

fn to_number(raw: &Value) -> Result<Value, FieldError> {
    let invalid = || FieldError::invalid("Enter a number.");
    match raw {
        Value::Null => Ok(Value::Null),
        Value::Number(_) => Ok(raw.clone()),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(Value::Null);
            }
            if let Ok(integer) = text.parse::<i64>() {
                return Ok(Value::Number(integer.into()));
            }
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn to_date(raw: &Value) -> Result<Value, FieldError> {
    match raw {
        Value::Null => Ok(Value::Null),
        Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
        Value::String(text) => parse_date(text)
            .map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
            .ok_or_else(|| FieldError::invalid("Enter a valid date.")),
        _ => Err(FieldError::invalid("Enter a valid date.")),
    }
}

fn to_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(flag) => *flag,
        Value::String(text) => !matches!(
            text.trim().to_lowercase().as_str(),
            "" | "false" | "0" | "off"
        ),
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn to_list(raw: &Value) -> Result<Value, FieldError> {
    match raw {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(Value::String(text.clone())),
                Value::Number(number) => Ok(Value::String(number.to_string())),
                _ => Err(FieldError::invalid("Enter a list of values.")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(FieldError::invalid("Enter a list of values.")),
    }
}
