use std::cmp::Ordering;

use chrono::{Datelike, Local, NaiveDate};
use handlebars::{Handlebars, Template, no_escape};
use regex::Regex;
use serde_json::{Value, json};

use crate::error::{BuildError, FieldError};
use crate::spec::field::Validation;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl Comparison {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Neq => ordering != Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Limit {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

#[derive(Debug, Clone)]
enum Check {
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Compare(Comparison, Limit),
    DateInPast,
    DateInFuture,
    AgeAbove(i32),
    AgeUnder(i32),
}

/// Compiled validation rule attached to a field.
#[derive(Debug, Clone)]
pub struct Validator {
    kind: String,
    check: Check,
    limit: Option<String>,
    message: String,
}

impl Validator {
    /// Compiles a declarative validation. Date-only rules are accepted only
    /// when `date_field` is set.
    pub fn compile(
        slug: &str,
        validation: &Validation,
        date_field: bool,
    ) -> Result<Self, BuildError> {
        let kind = validation.kind.to_uppercase();
        let limit = validation.value.as_ref().map(limit_text);
        let invalid = || BuildError::InvalidValidatorValue {
            slug: slug.to_string(),
            kind: kind.clone(),
        };

        let check = match kind.as_str() {
            "MINLENGTH" => Check::MinLength(parse_count(limit.as_deref()).ok_or_else(invalid)?),
            "MAXLENGTH" => Check::MaxLength(parse_count(limit.as_deref()).ok_or_else(invalid)?),
            "REGEXP" => {
                let pattern = limit.as_deref().ok_or_else(invalid)?;
                let regex = Regex::new(pattern).map_err(|source| BuildError::InvalidPattern {
                    slug: slug.to_string(),
                    source,
                })?;
                Check::Pattern(regex)
            }
            "GT" | "GTE" | "LT" | "LTE" => {
                let comparison = match kind.as_str() {
                    "GT" => Comparison::Gt,
                    "GTE" => Comparison::Gte,
                    "LT" => Comparison::Lt,
                    _ => Comparison::Lte,
                };
                let raw = limit.as_deref().ok_or_else(invalid)?;
                let limit = if date_field {
                    parse_date(raw).map(Limit::Date)
                } else {
                    parse_number(raw).map(Limit::Number)
                };
                Check::Compare(comparison, limit.ok_or_else(invalid)?)
            }
            "EQ" | "NEQ" => {
                let comparison = if kind == "EQ" {
                    Comparison::Eq
                } else {
                    Comparison::Neq
                };
                let raw = limit.as_deref().ok_or_else(invalid)?;
                let limit = if date_field {
                    Limit::Date(parse_date(raw).ok_or_else(invalid)?)
                } else if let Some(number) = parse_number(raw) {
                    Limit::Number(number)
                } else {
                    Limit::Text(raw.to_string())
                };
                Check::Compare(comparison, limit)
            }
            "IS_DATE_IN_THE_PAST" if date_field => Check::DateInPast,
            "IS_DATE_IN_THE_FUTURE" if date_field => Check::DateInFuture,
            "IS_AGE_ABOVE" if date_field => {
                Check::AgeAbove(parse_years(limit.as_deref()).ok_or_else(invalid)?)
            }
            "IS_AGE_UNDER" if date_field => {
                Check::AgeUnder(parse_years(limit.as_deref()).ok_or_else(invalid)?)
            }
            _ => {
                return Err(BuildError::UnknownValidator {
                    slug: slug.to_string(),
                    kind: validation.kind.clone(),
                });
            }
        };

        let message = validation
            .message
            .clone()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| default_message(&check).to_string());
        Template::compile(&message).map_err(|source| BuildError::InvalidMessage {
            slug: slug.to_string(),
            source: Box::new(source),
        })?;

        Ok(Self {
            kind,
            check,
            limit,
            message,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Checks a cleaned, non-empty value.
    pub fn validate(&self, value: &Value) -> Result<(), FieldError> {
        let passed = match &self.check {
            Check::MinLength(min) => length_of(value).is_none_or(|len| len >= *min),
            Check::MaxLength(max) => length_of(value).is_none_or(|len| len <= *max),
            Check::Pattern(regex) => regex.is_match(&text_of(value)),
            Check::Compare(comparison, limit) => compare(value, limit)
                .map(|ordering| comparison.accepts(ordering))
                .unwrap_or(false),
            Check::DateInPast => date_of(value).is_some_and(|date| date < today()),
            Check::DateInFuture => date_of(value).is_some_and(|date| date > today()),
            Check::AgeAbove(years) => {
                date_of(value).is_some_and(|date| age_on(date, today()) >= *years)
            }
            Check::AgeUnder(years) => {
                date_of(value).is_some_and(|date| age_on(date, today()) < *years)
            }
        };

        if passed {
            Ok(())
        } else {
            Err(self.failure(value))
        }
    }

    fn failure(&self, value: &Value) -> FieldError {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        let data = json!({ "limit": self.limit, "value": text_of(value) });
        let message = registry
            .render_template(&self.message, &data)
            .unwrap_or_else(|_| self.message.clone());
        FieldError::new(self.kind.to_lowercase(), message)
    }
}

fn default_message(check: &Check) -> &'static str {
    match check {
        Check::MinLength(_) => "Ensure this value has at least {{limit}} characters.",
        Check::MaxLength(_) => "Ensure this value has at most {{limit}} characters.",
        Check::Pattern(_) => "Enter a valid value.",
        Check::Compare(Comparison::Gt, _) => "Ensure this value is greater than {{limit}}.",
        Check::Compare(Comparison::Gte, _) => {
            "Ensure this value is greater than or equal to {{limit}}."
        }
        Check::Compare(Comparison::Lt, _) => "Ensure this value is less than {{limit}}.",
        Check::Compare(Comparison::Lte, _) => {
            "Ensure this value is less than or equal to {{limit}}."
        }
        Check::Compare(Comparison::Eq, _) => "Ensure this value is equal to {{limit}}.",
        Check::Compare(Comparison::Neq, _) => "Ensure this value is not equal to {{limit}}.",
        Check::DateInPast => "Ensure this date is in the past.",
        Check::DateInFuture => "Ensure this date is in the future.",
        Check::AgeAbove(_) => "Ensure the age is at least {{limit}} years.",
        Check::AgeUnder(_) => "Ensure the age is under {{limit}} years.",
    }
}

fn limit_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_count(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse().ok()
}

fn parse_years(raw: Option<&str>) -> Option<i32> {
    raw?.trim().parse().ok().filter(|years: &i32| *years >= 0)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn date_of(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_date)
}

fn compare(value: &Value, limit: &Limit) -> Option<Ordering> {
    match limit {
        Limit::Number(limit) => {
            let number = match value {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => parse_number(text),
                _ => None,
            }?;
            number.partial_cmp(limit)
        }
        Limit::Date(limit) => date_of(value).map(|date| date.cmp(limit)),
        Limit::Text(limit) => Some(text_of(value).as_str().cmp(limit.as_str())),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn age_on(birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: &str, value: Option<Value>, message: Option<&str>) -> Validation {
        Validation {
            kind: kind.into(),
            value,
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn min_length_counts_characters() {
        let minlength = rule("MINLENGTH", Some(json!("3")), None);
        let validator = Validator::compile("name", &minlength, false).expect("compile");
        assert!(validator.validate(&json!("héé")).is_ok());
        let error = validator.validate(&json!("ab")).unwrap_err();
        assert_eq!(error.code, "minlength");
        assert_eq!(error.message, "Ensure this value has at least 3 characters.");
    }

    #[test]
    fn custom_message_renders_value_and_limit() {
        let validator = Validator::compile(
            "age",
            &rule("GTE", Some(json!(18)), Some("{{value}} is below {{limit}}")),
            false,
        )
        .expect("compile");
        assert!(validator.validate(&json!(21)).is_ok());
        assert_eq!(validator.validate(&json!(12)).unwrap_err().message, "12 is below 18");
    }

    #[test]
    fn regexp_searches_the_value() {
        let pattern = rule("REGEXP", Some(json!("^[A-Z]{3}$")), None);
        let validator = Validator::compile("code", &pattern, false).expect("compile");
        assert!(validator.validate(&json!("ABC")).is_ok());
        assert!(validator.validate(&json!("abc")).is_err());
    }

    #[test]
    fn invalid_pattern_is_a_build_error() {
        let pattern = rule("REGEXP", Some(json!("(")), None);
        let error = Validator::compile("code", &pattern, false).unwrap_err();
        assert!(matches!(error, BuildError::InvalidPattern { .. }));
    }

    #[test]
    fn non_numeric_limit_is_rejected() {
        let greater = rule("GT", Some(json!("many")), None);
        let error = Validator::compile("n", &greater, false).unwrap_err();
        assert!(matches!(error, BuildError::InvalidValidatorValue { .. }));
    }

    #[test]
    fn date_rules_require_a_date_field() {
        let past = rule("IS_DATE_IN_THE_PAST", None, None);
        let error = Validator::compile("d", &past, false).unwrap_err();
        assert!(matches!(error, BuildError::UnknownValidator { .. }));
        let validator = Validator::compile("d", &rule("IS_DATE_IN_THE_PAST", None, None), true)
            .expect("compile");
        assert!(validator.validate(&json!("1990-01-01")).is_ok());
        assert!(validator.validate(&json!("2999-01-01")).is_err());
    }

    #[test]
    fn date_comparisons_use_calendar_order() {
        let validator = Validator::compile("d", &rule("LT", Some(json!("2020-06-01")), None), true)
            .expect("compile");
        assert!(validator.validate(&json!("2020-05-31")).is_ok());
        assert!(validator.validate(&json!("2020-06-01")).is_err());
    }

    #[test]
    fn age_counts_full_years() {
        let birth = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2018, 6, 14).unwrap()), 17);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2018, 6, 15).unwrap()), 18);
    }

    #[test]
    fn eq_falls_back_to_text_comparison() {
        let validator = Validator::compile("s", &rule("NEQ", Some(json!("admin")), None), false)
            .expect("compile");
        assert!(validator.validate(&json!("guest")).is_ok());
        assert!(validator.validate(&json!("admin")).is_err());
    }
}
