use thiserror::Error;

/// Fatal configuration errors raised while building a form.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("field '{slug}' has unknown type '{type_id}'")]
    UnknownFieldType { slug: String, type_id: String },
    #[error("field '{slug}' uses unknown validation '{kind}'")]
    UnknownValidator { slug: String, kind: String },
    #[error("field '{slug}': validation '{kind}' has an invalid value")]
    InvalidValidatorValue { slug: String, kind: String },
    #[error("field '{slug}': invalid pattern")]
    InvalidPattern {
        slug: String,
        #[source]
        source: regex::Error,
    },
    #[error("field '{slug}': invalid message template")]
    InvalidMessage {
        slug: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },
    #[error("field slug '{0}' is defined more than once")]
    DuplicateSlug(String),
    #[error("condition '{condition}' uses unknown action '{action}'")]
    UnknownAction { condition: String, action: String },
    #[error("condition '{0}' must define at least one target field and one test")]
    EmptyCondition(String),
    #[error("condition '{condition}' is using undefined fields ({})", .slugs.join(", "))]
    UndefinedFieldReference {
        condition: String,
        slugs: Vec<String>,
    },
    #[error("label is required on creation mode")]
    MissingLabel,
}

/// Non-fatal failure of one condition test; the test counts as false.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionEvaluationError {
    #[error("trigger field '{0}' has no cleaned value")]
    MissingTrigger(String),
}

/// Validation failure of a single field value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn required() -> Self {
        Self::new("required", "This field is required.")
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new("invalid", message)
    }
}
