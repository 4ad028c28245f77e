#![allow(missing_docs)]

pub mod cohesion;
pub mod condition;
pub mod config;
pub mod declared;
pub mod describe;
pub mod error;
pub mod factory;
pub mod field;
pub mod form;
pub mod generator;
pub mod spec;
pub mod validators;

pub use cohesion::{CohesionIssue, check_cohesion};
pub use condition::{
    CleanedData, Condition, ConditionAction, ConditionRegistry, ConditionSet, ConditionTest,
    DisplayIff, HideIff,
};
pub use config::{EngineConfig, UnknownFieldTypePolicy};
pub use declared::{DeclaredForm, clean_stored};
pub use describe::describe;
pub use error::{BuildError, ConditionEvaluationError, FieldError};
pub use factory::{AccessContext, FieldFactory, Produced, SkipReason};
pub use field::{FieldKind, FieldSpec, RenderHint};
pub use form::{DynamicForm, FormDefinition, FormErrors, ValidationReport};
pub use generator::{FormGenerator, build_for_role, build_from_schema};
pub use spec::{
    Access, AccessLevel, ConditionSpec, ConditionTestSpec, FieldDefinition, FormSchema, Item,
    Operator, StoredForm, Validation,
};
pub use validators::Validator;
