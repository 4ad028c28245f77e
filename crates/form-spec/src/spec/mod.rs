pub mod condition;
pub mod field;
pub mod form;

pub use condition::{ConditionSpec, ConditionTestSpec, Operator};
pub use field::{Access, AccessLevel, FieldDefinition, Item, Validation};
pub use form::{FormSchema, StoredForm};
