//! Read-only form schema support.
//!
//! - `schema` flattens the nested schema into typed field specs
//! - `condition` evaluates `render_if*` conditions against current values
//! - `rules` derives requirement rules from the schema

mod condition;
mod error;
mod rules;
mod schema;

pub use condition::{Condition, FieldSource, LotView, Predicate, Visibility};
pub use error::{Result, SchemaError};
pub use rules::{RequirementRule, RuleGenerator};
pub use schema::{FieldSpec, FormSchema};
