//! Requirement recomputation and step validation.
//!
//! - `engine` rebuilds the required-field map from a snapshot
//! - `checks` holds the per-field checks
//! - `orchestrator` decides between current-lot and all-lot validation
//! - `labels` formats field labels with the required marker

pub mod checks;
mod engine;
mod issue;
mod labels;
mod orchestrator;

pub use engine::{DynamicRequirementEngine, is_required};
pub use issue::Issue;
pub use labels::format_label;
pub use orchestrator::{StepValidation, ValidationMode, ValidationOrchestrator};
