//! Configuration options for the form engine.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options controlling lot naming, step classification and message layout.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Name of the lot synthesized for a fresh store.
    pub default_lot_name: String,

    /// Template for auto-named lots. `{n}` is replaced with the new lot count.
    pub lot_name_template: String,

    /// Field-path prefixes whose steps are authored once and validated
    /// across every lot.
    pub pre_entity_prefixes: Vec<String>,

    /// Layout of a per-lot error. `{lot}` and `{message}` are replaced.
    pub lot_error_format: String,

    /// Suffix appended to the label of a currently-required field.
    pub required_marker: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_lot_name: "General".to_string(),
            lot_name_template: "Lot {n}".to_string(),
            pre_entity_prefixes: vec![
                "clientInfo".to_string(),
                "legalBasis".to_string(),
                "submissionProcedure".to_string(),
            ],
            lot_error_format: "{lot}: {message}".to_string(),
            required_marker: " *".to_string(),
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_default_lot_name(mut self, name: impl Into<String>) -> Self {
        self.default_lot_name = name.into();
        self
    }

    pub fn with_pre_entity_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_entity_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Name for a lot created when `count` lots would exist afterwards.
    pub fn auto_lot_name(&self, count: usize) -> String {
        self.lot_name_template.replace("{n}", &count.to_string())
    }

    /// Returns true if `path` belongs to a pre-entity section.
    pub fn is_pre_entity(&self, path: &str) -> bool {
        self.pre_entity_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Label an error with the lot it was found in.
    pub fn format_lot_error(&self, lot: &str, message: &str) -> String {
        self.lot_error_format
            .replace("{lot}", lot)
            .replace("{message}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.default_lot_name, "General");
        assert_eq!(options.auto_lot_name(2), "Lot 2");
        assert_eq!(options.format_lot_error("A", "Name is required"), "A: Name is required");
    }

    #[test]
    fn pre_entity_prefix_matching() {
        let options = EngineOptions::default();
        assert!(options.is_pre_entity("clientInfo"));
        assert!(options.is_pre_entity("clientInfo.singleClientName"));
        assert!(!options.is_pre_entity("clientInfoExtra"));
        assert!(!options.is_pre_entity("lotDetails.volume"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = EngineOptions::from_toml_str(
            r#"
default_lot_name = "Main"
pre_entity_prefixes = ["buyer"]
"#,
        )
        .expect("parse options");
        assert_eq!(options.default_lot_name, "Main");
        assert_eq!(options.pre_entity_prefixes, vec!["buyer".to_string()]);
        assert_eq!(options.lot_name_template, "Lot {n}");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(EngineOptions::from_toml_str("default_lot_name = [").is_err());
    }
}
