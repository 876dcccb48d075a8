//! Persistence error types.
//!
//! Document decoding returns structured errors that provide user-friendly
//! messages and optional remediation hints. Individual malformed keys are
//! not errors; they are skipped and reported alongside the decoded snapshot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The text is not valid JSON.
    #[error("Failed to parse form document")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON, but not a form document.
    #[error("Invalid form document: {reason}")]
    InvalidFormat { reason: String },

    /// Document written by a newer format version.
    #[error("Form document version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion { found: u32, max_supported: u32 },

    /// The snapshot could not be serialized.
    #[error("Failed to serialize form document")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Json { source } => {
                format!(
                    "The saved form could not be read (line {}, column {}).",
                    source.line(),
                    source.column()
                )
            }
            Self::InvalidFormat { reason } => {
                format!("The saved data is not a form document: {reason}")
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
            } => {
                format!(
                    "This form was saved by a newer version \
                    (document version {found}, this version supports up to {max_supported})."
                )
            }
            Self::Serialization { .. } => "An error occurred while saving the form.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Json { .. } => Some("Restore the form from a backup if one exists.".into()),
            Self::InvalidFormat { .. } => {
                Some("Make sure the data was exported from a form session.".into())
            }
            Self::UnsupportedVersion { .. } => {
                Some("Update the application before opening this form.".into())
            }
            Self::Serialization { .. } => None,
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
