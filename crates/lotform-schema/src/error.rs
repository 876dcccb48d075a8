#![deny(unsafe_code)]

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to parse schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid schema at '{path}': {message}")]
    InvalidSchema { path: String, message: String },

    #[error("unknown field type '{kind}' at '{path}'")]
    UnknownFieldKind { path: String, kind: String },

    #[error("invalid render condition at '{path}': {source}")]
    InvalidCondition {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
