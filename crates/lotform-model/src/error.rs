use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to parse engine options: {0}")]
    Options(#[from] toml::de::Error),
    #[error("invalid scoped key: {0}")]
    InvalidScopedKey(String),
    #[error("unknown field kind: {0}")]
    UnknownFieldKind(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
