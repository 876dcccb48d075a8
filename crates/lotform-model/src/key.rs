//! Scoped keys and the resolver that produces them.
//!
//! Every lot-scoped value lives under `lot:<index>:<fieldPath>`. A fixed,
//! closed set of global fields is stored under its bare path.

use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Prefix shared by every lot-scoped key.
pub const LOT_KEY_PREFIX: &str = "lot:";

/// Reference to the schema the form was authored against.
pub const SCHEMA_REF: &str = "schema_ref";
/// Active wizard step pointer.
pub const CURRENT_STEP: &str = "current_step";
/// The lot registry itself.
pub const LOT_REGISTRY: &str = "lots";
/// Current-lot pointer.
pub const CURRENT_LOT: &str = "current_lot";
/// Mode used by the last step validation.
pub const VALIDATION_MODE: &str = "validation_mode";

/// The closed set of global fields. These are never lot-scoped.
pub const GLOBAL_FIELDS: [&str; 5] = [
    SCHEMA_REF,
    CURRENT_STEP,
    LOT_REGISTRY,
    CURRENT_LOT,
    VALIDATION_MODE,
];

/// Returns true if `path` names one of the fixed global fields.
pub fn is_global_field(path: &str) -> bool {
    GLOBAL_FIELDS.contains(&path)
}

/// Key prefix for every value scoped to `index`.
pub fn lot_prefix(index: usize) -> String {
    format!("{LOT_KEY_PREFIX}{index}:")
}

/// A fully-qualified identifier for a field value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopedKey {
    /// Stored under the bare field path.
    Global(String),
    /// Stored under `lot:<index>:<path>`.
    Lot { index: usize, path: String },
}

impl ScopedKey {
    pub fn global(path: impl Into<String>) -> Self {
        Self::Global(path.into())
    }

    pub fn lot(index: usize, path: impl Into<String>) -> Self {
        Self::Lot {
            index,
            path: path.into(),
        }
    }

    /// The unscoped field path.
    pub fn path(&self) -> &str {
        match self {
            Self::Global(path) | Self::Lot { path, .. } => path,
        }
    }

    /// The owning lot, or `None` for global keys.
    pub fn lot_index(&self) -> Option<usize> {
        match self {
            Self::Global(_) => None,
            Self::Lot { index, .. } => Some(*index),
        }
    }

    /// Same field, rescoped to another lot. Global keys are returned unchanged.
    pub fn with_lot(&self, index: usize) -> Self {
        match self {
            Self::Global(path) => Self::Global(path.clone()),
            Self::Lot { path, .. } => Self::lot(index, path.clone()),
        }
    }

    /// Render the backend key.
    pub fn to_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global(path) => f.write_str(path),
            Self::Lot { index, path } => write!(f, "{LOT_KEY_PREFIX}{index}:{path}"),
        }
    }
}

impl FromStr for ScopedKey {
    type Err = ModelError;

    /// Parse a backend key. Keys without the lot prefix are global; keys with
    /// the prefix must carry a numeric index and a non-empty path.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let Some(rest) = raw.strip_prefix(LOT_KEY_PREFIX) else {
            if raw.is_empty() {
                return Err(ModelError::InvalidScopedKey(raw.to_string()));
            }
            return Ok(Self::Global(raw.to_string()));
        };
        let (index, path) = rest
            .split_once(':')
            .ok_or_else(|| ModelError::InvalidScopedKey(raw.to_string()))?;
        let index: usize = index
            .parse()
            .map_err(|_| ModelError::InvalidScopedKey(raw.to_string()))?;
        if path.is_empty() {
            return Err(ModelError::InvalidScopedKey(raw.to_string()));
        }
        Ok(Self::lot(index, path))
    }
}

/// Maps field paths to scoped keys for one lot.
///
/// The resolver carries its own lot index so call sites never pass an
/// assumed index; build a fresh resolver from the registry pointer instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyResolver {
    lot_index: usize,
}

impl KeyResolver {
    pub fn new(lot_index: usize) -> Self {
        Self { lot_index }
    }

    pub fn lot_index(&self) -> usize {
        self.lot_index
    }

    /// Resolve `path` for this resolver's lot.
    pub fn resolve(&self, path: &str) -> ScopedKey {
        self.resolve_with(path, false)
    }

    /// Resolve `path`, bypassing lot scoping when `force_global` is set.
    pub fn resolve_with(&self, path: &str, force_global: bool) -> ScopedKey {
        if force_global || is_global_field(path) {
            ScopedKey::global(path)
        } else {
            ScopedKey::lot(self.lot_index, path)
        }
    }
}
