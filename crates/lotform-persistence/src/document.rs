//! Document metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current document format version.
///
/// Increment this when making breaking changes to the document layout.
/// Decoding rejects documents with a newer version.
pub const FORMAT_VERSION: u32 = 1;

/// Reserved document key holding [`DocumentMeta`].
pub const META_KEY: &str = "_meta";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub format_version: u32,
    /// RFC 3339 export timestamp.
    pub exported_at: String,
}

impl DocumentMeta {
    pub fn new(exported_at: DateTime<Utc>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            exported_at: exported_at.to_rfc3339(),
        }
    }

    /// Parse the export timestamp.
    pub fn exported_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.exported_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
