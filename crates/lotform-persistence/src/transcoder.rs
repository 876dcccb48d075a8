//! Conversion between snapshots and flat key/value documents.
//!
//! Documents are JSON objects. Encoding always writes the canonical shape:
//!
//! ```text
//! _meta              {format_version, exported_at}
//! lots               [{name, index}, ...]
//! lots.<N>.<path>    lot-scoped values
//! global.<path>      global values
//! ```
//!
//! Decoding also accepts `general.<path>`, `lot_<N>.<path>` and bare
//! `<path>` keys. When several keys decode to the same field, the shape with
//! the higher precedence wins regardless of key order. Lot indices are
//! compacted to `0..n` in ascending order, so a sparse or huge index costs
//! one lot, not one per gap.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lotform_model::{
    CURRENT_LOT, EngineOptions, FormSnapshot, LOT_REGISTRY, Lot, LotSnapshot, ScopedKey, Value,
};
use serde_json::Map;
use tracing::{debug, info, warn};

use crate::document::{DocumentMeta, FORMAT_VERSION, META_KEY};
use crate::error::{PersistenceError, Result};
use crate::shape::{CanonicalShape, KeyShape, ShapeMatch, builtin_shapes};

/// A key the decoder could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedKey {
    pub key: String,
    pub reason: String,
}

/// Result of decoding a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub snapshot: FormSnapshot,
    /// `None` for legacy blobs written before documents carried metadata.
    pub meta: Option<DocumentMeta>,
    pub skipped: Vec<SkippedKey>,
}

impl Decoded {
    pub fn is_legacy(&self) -> bool {
        self.meta.is_none()
    }
}

pub struct LegacyTranscoder {
    shapes: Vec<Box<dyn KeyShape>>,
    options: EngineOptions,
}

impl Default for LegacyTranscoder {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl LegacyTranscoder {
    /// Transcoder with every built-in shape.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            shapes: builtin_shapes(),
            options,
        }
    }

    /// Register an extra shape with the lowest precedence.
    pub fn with_shape(mut self, shape: Box<dyn KeyShape>) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn shape_names(&self) -> Vec<&'static str> {
        self.shapes.iter().map(|shape| shape.name()).collect()
    }

    /// Encode `snapshot` in the canonical shape, stamped with the current time.
    pub fn encode(&self, snapshot: &FormSnapshot) -> Map<String, Value> {
        self.encode_at(snapshot, Utc::now())
    }

    pub fn encode_at(&self, snapshot: &FormSnapshot, exported_at: DateTime<Utc>) -> Map<String, Value> {
        let shape = CanonicalShape;
        let mut document = Map::new();
        document.insert(
            META_KEY.to_string(),
            serde_json::json!(DocumentMeta::new(exported_at)),
        );

        let mut lots: Vec<&LotSnapshot> = snapshot.lots.iter().collect();
        lots.sort_by_key(|lot| lot.index);
        document.insert(
            LOT_REGISTRY.to_string(),
            Value::Array(
                lots.iter()
                    .map(|lot| serde_json::json!({"name": lot.name, "index": lot.index}))
                    .collect(),
            ),
        );
        for lot in &lots {
            for (path, value) in &lot.data {
                if let Some(key) = shape.emit(&ScopedKey::lot(lot.index, path.clone())) {
                    document.insert(key, value.clone());
                }
            }
        }
        for (path, value) in &snapshot.global {
            if path == LOT_REGISTRY {
                continue;
            }
            if let Some(key) = shape.emit(&ScopedKey::global(path.clone())) {
                document.insert(key, value.clone());
            }
        }
        info!(lots = lots.len(), keys = document.len(), "encoded form document");
        document
    }

    /// Encode as pretty-printed JSON text.
    pub fn encode_string(&self, snapshot: &FormSnapshot) -> Result<String> {
        serde_json::to_string_pretty(&Value::Object(self.encode(snapshot)))
            .map_err(|source| PersistenceError::Serialization { source })
    }

    /// Decode JSON text.
    pub fn decode_str(&self, text: &str) -> Result<Decoded> {
        let value: Value =
            serde_json::from_str(text).map_err(|source| PersistenceError::Json { source })?;
        match value {
            Value::Object(document) => self.decode(&document),
            other => Err(PersistenceError::invalid(format!(
                "expected a JSON object, found {}",
                json_type(&other)
            ))),
        }
    }

    /// Decode a canonical document or a legacy blob.
    ///
    /// Malformed keys are skipped with a warning; only a bad `_meta` entry or
    /// an unsupported format version fails the whole document.
    pub fn decode(&self, document: &Map<String, Value>) -> Result<Decoded> {
        let meta = match document.get(META_KEY) {
            None => None,
            Some(raw) => {
                let meta: DocumentMeta = serde_json::from_value(raw.clone()).map_err(|e| {
                    PersistenceError::invalid(format!("malformed '{META_KEY}' entry: {e}"))
                })?;
                if meta.format_version > FORMAT_VERSION {
                    return Err(PersistenceError::UnsupportedVersion {
                        found: meta.format_version,
                        max_supported: FORMAT_VERSION,
                    });
                }
                Some(meta)
            }
        };

        let mut skipped = Vec::new();
        // Target -> (shape rank, value). Lower rank wins.
        let mut resolved: BTreeMap<ScopedKey, (usize, &Value)> = BTreeMap::new();
        for (key, value) in document {
            if key == META_KEY {
                continue;
            }
            match self.classify(key) {
                Ok((rank, target)) => {
                    let replace = resolved
                        .get(&target)
                        .is_none_or(|(existing, _)| rank < *existing);
                    if replace {
                        resolved.insert(target, (rank, value));
                    }
                }
                Err(reason) => {
                    warn!(key = %key, reason = %reason, "skipping unreadable document key");
                    skipped.push(SkippedKey {
                        key: key.clone(),
                        reason,
                    });
                }
            }
        }

        let mut registry: Vec<Lot> = Vec::new();
        let mut data: BTreeMap<usize, BTreeMap<String, Value>> = BTreeMap::new();
        let mut global = BTreeMap::new();
        for (target, (_, value)) in resolved {
            match target {
                ScopedKey::Global(path) if path == LOT_REGISTRY => {
                    match serde_json::from_value::<Vec<Lot>>(value.clone()) {
                        Ok(lots) => registry = lots,
                        Err(e) => {
                            warn!(error = %e, "skipping malformed lot registry");
                            skipped.push(SkippedKey {
                                key: LOT_REGISTRY.to_string(),
                                reason: format!("malformed lot registry: {e}"),
                            });
                        }
                    }
                }
                ScopedKey::Global(path) => {
                    global.insert(path, value.clone());
                }
                ScopedKey::Lot { index, path } => {
                    data.entry(index).or_default().insert(path, value.clone());
                }
            }
        }

        let (lots, positions) = self.assemble_lots(registry, data);
        remap_current_lot(&mut global, &positions);
        let snapshot = FormSnapshot { lots, global };
        debug!(
            lots = snapshot.lots.len(),
            skipped = skipped.len(),
            legacy = meta.is_none(),
            "decoded form document"
        );
        Ok(Decoded {
            snapshot,
            meta,
            skipped,
        })
    }

    fn classify(&self, key: &str) -> std::result::Result<(usize, ScopedKey), String> {
        for (rank, shape) in self.shapes.iter().enumerate() {
            match shape.parse(key) {
                ShapeMatch::Matched(target) => return Ok((rank, target)),
                ShapeMatch::Malformed(reason) => {
                    return Err(format!("{} shape: {reason}", shape.name()));
                }
                ShapeMatch::NotMine => {}
            }
        }
        Err("no shape accepts this key".to_string())
    }

    /// Lots from registry descriptors, with descriptors synthesized for any
    /// index that only appears in the data. Sparse indices are compacted to
    /// 0.. in ascending order; the returned map gives each old index its
    /// new position.
    fn assemble_lots(
        &self,
        registry: Vec<Lot>,
        mut data: BTreeMap<usize, BTreeMap<String, Value>>,
    ) -> (Vec<LotSnapshot>, BTreeMap<usize, usize>) {
        let mut names: BTreeMap<usize, String> = registry
            .into_iter()
            .map(|lot| (lot.index, lot.name))
            .collect();
        let mut indices: Vec<usize> = names.keys().chain(data.keys()).copied().collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            indices.push(0);
        }

        let mut positions = BTreeMap::new();
        let lots = indices
            .into_iter()
            .enumerate()
            .map(|(position, index)| {
                positions.insert(index, position);
                let name = names.remove(&index).unwrap_or_else(|| {
                    if position == 0 {
                        self.options.default_lot_name.clone()
                    } else {
                        self.options.auto_lot_name(position + 1)
                    }
                });
                LotSnapshot {
                    name,
                    index: position,
                    data: data.remove(&index).unwrap_or_default(),
                }
            })
            .collect();
        (lots, positions)
    }
}

/// Point a recorded `current_lot` at its compacted position, dropping it
/// when it names no decoded lot.
fn remap_current_lot(global: &mut BTreeMap<String, Value>, positions: &BTreeMap<usize, usize>) {
    let Some(recorded) = global.remove(CURRENT_LOT) else {
        return;
    };
    let position = recorded
        .as_u64()
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| positions.get(&index));
    match position {
        Some(position) => {
            global.insert(CURRENT_LOT.to_string(), Value::from(*position));
        }
        None => warn!(current_lot = %recorded, "dropping current lot pointer with no matching lot"),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
