//! The serializable form snapshot.
//!
//! A snapshot is the public contract between the state store and everything
//! at the system boundary: the requirement engine reads it, the transcoder
//! encodes it, and hosts persist it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::{CURRENT_LOT, is_global_field};
use crate::lot::Lot;
use crate::value::lookup_dotted;

/// One lot with all of its field values, keyed by unscoped field path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotSnapshot {
    pub name: String,
    pub index: usize,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl LotSnapshot {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            data: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, path: impl Into<String>, value: Value) -> Self {
        self.data.insert(path.into(), value);
        self
    }

    pub fn descriptor(&self) -> Lot {
        Lot::new(self.name.clone(), self.index)
    }
}

/// Every lot plus the global fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub lots: Vec<LotSnapshot>,
    #[serde(default)]
    pub global: BTreeMap<String, Value>,
}

impl FormSnapshot {
    pub fn lot_count(&self) -> usize {
        self.lots.len()
    }

    pub fn lot(&self, index: usize) -> Option<&LotSnapshot> {
        self.lots.iter().find(|lot| lot.index == index)
    }

    /// The recorded current-lot pointer, or 0 when absent or out of range.
    pub fn current_lot(&self) -> usize {
        self.global
            .get(CURRENT_LOT)
            .and_then(Value::as_u64)
            .and_then(|index| usize::try_from(index).ok())
            .filter(|index| self.lot(*index).is_some())
            .unwrap_or(0)
    }

    /// Value of `path` as seen from `lot`.
    ///
    /// Global fields read the global map. Lot fields read the lot's data and
    /// fall back to a force-global entry with the same path.
    pub fn value(&self, lot: usize, path: &str) -> Option<&Value> {
        if is_global_field(path) {
            return self.global.get(path);
        }
        self.lot(lot)
            .and_then(|snapshot| lookup_dotted(&snapshot.data, path))
            .or_else(|| lookup_dotted(&self.global, path))
    }

    /// Names of all lots in index order.
    pub fn lot_names(&self) -> Vec<&str> {
        self.lots.iter().map(|lot| lot.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FormSnapshot {
        let mut snapshot = FormSnapshot {
            lots: vec![
                LotSnapshot::new("General", 0).with_value("title", json!("main")),
                LotSnapshot::new("A", 1).with_value("title", json!("a")),
            ],
            global: BTreeMap::new(),
        };
        snapshot.global.insert(CURRENT_LOT.to_string(), json!(1));
        snapshot.global.insert("shared".to_string(), json!(true));
        snapshot
    }

    #[test]
    fn value_reads_lot_then_global() {
        let snapshot = sample();
        assert_eq!(snapshot.value(1, "title"), Some(&json!("a")));
        assert_eq!(snapshot.value(0, "title"), Some(&json!("main")));
        assert_eq!(snapshot.value(1, "shared"), Some(&json!(true)));
        assert_eq!(snapshot.value(1, CURRENT_LOT), Some(&json!(1)));
        assert_eq!(snapshot.value(7, "title"), None);
    }

    #[test]
    fn current_lot_falls_back_to_zero() {
        let mut snapshot = sample();
        assert_eq!(snapshot.current_lot(), 1);
        snapshot.global.insert(CURRENT_LOT.to_string(), json!(9));
        assert_eq!(snapshot.current_lot(), 0);
    }

    #[test]
    fn serializes_with_public_shape() {
        let json = serde_json::to_value(sample()).expect("serialize snapshot");
        assert_eq!(json["lots"][1]["name"], json!("A"));
        assert_eq!(json["lots"][1]["data"]["title"], json!("a"));
        assert_eq!(json["global"]["shared"], json!(true));
    }
}
