//! `lot_<N>.<path>`: the underscore-indexed legacy shape. Indices are
//! 0-based, like the canonical shape.

use lotform_model::ScopedKey;

use super::{KeyShape, ShapeMatch, lot_target, parse_index};

const PREFIX: &str = "lot_";

#[derive(Debug, Clone, Copy, Default)]
pub struct UnderscoreShape;

impl KeyShape for UnderscoreShape {
    fn name(&self) -> &'static str {
        "underscore"
    }

    fn parse(&self, key: &str) -> ShapeMatch {
        let Some(rest) = key.strip_prefix(PREFIX) else {
            return ShapeMatch::NotMine;
        };
        let (head, path) = rest.split_once('.').unwrap_or((rest, ""));
        if head.is_empty() || !head.bytes().all(|b| b.is_ascii_digit()) {
            // A plain field that happens to start with `lot_`.
            return ShapeMatch::NotMine;
        }
        match parse_index(head) {
            Some(index) => lot_target(index, path),
            None => ShapeMatch::Malformed(format!("lot index '{head}' is out of range")),
        }
    }

    fn emit(&self, target: &ScopedKey) -> Option<String> {
        match target {
            ScopedKey::Lot { index, path } => Some(format!("{PREFIX}{index}.{path}")),
            ScopedKey::Global(_) => None,
        }
    }
}
