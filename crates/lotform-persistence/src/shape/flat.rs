//! Bare `<path>` keys from forms that predate lots. Everything lands in
//! lot 0 except the fixed global fields.

use lotform_model::ScopedKey;

use super::{KeyShape, ShapeMatch, lot_target};

#[derive(Debug, Clone, Copy, Default)]
pub struct FlatShape;

impl KeyShape for FlatShape {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn parse(&self, key: &str) -> ShapeMatch {
        lot_target(0, key)
    }

    fn emit(&self, target: &ScopedKey) -> Option<String> {
        match target {
            ScopedKey::Lot { index: 0, path } | ScopedKey::Global(path) => Some(path.clone()),
            ScopedKey::Lot { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_keys_go_to_lot_zero_or_global() {
        assert_eq!(
            FlatShape.parse("clientInfo.name"),
            ShapeMatch::Matched(ScopedKey::lot(0, "clientInfo.name"))
        );
        assert_eq!(
            FlatShape.parse("current_step"),
            ShapeMatch::Matched(ScopedKey::global("current_step"))
        );
        assert!(matches!(FlatShape.parse(""), ShapeMatch::Malformed(_)));
    }
}
