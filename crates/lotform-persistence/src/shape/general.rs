//! `general.<path>`: single-lot forms stored everything under `general`.

use lotform_model::ScopedKey;

use super::{KeyShape, ShapeMatch, lot_target};

const PREFIX: &str = "general.";

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralShape;

impl KeyShape for GeneralShape {
    fn name(&self) -> &'static str {
        "general"
    }

    fn parse(&self, key: &str) -> ShapeMatch {
        match key.strip_prefix(PREFIX) {
            Some(path) => lot_target(0, path),
            None => ShapeMatch::NotMine,
        }
    }

    fn emit(&self, target: &ScopedKey) -> Option<String> {
        match target {
            ScopedKey::Lot { index: 0, path } => Some(format!("{PREFIX}{path}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_lot_zero() {
        assert_eq!(
            GeneralShape.parse("general.clientInfo.name"),
            ShapeMatch::Matched(ScopedKey::lot(0, "clientInfo.name"))
        );
        assert_eq!(GeneralShape.parse("generalInfo"), ShapeMatch::NotMine);
        assert!(matches!(GeneralShape.parse("general."), ShapeMatch::Malformed(_)));
        assert_eq!(GeneralShape.emit(&ScopedKey::lot(1, "x")), None);
    }
}
