//! `lots.<N>.<path>` and `global.<path>`, plus the in-process
//! `lot:<N>:<path>` form.

use lotform_model::{LOT_KEY_PREFIX, ScopedKey};

use super::{KeyShape, ShapeMatch, lot_target, parse_index};

const LOTS_PREFIX: &str = "lots.";
const GLOBAL_PREFIX: &str = "global.";

#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalShape;

impl KeyShape for CanonicalShape {
    fn name(&self) -> &'static str {
        "canonical"
    }

    fn parse(&self, key: &str) -> ShapeMatch {
        if let Some(rest) = key.strip_prefix(LOTS_PREFIX) {
            let (index, path) = rest.split_once('.').unwrap_or((rest, ""));
            return match parse_index(index) {
                Some(index) => lot_target(index, path),
                None => ShapeMatch::Malformed(format!("invalid lot index '{index}'")),
            };
        }
        if let Some(path) = key.strip_prefix(GLOBAL_PREFIX) {
            if path.is_empty() {
                return ShapeMatch::Malformed("empty field path".to_string());
            }
            return ShapeMatch::Matched(ScopedKey::global(path));
        }
        if key.starts_with(LOT_KEY_PREFIX) {
            return match key.parse::<ScopedKey>() {
                Ok(scoped) => ShapeMatch::Matched(scoped),
                Err(error) => ShapeMatch::Malformed(error.to_string()),
            };
        }
        ShapeMatch::NotMine
    }

    fn emit(&self, target: &ScopedKey) -> Option<String> {
        Some(match target {
            ScopedKey::Lot { index, path } => format!("{LOTS_PREFIX}{index}.{path}"),
            ScopedKey::Global(path) => format!("{GLOBAL_PREFIX}{path}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_keys() {
        let shape = CanonicalShape;
        assert_eq!(
            shape.parse("lots.2.clientInfo.name"),
            ShapeMatch::Matched(ScopedKey::lot(2, "clientInfo.name"))
        );
        assert_eq!(
            shape.parse("global.note"),
            ShapeMatch::Matched(ScopedKey::global("note"))
        );
        assert_eq!(
            shape.parse("lot:1:title"),
            ShapeMatch::Matched(ScopedKey::lot(1, "title"))
        );
        assert_eq!(
            shape.parse("lots.0.current_step"),
            ShapeMatch::Matched(ScopedKey::global("current_step"))
        );
        assert_eq!(shape.parse("title"), ShapeMatch::NotMine);
        assert!(matches!(shape.parse("lots.x.title"), ShapeMatch::Malformed(_)));
        assert!(matches!(shape.parse("lots.3"), ShapeMatch::Malformed(_)));
        assert!(matches!(shape.parse("global."), ShapeMatch::Malformed(_)));
    }

    #[test]
    fn emits_canonical_keys() {
        let shape = CanonicalShape;
        assert_eq!(
            shape.emit(&ScopedKey::lot(1, "a.b")).as_deref(),
            Some("lots.1.a.b")
        );
        assert_eq!(
            shape.emit(&ScopedKey::global("schema_ref")).as_deref(),
            Some("global.schema_ref")
        );
    }
}
