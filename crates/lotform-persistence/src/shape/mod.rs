//! Key shape adapters.
//!
//! Each persisted key shape is an independent parse/emit pair. The
//! transcoder asks the adapters in precedence order; the first adapter that
//! claims a key decides its target, or rejects it as malformed.

mod canonical;
mod flat;
mod general;
mod underscore;

pub use canonical::CanonicalShape;
pub use flat::FlatShape;
pub use general::GeneralShape;
pub use underscore::UnderscoreShape;

use lotform_model::{ScopedKey, is_global_field};

/// Result of offering a key to an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeMatch {
    Matched(ScopedKey),
    /// The key is not in this adapter's shape.
    NotMine,
    /// The key is in this adapter's shape but cannot be decoded.
    Malformed(String),
}

/// One persisted key shape.
pub trait KeyShape: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, key: &str) -> ShapeMatch;

    /// Key for `target` in this shape, if the shape can express it.
    fn emit(&self, target: &ScopedKey) -> Option<String>;
}

/// All built-in shapes, highest precedence first.
pub fn builtin_shapes() -> Vec<Box<dyn KeyShape>> {
    vec![
        Box::new(CanonicalShape),
        Box::new(GeneralShape),
        Box::new(UnderscoreShape),
        Box::new(FlatShape),
    ]
}

/// Target for a field path read as belonging to `index`. Fixed global
/// fields stay global in every shape.
fn lot_target(index: usize, path: &str) -> ShapeMatch {
    if path.is_empty() {
        return ShapeMatch::Malformed("empty field path".to_string());
    }
    if is_global_field(path) {
        ShapeMatch::Matched(ScopedKey::global(path))
    } else {
        ShapeMatch::Matched(ScopedKey::lot(index, path))
    }
}

fn parse_index(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
