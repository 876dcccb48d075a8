use serde::{Deserialize, Serialize};

/// A named, indexed sub-entity of a form instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub name: String,
    pub index: usize,
}

impl Lot {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}
