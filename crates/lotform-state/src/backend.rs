//! The store port and its in-process implementations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use lotform_model::Value;

/// Narrow key/value interface the state store is built on.
///
/// Any in-memory map, request-scoped context or session store can implement
/// it. Values are returned by copy so shared backends can hand them out
/// without holding a borrow.
pub trait StorePort {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    /// Returns true if the key was present.
    fn delete(&mut self, key: &str) -> bool;
    fn contains(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
}

/// Ordered in-memory backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

/// One backend shared by several store handles.
pub type SharedStore = Rc<RefCell<MemoryStore>>;

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }
}

impl FromIterator<(String, Value)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl StorePort for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

impl<S: StorePort> StorePort for Rc<RefCell<S>> {
    fn get(&self, key: &str) -> Option<Value> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.borrow_mut().set(key, value);
    }

    fn delete(&mut self, key: &str) -> bool {
        self.borrow_mut().delete(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.borrow().contains(key)
    }

    fn keys(&self) -> Vec<String> {
        self.borrow().keys()
    }
}
