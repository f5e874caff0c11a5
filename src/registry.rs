// src/registry.rs

//! The Structure Registry: an in-memory, read-through cache in front of the
//! Schema Manager's database reads, keyed by both integer id and string
//! name. The registry never talks to the database itself — callers look up
//! a record here first, and on a miss fetch it from storage and `put` it
//! back in.

use std::cell::RefCell;
use std::collections::HashMap;

/// Anything storable in a [`Registry`] has a stable integer id and a unique
/// name, the shape every structural entity (datatype, class, attribute,
/// reference) shares.
pub trait Identified: Clone {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

pub struct Registry<T: Identified> {
    by_id: RefCell<HashMap<i64, T>>,
    by_name: RefCell<HashMap<String, T>>,
}

impl<T: Identified> Default for Registry<T> {
    fn default() -> Self {
        Self {
            by_id: RefCell::new(HashMap::new()),
            by_name: RefCell::new(HashMap::new()),
        }
    }
}

impl<T: Identified> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, record: T) {
        self.by_name.borrow_mut().insert(record.name().to_string(), record.clone());
        self.by_id.borrow_mut().insert(record.id(), record);
    }

    pub fn get_by_id(&self, id: i64) -> Option<T> {
        self.by_id.borrow().get(&id).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<T> {
        self.by_name.borrow().get(name).cloned()
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.by_id.borrow().contains_key(&id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.borrow().contains_key(name)
    }

    /// Drops every cached record. The next lookup will miss and the caller
    /// is expected to re-fetch from storage.
    pub fn clear(&self) {
        self.by_id.borrow_mut().clear();
        self.by_name.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Thing {
        id: i64,
        name: String,
    }

    impl Identified for Thing {
        fn id(&self) -> i64 {
            self.id
        }
        fn name(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn put_then_lookup_by_either_key() {
        let registry = Registry::new();
        registry.put(Thing { id: 1, name: "a".into() });

        assert!(registry.get_by_id(1).is_some());
        assert!(registry.get_by_name("a").is_some());
        assert!(registry.get_by_id(2).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let registry = Registry::new();
        registry.put(Thing { id: 1, name: "a".into() });
        registry.clear();
        assert!(!registry.contains_id(1));
        assert!(!registry.contains_name("a"));
    }
}
