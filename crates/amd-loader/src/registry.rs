// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module registry

use crate::module::Module;
use crate::path::index_of;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::rc::Rc;

/// Ordered snapshot of registered modules
pub type Entries = IndexMap<String, Rc<Module>, FxBuildHasher>;

/// Mapping from module identifier to module record.
///
/// Single-threaded: borrows never outlive a method call, so callbacks that
/// run while a module is being required can freely define or unsee modules.
#[derive(Default)]
pub struct Registry {
    entries: RefCell<Entries>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a module by its exact identifier
    pub fn get(&self, id: &str) -> Option<Rc<Module>> {
        self.entries.borrow().get(id).cloned()
    }

    /// Get a module by identifier, falling back to `{id}/index`.
    ///
    /// Returns the key the module is registered under alongside it.
    pub fn lookup(&self, id: &str) -> Option<(String, Rc<Module>)> {
        let entries = self.entries.borrow();
        if let Some(module) = entries.get(id) {
            return Some((id.to_string(), Rc::clone(module)));
        }
        let index = index_of(id);
        entries
            .get(&index)
            .map(|module| (index.clone(), Rc::clone(module)))
    }

    /// Check if a module is registered as `id` or `{id}/index`
    pub fn has(&self, id: &str) -> bool {
        let entries = self.entries.borrow();
        entries.contains_key(id) || entries.contains_key(&index_of(id))
    }

    /// Insert or overwrite a module
    pub fn set(&self, id: impl Into<String>, module: Rc<Module>) -> Option<Rc<Module>> {
        self.entries.borrow_mut().insert(id.into(), module)
    }

    /// Remove a module
    pub fn delete(&self, id: &str) -> Option<Rc<Module>> {
        self.entries.borrow_mut().shift_remove(id)
    }

    /// Remove every module
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Snapshot of all registered modules in definition order
    pub fn entries(&self) -> Entries {
        self.entries.borrow().clone()
    }

    /// Get all registered identifiers
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Get the number of registered modules
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Loader, Value};

    #[test]
    fn test_lookup_index_fallback() {
        let loader = Loader::new();
        loader.define().exports("foo/index", Value::from(1));

        let require = loader.require();
        assert!(require.has("foo"));
        assert!(require.has("foo/index"));
        assert!(!require.has("fo"));
    }

    #[test]
    fn test_entries_keep_definition_order() {
        let loader = Loader::new();
        let define = loader.define();
        define.exports("b", Value::Null);
        define.exports("a", Value::Null);
        define.exports("c", Value::Null);
        define.exports("a", Value::from(2));

        let keys: Vec<String> = loader.require().entries().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_set_get_delete() {
        let loader = Loader::new();
        let module = loader.define().exports("x", Value::Null);

        let registry = super::Registry::new();
        assert!(registry.is_empty());
        assert!(registry.set("x", module.clone()).is_none());
        assert_eq!(registry.get("x").unwrap().uuid(), module.uuid());
        assert!(registry.lookup("x/index").is_none());
        assert_eq!(registry.lookup("x").unwrap().0, "x");
        assert!(registry.delete("x").is_some());
        assert!(registry.get("x").is_none());
        assert_eq!(registry.len(), 0);
    }
}
