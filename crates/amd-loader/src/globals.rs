// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Global bindings of a loader
//!
//! Implements:
//! - `loader`, `define`, `require` - the standard global names
//! - `requirejs`, `requireModule` - deprecated aliases of `require`
//! - `getGlobals` / `getAvailableGlobals` - typed access to the bindings
//! - `loader.noConflict(...)` - renaming and restoring the bindings

use crate::define::Define;
use crate::error::{LoaderError, Result};
use crate::loader::Loader;
use crate::require::Require;
use crate::value::Value;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::Deserialize;

/// Global name of the loader configuration object
pub const LOADER: &str = "loader";
/// Global name of `define`
pub const DEFINE: &str = "define";
/// Global name of `require`
pub const REQUIRE: &str = "require";
/// Deprecated global alias of `require`
pub const REQUIREJS: &str = "requirejs";
/// Deprecated global alias of `require`
pub const REQUIRE_MODULE: &str = "requireModule";

/// Every name a loader binds when installed
pub const GLOBAL_NAMES: [&str; 5] = [LOADER, DEFINE, REQUIRE, REQUIREJS, REQUIRE_MODULE];

/// A value bound in a [`GlobalScope`]
#[derive(Debug, Clone)]
pub enum GlobalValue {
    /// A loader instance
    Loader(Loader),
    /// A `define` handle
    Define(Define),
    /// A `require` handle
    Require(Require),
    /// Anything else
    Value(Value),
}

impl GlobalValue {
    /// The loader, if this binding holds one
    pub fn as_loader(&self) -> Option<&Loader> {
        match self {
            GlobalValue::Loader(loader) => Some(loader),
            _ => None,
        }
    }

    /// The `define` handle, if this binding holds one
    pub fn as_define(&self) -> Option<&Define> {
        match self {
            GlobalValue::Define(define) => Some(define),
            _ => None,
        }
    }

    /// The `require` handle, if this binding holds one
    pub fn as_require(&self) -> Option<&Require> {
        match self {
            GlobalValue::Require(require) => Some(require),
            _ => None,
        }
    }
}

/// The host's global object: named bindings loaders install themselves into
#[derive(Debug, Clone, Default)]
pub struct GlobalScope {
    bindings: IndexMap<String, GlobalValue, FxBuildHasher>,
}

impl GlobalScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a binding
    pub fn get(&self, name: &str) -> Option<&GlobalValue> {
        self.bindings.get(name)
    }

    /// Bind `name`, returning what it previously held
    pub fn set(&mut self, name: impl Into<String>, value: GlobalValue) -> Option<GlobalValue> {
        self.bindings.insert(name.into(), value)
    }

    /// Remove a binding
    pub fn remove(&mut self, name: &str) -> Option<GlobalValue> {
        self.bindings.shift_remove(name)
    }

    /// Check if a binding exists
    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// All bound names in binding order
    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }
}

/// New names for the loader globals, as passed to `loader.noConflict`.
///
/// Omitted keys keep shadowing whatever they replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoConflict {
    /// New name for `loader`
    pub loader: Option<String>,
    /// New name for `define`
    pub define: Option<String>,
    /// New name for `require`
    pub require: Option<String>,
    /// New name for `requirejs`
    pub requirejs: Option<String>,
    /// New name for `requireModule`
    pub require_module: Option<String>,
}

impl NoConflict {
    /// Parse aliases from JSON, e.g. `{"define": "newDefine"}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// `(standard name, new name)` for every key that was given
    pub fn renames(&self) -> Vec<(&'static str, &str)> {
        [
            (LOADER, &self.loader),
            (DEFINE, &self.define),
            (REQUIRE, &self.require),
            (REQUIREJS, &self.requirejs),
            (REQUIRE_MODULE, &self.require_module),
        ]
        .into_iter()
        .filter_map(|(name, new_name)| new_name.as_deref().map(|new_name| (name, new_name)))
        .collect()
    }
}

/// The standard loader globals
#[derive(Debug, Clone)]
pub struct Globals {
    /// `loader`
    pub loader: Loader,
    /// `define`
    pub define: Define,
    /// `require`
    pub require: Require,
}

/// Every loader global that happens to be bound, including deprecated ones
#[derive(Debug, Clone, Default)]
pub struct AvailableGlobals {
    /// `loader`
    pub loader: Option<Loader>,
    /// `define`
    pub define: Option<Define>,
    /// `require`
    pub require: Option<Require>,
    /// `requirejs`
    pub requirejs: Option<Require>,
    /// `requireModule`
    pub require_module: Option<Require>,
}

/// Get the `loader`, `define` and `require` globals from `scope`.
///
/// Fails naming the first one that is missing or bound to something else.
pub fn get_globals(scope: &GlobalScope) -> Result<Globals> {
    let missing = |name: &str| LoaderError::MissingGlobal(name.to_string());
    Ok(Globals {
        loader: scope
            .get(LOADER)
            .and_then(GlobalValue::as_loader)
            .cloned()
            .ok_or_else(|| missing(LOADER))?,
        define: scope
            .get(DEFINE)
            .and_then(GlobalValue::as_define)
            .cloned()
            .ok_or_else(|| missing(DEFINE))?,
        require: scope
            .get(REQUIRE)
            .and_then(GlobalValue::as_require)
            .cloned()
            .ok_or_else(|| missing(REQUIRE))?,
    })
}

/// Get whichever loader globals are bound in `scope`
#[deprecated(note = "use `get_globals` instead")]
pub fn get_available_globals(scope: &GlobalScope) -> AvailableGlobals {
    let require = |name: &str| scope.get(name).and_then(GlobalValue::as_require).cloned();
    AvailableGlobals {
        loader: scope.get(LOADER).and_then(GlobalValue::as_loader).cloned(),
        define: scope.get(DEFINE).and_then(GlobalValue::as_define).cloned(),
        require: require(REQUIRE),
        requirejs: require(REQUIREJS),
        require_module: require(REQUIRE_MODULE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renames_skip_omitted_keys() {
        let aliases = NoConflict::from_json(r#"{"define": "newDefine", "requireModule": "rm"}"#)
            .unwrap();
        assert_eq!(
            aliases.renames(),
            vec![(DEFINE, "newDefine"), (REQUIRE_MODULE, "rm")]
        );
    }

    #[test]
    fn test_scope_set_returns_previous() {
        let mut scope = GlobalScope::new();
        assert!(scope.set("x", GlobalValue::Value(Value::from(1))).is_none());
        let previous = scope.set("x", GlobalValue::Value(Value::from(2)));
        assert!(matches!(previous, Some(GlobalValue::Value(Value::Number(n))) if n == 1.0));
        assert_eq!(scope.names(), vec!["x".to_string()]);
    }

    #[test]
    fn test_get_globals_missing() {
        let scope = GlobalScope::new();
        let err = get_globals(&scope).unwrap_err();
        assert!(matches!(err, LoaderError::MissingGlobal(name) if name == "loader"));
    }
}
