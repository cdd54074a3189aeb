// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader instances
//!
//! A [`Loader`] owns one registry. Several loaders can live side by side;
//! each hands out its own [`Define`] and [`Require`] handles and can be
//! installed into a [`GlobalScope`].

use crate::config::{LoaderOptions, WrapModules};
use crate::define::Define;
use crate::globals::{
    GlobalScope, GlobalValue, NoConflict, DEFINE, LOADER, REQUIRE, REQUIREJS, REQUIRE_MODULE,
};
use crate::module::ModuleCallback;
use crate::registry::Registry;
use crate::require::Require;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// State shared by every handle of one loader
pub(crate) struct LoaderState {
    pub(crate) registry: Registry,
    options: RefCell<LoaderOptions>,
    wrap_modules: RefCell<Option<WrapModules>>,
    /// Global bindings shadowed by [`Loader::install`], restored by `no_conflict`
    shadowed: RefCell<IndexMap<&'static str, Option<GlobalValue>, FxBuildHasher>>,
}

impl LoaderState {
    pub(crate) fn make_default_export(&self) -> bool {
        self.options.borrow().make_default_export
    }

    pub(crate) fn wrap_modules(&self) -> Option<WrapModules> {
        self.wrap_modules.borrow().clone()
    }
}

/// A module loader instance
#[derive(Clone)]
pub struct Loader {
    state: Rc<LoaderState>,
}

impl Loader {
    /// Create a loader with default options
    pub fn new() -> Self {
        Self::with_options(LoaderOptions::default())
    }

    /// Create a loader with the given options
    pub fn with_options(options: LoaderOptions) -> Self {
        Self {
            state: Rc::new(LoaderState {
                registry: Registry::new(),
                options: RefCell::new(options),
                wrap_modules: RefCell::new(None),
                shadowed: RefCell::new(IndexMap::default()),
            }),
        }
    }

    /// Handle used to register modules
    pub fn define(&self) -> Define {
        Define::new(Rc::clone(&self.state))
    }

    /// Handle used to require modules and inspect the registry
    pub fn require(&self) -> Require {
        Require::new(Rc::clone(&self.state))
    }

    /// Old name of [`Loader::require`]
    #[deprecated(note = "use `require` instead")]
    pub fn requirejs(&self) -> Require {
        self.require()
    }

    /// Old name of [`Loader::require`]
    #[deprecated(note = "use `require` instead")]
    pub fn require_module(&self) -> Require {
        self.require()
    }

    /// Current options
    pub fn options(&self) -> LoaderOptions {
        self.state.options.borrow().clone()
    }

    /// Replace all options
    pub fn set_options(&self, options: LoaderOptions) {
        *self.state.options.borrow_mut() = options;
    }

    /// Whether object exports get a synthesized `default`
    pub fn make_default_export(&self) -> bool {
        self.state.make_default_export()
    }

    /// Enable or disable default export synthesis
    pub fn set_make_default_export(&self, enabled: bool) {
        self.state.options.borrow_mut().make_default_export = enabled;
    }

    /// Install an instrumentation hook; see [`WrapModules`]
    pub fn set_wrap_modules<F>(&self, hook: F)
    where
        F: Fn(&str, ModuleCallback) -> ModuleCallback + 'static,
    {
        *self.state.wrap_modules.borrow_mut() = Some(Rc::new(hook));
    }

    /// Remove the instrumentation hook
    pub fn clear_wrap_modules(&self) {
        self.state.wrap_modules.borrow_mut().take();
    }

    /// Whether an instrumentation hook is installed
    pub fn has_wrap_modules(&self) -> bool {
        self.state.wrap_modules.borrow().is_some()
    }

    /// Bind `loader`, `define`, `require`, `requirejs` and `requireModule`
    /// in `scope`, remembering what they shadow.
    pub fn install(&self, scope: &mut GlobalScope) {
        let bindings = [
            (LOADER, GlobalValue::Loader(self.clone())),
            (DEFINE, GlobalValue::Define(self.define())),
            (REQUIRE, GlobalValue::Require(self.require())),
            (REQUIREJS, GlobalValue::Require(self.require())),
            (REQUIRE_MODULE, GlobalValue::Require(self.require())),
        ];
        let mut shadowed = self.state.shadowed.borrow_mut();
        for (name, value) in bindings {
            let previous = scope.set(name, value);
            shadowed.entry(name).or_insert(previous);
        }
        debug!("loader installed into global scope");
    }

    /// Move this loader's globals to new names and restore what they shadowed.
    ///
    /// Names not mentioned in `aliases` stay bound to this loader. Restoring
    /// a name that shadowed nothing removes it from `scope`.
    pub fn no_conflict(&self, scope: &mut GlobalScope, aliases: &NoConflict) {
        let shadowed = self.state.shadowed.borrow();
        for (name, new_name) in aliases.renames() {
            match scope.remove(name) {
                Some(current) => {
                    scope.set(new_name, current);
                }
                None => {
                    scope.remove(new_name);
                }
            }
            if let Some(Some(previous)) = shadowed.get(name) {
                scope.set(name, previous.clone());
            }
            debug!(global = name, renamed_to = new_name, "global restored");
        }
    }

    /// Whether both handles refer to the same loader
    pub fn ptr_eq(&self, other: &Loader) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("modules", &self.state.registry.len())
            .field("options", &*self.state.options.borrow())
            .field("wrap_modules", &self.has_wrap_modules())
            .finish()
    }
}
