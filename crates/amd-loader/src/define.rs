// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `define()` - module registration
//!
//! Every form overwrites an existing module with the same identifier; the
//! replacement starts over in the `New` state.

use crate::error::{LoaderError, Result};
use crate::loader::LoaderState;
use crate::module::{Dep, Module, ModuleCallback};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A link to another module, usable in place of a callback
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alias {
    id: String,
}

impl Alias {
    /// Create an alias of module `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The aliased identifier
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Dependencies assumed when a callback is defined without a list,
/// keyed by how many parameters the callback takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultDeps {
    /// `[]`
    None,
    /// `['require']`
    Require,
    /// `['require', 'exports']`
    RequireExports,
    /// `['require', 'exports', 'module']`
    RequireExportsModule,
}

impl DefaultDeps {
    /// Table entry for a callback with `params` parameters
    pub fn for_arity(params: usize) -> Self {
        match params {
            0 => Self::None,
            1 => Self::Require,
            2 => Self::RequireExports,
            _ => Self::RequireExportsModule,
        }
    }

    /// The dependency names
    pub fn deps(&self) -> &'static [&'static str] {
        match self {
            Self::None => &[],
            Self::Require => &["require"],
            Self::RequireExports => &["require", "exports"],
            Self::RequireExportsModule => &["require", "exports", "module"],
        }
    }
}

/// The `define` global: registers modules with a loader
#[derive(Clone)]
pub struct Define {
    state: Rc<LoaderState>,
}

impl Define {
    pub(crate) fn new(state: Rc<LoaderState>) -> Self {
        Self { state }
    }

    fn register(&self, module: Module) -> Rc<Module> {
        let module = Rc::new(module);
        let replaced = self
            .state
            .registry
            .set(module.id().to_string(), Rc::clone(&module));
        debug!(
            module = %module.id(),
            uuid = module.uuid(),
            redefined = replaced.is_some(),
            "module defined"
        );
        module
    }

    /// `define(id, deps, callback)`
    pub fn define<I, S, F>(&self, id: impl Into<String>, deps: I, callback: F) -> Rc<Module>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Module, Vec<Dep>) -> Result<Value> + 'static,
    {
        self.define_callback(id, deps, Rc::new(callback))
    }

    /// `define(id, deps, callback)` with an already shared callback
    pub fn define_callback<I, S>(
        &self,
        id: impl Into<String>,
        deps: I,
        callback: ModuleCallback,
    ) -> Rc<Module>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deps = deps.into_iter().map(Into::into).collect();
        self.register(Module::new(
            Rc::downgrade(&self.state),
            id.into(),
            deps,
            callback,
        ))
    }

    /// `define(id, callback)`: dependencies come from the [`DefaultDeps`]
    /// table entry for a callback taking `params` parameters.
    ///
    /// The [`define!`](crate::define!) macro counts the parameters for you.
    pub fn define_with_arity<F>(
        &self,
        id: impl Into<String>,
        params: usize,
        callback: F,
    ) -> Rc<Module>
    where
        F: Fn(&Module, Vec<Dep>) -> Result<Value> + 'static,
    {
        self.define(id, DefaultDeps::for_arity(params).deps().iter().copied(), callback)
    }

    /// `define(id, alias)`: register `id` as a link to `alias.id()`.
    ///
    /// Aliases take no dependency list.
    pub fn define_alias(&self, id: impl Into<String>, alias: Alias) -> Rc<Module> {
        self.register(Module::alias(Rc::downgrade(&self.state), id.into(), alias))
    }

    /// `define.exports(id, value)`: register an already finalized module
    /// exporting `value`.
    pub fn exports(&self, id: impl Into<String>, value: impl Into<Value>) -> Rc<Module> {
        self.register(Module::finalized(
            Rc::downgrade(&self.state),
            id.into(),
            value.into(),
        ))
    }

    /// `define.alias(id)`: an [`Alias`] to pass to [`Define::define_alias`]
    pub fn alias(&self, id: impl Into<String>) -> Alias {
        Alias::new(id)
    }

    /// `define.alias(id, from)`: register `from` as a link to `id`
    pub fn alias_from(&self, id: impl Into<String>, from: impl Into<String>) -> Rc<Module> {
        self.define_alias(from, Alias::new(id))
    }

    /// Whether both handles belong to the same loader
    pub fn same_loader(&self, other: &Define) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Define")
            .field("modules", &self.state.registry.len())
            .finish()
    }
}

/// Destructure resolved dependencies into a fixed number of parameters.
#[doc(hidden)]
pub fn take_deps<const N: usize>(module: &Module, deps: Vec<Dep>) -> Result<[Dep; N]> {
    deps.try_into().map_err(|deps: Vec<Dep>| LoaderError::ArityMismatch {
        id: module.id().to_string(),
        expected: N,
        actual: deps.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deps_table() {
        assert_eq!(DefaultDeps::for_arity(0).deps(), &[] as &[&str]);
        assert_eq!(DefaultDeps::for_arity(1).deps(), &["require"]);
        assert_eq!(DefaultDeps::for_arity(2).deps(), &["require", "exports"]);
        assert_eq!(DefaultDeps::for_arity(3).deps(), &["require", "exports", "module"]);
        assert_eq!(DefaultDeps::for_arity(7), DefaultDeps::RequireExportsModule);
    }

    #[test]
    fn test_alias() {
        let alias = Alias::new("random");
        assert_eq!(alias.id(), "random");
        assert_eq!(alias, Alias::new(String::from("random")));
    }
}
