// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `require()` and the per-module local require

use crate::error::{LoaderError, Result};
use crate::loader::LoaderState;
use crate::module::{Module, ModuleState};
use crate::path::resolve;
use crate::registry::Entries;
use crate::value::Value;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace};

/// Referrer reported for lookups made through the global `require`
pub const ROOT_REFERRER: &str = "(require)";

/// Referrer reported for lookups made through `require.unsee`
pub const UNSEE_REFERRER: &str = "(unsee)";

/// Look up `id` (or `{id}/index`), following aliases to the module that owns
/// the exports.
///
/// With `pending`, a module that has not been scheduled or run yet has its
/// dependency graph discovered and is queued after its dependencies.
pub(crate) fn find_module(
    loader: &LoaderState,
    id: &str,
    referrer: &str,
    pending: Option<&mut Vec<Rc<Module>>>,
) -> Result<Rc<Module>> {
    let (key, mut module) = loader
        .registry
        .lookup(id)
        .ok_or_else(|| LoaderError::not_found(id, referrer))?;

    let mut visited = vec![key];
    while let Some(target) = module.alias_target() {
        let (key, next) = loader
            .registry
            .lookup(target)
            .ok_or_else(|| LoaderError::not_found(target, referrer))?;
        if visited.contains(&key) {
            return Err(LoaderError::AliasCycle(id.to_string()));
        }
        visited.push(key);
        module = next;
    }

    if let Some(pending) = pending {
        if !matches!(module.state(), ModuleState::Pending | ModuleState::Finalized) {
            module.find_deps(loader, pending)?;
            pending.push(Rc::clone(&module));
        }
    }
    Ok(module)
}

/// Execute a discovered queue, most recently queued first.
pub(crate) fn run_pending(pending: &[Rc<Module>]) -> Result<()> {
    for module in pending.iter().rev() {
        module.exports()?;
    }
    Ok(())
}

/// Resolve, reify and return the exports of an absolute identifier.
pub(crate) fn require_from(loader: &LoaderState, id: &str, referrer: &str) -> Result<Value> {
    let mut pending = Vec::new();
    let module = find_module(loader, id, referrer, Some(&mut pending))?;
    trace!(module = %module.id(), queued = pending.len(), "reifying module graph");
    run_pending(&pending)?;
    module.exports()
}

/// The global `require` (also exposed as `requirejs` and `requireModule`)
#[derive(Clone)]
pub struct Require {
    state: Rc<LoaderState>,
}

impl Require {
    pub(crate) fn new(state: Rc<LoaderState>) -> Self {
        Self { state }
    }

    /// Return the exports of module `id`, running it and its dependency
    /// graph first if needed.
    #[instrument(skip(self))]
    pub fn require(&self, id: &str) -> Result<Value> {
        let id = resolve(id, "")?;
        require_from(&self.state, &id, ROOT_REFERRER)
    }

    /// Whether `id` (or `{id}/index`) is registered.
    ///
    /// Registered modules may not have been run yet.
    pub fn has(&self, id: &str) -> bool {
        resolve(id, "").is_ok_and(|id| self.state.registry.has(&id))
    }

    /// Snapshot of the registry, in definition order.
    ///
    /// Treat it as read-only: mutate through `define`, `unsee` and `clear`.
    pub fn entries(&self) -> Entries {
        self.state.registry.entries()
    }

    /// Old name of [`Require::entries`]
    #[deprecated(note = "use `entries` instead")]
    pub fn eak_seen(&self) -> Entries {
        self.entries()
    }

    /// Remove module `id` from the registry.
    ///
    /// Aliases are removed themselves; the module they point at stays.
    pub fn unsee(&self, id: &str) -> Result<()> {
        let id = resolve(id, "")?;
        let (_, module) = self
            .state
            .registry
            .lookup(&id)
            .ok_or_else(|| LoaderError::not_found(&id, UNSEE_REFERRER))?;
        module.unsee();
        Ok(())
    }

    /// Remove every module. Intended for isolating test runs.
    pub fn clear(&self) {
        debug!(modules = self.state.registry.len(), "clearing registry");
        self.state.registry.clear();
    }

    /// Whether both handles belong to the same loader
    pub fn same_loader(&self, other: &Require) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Require {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Require")
            .field("modules", &self.state.registry.len())
            .finish()
    }
}

/// A `require` bound to one module, handed out as the magic `require`
/// dependency. Relative identifiers resolve against the owning module.
#[derive(Clone)]
pub struct LocalRequire {
    loader: Weak<LoaderState>,
    module_id: String,
}

impl LocalRequire {
    pub(crate) fn new(loader: Weak<LoaderState>, module_id: String) -> Self {
        Self { loader, module_id }
    }

    fn loader(&self) -> Result<Rc<LoaderState>> {
        self.loader
            .upgrade()
            .ok_or_else(|| LoaderError::Detached(self.module_id.clone()))
    }

    /// Require `dep`, resolved relative to the owning module
    pub fn require(&self, dep: &str) -> Result<Value> {
        let loader = self.loader()?;
        let id = resolve(dep, &self.module_id)?;
        require_from(&loader, &id, &self.module_id)
    }

    /// Whether `dep`, resolved relative to the owning module, is registered
    pub fn has(&self, dep: &str) -> bool {
        let Ok(loader) = self.loader() else {
            return false;
        };
        resolve(dep, &self.module_id).is_ok_and(|id| loader.registry.has(&id))
    }

    /// Identifier of the owning module
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// The same require, as exposed under `default` for ES module interop
    pub fn default_export(&self) -> &LocalRequire {
        self
    }
}

impl fmt::Debug for LocalRequire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRequire")
            .field("module_id", &self.module_id)
            .finish()
    }
}
