// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module records and their reification state machine.
//!
//! A module normally passes through these states, in order:
//!
//! - `New`       : initial state
//! - `Pending`   : scheduled for execution, dependencies discovered
//! - `Reifying`  : dependencies are being executed
//! - `Reified`   : dependencies finished executing successfully
//! - `Errored`   : a dependency or the callback failed
//! - `Finalized` : the callback ran and the exports are stable

use crate::define::Alias;
use crate::error::{LoaderError, Result};
use crate::loader::LoaderState;
use crate::require::{find_module, LocalRequire};
use crate::value::{JsObject, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

static NEXT_UUID: AtomicU64 = AtomicU64::new(1);

/// Callback invoked with the module itself and its resolved dependencies.
///
/// Its return value becomes the module's exports, unless the module lists
/// `exports` as a dependency, in which case it is discarded.
pub type ModuleCallback = Rc<dyn Fn(&Module, Vec<Dep>) -> Result<Value>>;

/// Lifecycle of a module record. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleState {
    /// Defined, not yet scheduled
    New,
    /// Scheduled for execution
    Pending,
    /// Dependencies are being executed
    Reifying,
    /// Dependencies executed successfully
    Reified,
    /// A dependency or the callback failed
    Errored,
    /// Callback executed, exports are stable
    Finalized,
}

impl ModuleState {
    /// The lowercase name used by loader.js
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::New => "new",
            ModuleState::Pending => "pending",
            ModuleState::Reifying => "reifying",
            ModuleState::Reified => "reified",
            ModuleState::Errored => "errored",
            ModuleState::Finalized => "finalized",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dependencies synthesized per module instead of looked up in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicDependency {
    /// A `require` bound to the depending module
    Require,
    /// The module's initial exports object
    Exports,
    /// The module's exports container
    Module,
}

impl MagicDependency {
    /// Recognize a magic dependency name
    pub fn parse(dep: &str) -> Option<Self> {
        match dep {
            "require" => Some(Self::Require),
            "exports" => Some(Self::Exports),
            "module" => Some(Self::Module),
            _ => None,
        }
    }

    /// The dependency name as written in a dependency list
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::Exports => "exports",
            Self::Module => "module",
        }
    }
}

/// Stable, replaceable holder of a module's exported value.
///
/// Dependents that keep the cell observe later replacements; dependents
/// that keep the value only observe in-place mutation of objects.
#[derive(Clone, Default)]
pub struct ExportsCell(Rc<RefCell<Value>>);

impl ExportsCell {
    /// Create a cell holding `value`
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// The current exports
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Replace the exports as a whole
    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    /// Replace the exports, returning the previous value
    pub fn replace(&self, value: Value) -> Value {
        self.0.replace(value)
    }

    /// Mutate the exports in place
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ExportsCell) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ExportsCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExportsCell").field(&*self.0.borrow()).finish()
    }
}

/// A resolved dependency as handed to a module callback
#[derive(Debug, Clone)]
pub enum Dep {
    /// The magic `require` dependency
    Require(LocalRequire),
    /// The magic `exports` dependency
    Exports(JsObject),
    /// The magic `module` dependency
    Module(ExportsCell),
    /// Exports of a registered module
    Value(Value),
}

impl Dep {
    /// The local require, for a `require` dependency
    pub fn as_require(&self) -> Option<&LocalRequire> {
        match self {
            Dep::Require(require) => Some(require),
            _ => None,
        }
    }

    /// The exports object, for an `exports` dependency
    pub fn as_exports(&self) -> Option<&JsObject> {
        match self {
            Dep::Exports(obj) => Some(obj),
            _ => None,
        }
    }

    /// The exports container, for a `module` dependency
    pub fn as_module(&self) -> Option<&ExportsCell> {
        match self {
            Dep::Module(cell) => Some(cell),
            _ => None,
        }
    }

    /// The exports of a regular dependency
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Dep::Value(value) => Some(value),
            _ => None,
        }
    }

    /// View the dependency as a plain value.
    ///
    /// `exports` becomes its object, `module` its current exports and
    /// `require` becomes `undefined`.
    pub fn into_value(self) -> Value {
        match self {
            Dep::Value(value) => value,
            Dep::Exports(obj) => Value::Object(obj),
            Dep::Module(cell) => cell.get(),
            Dep::Require(_) => Value::Undefined,
        }
    }
}

/// A discovered dependency awaiting reification.
///
/// Registry modules are held weakly so that records discovered but never
/// run do not keep each other alive after `clear` or `unsee`.
enum Slot {
    Ready(Dep),
    Module { id: String, module: Weak<Module> },
}

enum Body {
    Callback(RefCell<ModuleCallback>),
    Alias(Alias),
}

/// A registry entry: one lazily reified unit of code
pub struct Module {
    uuid: u64,
    id: String,
    deps: Vec<String>,
    body: Body,
    exports: JsObject,
    module: ExportsCell,
    has_exports_as_dep: bool,
    state: Cell<ModuleState>,
    reified: RefCell<Vec<Slot>>,
    resolved: RefCell<Vec<Dep>>,
    executing: Cell<bool>,
    wrapped: Cell<bool>,
    loader: Weak<LoaderState>,
}

impl Module {
    fn with_body(loader: Weak<LoaderState>, id: String, deps: Vec<String>, body: Body) -> Self {
        let exports = JsObject::new();
        let has_exports_as_dep = deps.iter().any(|dep| dep == "exports");
        Self {
            uuid: NEXT_UUID.fetch_add(1, Ordering::Relaxed),
            id,
            deps,
            body,
            module: ExportsCell::new(Value::Object(exports.clone())),
            exports,
            has_exports_as_dep,
            state: Cell::new(ModuleState::New),
            reified: RefCell::new(Vec::new()),
            resolved: RefCell::new(Vec::new()),
            executing: Cell::new(false),
            wrapped: Cell::new(false),
            loader,
        }
    }

    pub(crate) fn new(
        loader: Weak<LoaderState>,
        id: String,
        deps: Vec<String>,
        callback: ModuleCallback,
    ) -> Self {
        Self::with_body(loader, id, deps, Body::Callback(RefCell::new(callback)))
    }

    pub(crate) fn alias(loader: Weak<LoaderState>, id: String, target: Alias) -> Self {
        Self::with_body(loader, id, Vec::new(), Body::Alias(target))
    }

    /// A dependency-less module whose exports are known up front.
    pub(crate) fn finalized(loader: Weak<LoaderState>, id: String, value: Value) -> Self {
        let noop: ModuleCallback = Rc::new(|_, _| Ok(Value::Undefined));
        let module = Self::new(loader, id, Vec::new(), noop);
        module.module.set(value);
        module.state.set(ModuleState::Finalized);
        module
    }

    /// Process-unique identifier, never reused
    pub fn uuid(&self) -> u64 {
        self.uuid
    }

    /// The identifier this module is registered under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared dependency identifiers
    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Whether `exports` is listed as a dependency
    pub fn has_exports_as_dep(&self) -> bool {
        self.has_exports_as_dep
    }

    /// Whether this record links to another module
    pub fn is_alias(&self) -> bool {
        matches!(self.body, Body::Alias(_))
    }

    /// The aliased identifier, for alias records
    pub fn alias_target(&self) -> Option<&str> {
        match &self.body {
            Body::Alias(alias) => Some(alias.id()),
            Body::Callback(_) => None,
        }
    }

    /// The exports container
    pub fn module(&self) -> &ExportsCell {
        &self.module
    }

    /// The current state.
    ///
    /// Alias records report the state of the module they resolve to.
    pub fn state(&self) -> ModuleState {
        let Some(target) = self.alias_target() else {
            return self.state.get();
        };
        self.loader()
            .and_then(|loader| find_module(&loader, target, &self.id, None))
            .map(|target| target.state.get())
            .unwrap_or(self.state.get())
    }

    fn advance(&self, next: ModuleState) {
        let current = self.state.get();
        debug_assert!(
            next >= current,
            "module `{}` moved from {} back to {}",
            self.id,
            current,
            next
        );
        trace!(module = %self.id, from = %current, to = %next, "state transition");
        self.state.set(next);
    }

    fn fail(&self) {
        warn!(module = %self.id, "module errored");
        self.advance(ModuleState::Errored);
    }

    pub(crate) fn loader(&self) -> Result<Rc<LoaderState>> {
        self.loader
            .upgrade()
            .ok_or_else(|| LoaderError::Detached(self.id.clone()))
    }

    /// A `require` bound to this module, resolving relative ids against it
    pub fn make_require(&self) -> LocalRequire {
        LocalRequire::new(self.loader.clone(), self.id.clone())
    }

    /// Discover dependencies, scheduling every not-yet-run module onto `pending`.
    pub(crate) fn find_deps(
        &self,
        loader: &LoaderState,
        pending: &mut Vec<Rc<Module>>,
    ) -> Result<()> {
        if self.state.get() != ModuleState::New {
            return Ok(());
        }
        self.advance(ModuleState::Pending);

        let mut slots = Vec::with_capacity(self.deps.len());
        for dep in &self.deps {
            let slot = match MagicDependency::parse(dep) {
                Some(MagicDependency::Exports) => Slot::Ready(Dep::Exports(self.exports.clone())),
                Some(MagicDependency::Require) => Slot::Ready(Dep::Require(self.make_require())),
                Some(MagicDependency::Module) => Slot::Ready(Dep::Module(self.module.clone())),
                None => {
                    let resolved = crate::path::resolve(dep, &self.id);
                    // Unresolvable specifiers are reported as written.
                    let dependency = resolved.as_ref().map_or_else(|_| dep.clone(), Clone::clone);
                    let found = resolved
                        .and_then(|id| find_module(loader, &id, &self.id, Some(&mut *pending)));
                    match found {
                        Ok(module) => Slot::Module {
                            id: dependency,
                            module: Rc::downgrade(&module),
                        },
                        Err(err) => {
                            self.fail();
                            return Err(LoaderError::DependencyFailed {
                                id: self.id.clone(),
                                dependency,
                                source: Box::new(err),
                            });
                        }
                    }
                }
            };
            slots.push(slot);
        }
        trace!(module = %self.id, deps = slots.len(), "dependencies discovered");
        *self.reified.borrow_mut() = slots;
        Ok(())
    }

    /// Run a discovered dependency, looking it up again if its record was
    /// dropped from the registry in the meantime.
    fn upgrade_dep(&self, id: &str, module: &Weak<Module>) -> Result<Value> {
        match module.upgrade() {
            Some(module) => module.exports(),
            None => {
                let loader = self.loader()?;
                find_module(&loader, id, &self.id, None)?.exports()
            }
        }
    }

    /// Execute the dependencies of this module.
    ///
    /// Re-entering while already reifying is a no-op; this is what lets
    /// dependency cycles terminate.
    pub fn reify(&self) -> Result<()> {
        if let Some(target) = self.alias_target() {
            let loader = self.loader()?;
            return find_module(&loader, target, &self.id, None)?.reify();
        }
        match self.state.get() {
            ModuleState::Reifying | ModuleState::Reified | ModuleState::Finalized => {
                return Ok(());
            }
            ModuleState::Errored => return Err(LoaderError::Errored(self.id.clone())),
            ModuleState::New => {
                let loader = self.loader()?;
                // Newly discovered dependencies are executed by the loop below.
                self.find_deps(&loader, &mut Vec::new())?;
            }
            ModuleState::Pending => {}
        }

        self.advance(ModuleState::Reifying);
        let slots = std::mem::take(&mut *self.reified.borrow_mut());
        let mut resolved = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Ready(dep) => resolved.push(dep),
                Slot::Module { id, module } => match self.upgrade_dep(&id, &module) {
                    Ok(value) => resolved.push(Dep::Value(value)),
                    Err(err) => {
                        self.fail();
                        return Err(LoaderError::DependencyFailed {
                            id: self.id.clone(),
                            dependency: id,
                            source: Box::new(err),
                        });
                    }
                },
            }
        }
        *self.resolved.borrow_mut() = resolved;
        self.advance(ModuleState::Reified);
        Ok(())
    }

    /// Run the module if needed and return its exports.
    ///
    /// After the first success the cached exports are returned without
    /// running the callback again. While the module is mid-reification
    /// (a dependency cycle) the current, possibly incomplete, exports are
    /// returned.
    pub fn exports(&self) -> Result<Value> {
        if let Some(target) = self.alias_target() {
            let loader = self.loader()?;
            return crate::require::require_from(&loader, target, &self.id);
        }
        match self.state.get() {
            ModuleState::Finalized | ModuleState::Reifying => return Ok(self.module.get()),
            ModuleState::Errored => return Err(LoaderError::Errored(self.id.clone())),
            _ => {}
        }
        if self.executing.get() {
            return Ok(self.module.get());
        }

        let loader = self.loader()?;
        self.wrap_callback(&loader);
        self.reify()?;
        let Body::Callback(callback) = &self.body else {
            return Ok(self.module.get());
        };
        let callback = Rc::clone(&callback.borrow());
        let args = std::mem::take(&mut *self.resolved.borrow_mut());

        self.executing.set(true);
        let result = callback(self, args);
        self.executing.set(false);

        match result {
            Ok(value) => {
                if !self.has_exports_as_dep {
                    self.module.set(value);
                }
                self.advance(ModuleState::Finalized);
                if loader.make_default_export() {
                    self.make_default_export();
                }
                trace!(module = %self.id, "finalized");
                Ok(self.module.get())
            }
            Err(err) => {
                self.fail();
                Err(LoaderError::ModuleFailed {
                    id: self.id.clone(),
                    source: Box::new(err),
                })
            }
        }
    }

    fn wrap_callback(&self, loader: &LoaderState) {
        if self.wrapped.replace(true) {
            return;
        }
        let (Some(hook), Body::Callback(callback)) = (loader.wrap_modules(), &self.body) else {
            return;
        };
        let original = Rc::clone(&callback.borrow());
        let wrapped = hook(self.id.as_str(), original);
        *callback.borrow_mut() = wrapped;
    }

    /// Re-expose an object export as its own `default`, unless one is set.
    ///
    /// Primitives and functions are left untouched.
    pub fn make_default_export(&self) {
        if let Value::Object(obj) = self.module.get() {
            if obj.get("default").is_none_or(|value| value.is_undefined()) {
                obj.set_default_to_self();
            }
        }
    }

    /// Remove this record from the registry.
    ///
    /// Side effects of an already executed callback are not undone.
    pub fn unsee(&self) {
        let Ok(loader) = self.loader() else {
            return;
        };
        if loader
            .registry
            .get(&self.id)
            .is_some_and(|entry| std::ptr::eq(Rc::as_ptr(&entry), self))
        {
            loader.registry.delete(&self.id);
            tracing::debug!(module = %self.id, "unseen");
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Module");
        s.field("uuid", &self.uuid)
            .field("id", &self.id)
            .field("deps", &self.deps)
            .field("state", &self.state.get());
        if let Some(target) = self.alias_target() {
            s.field("alias_of", &target);
        }
        s.finish()
    }
}
