// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # amd-loader
//!
//! A synchronous, single-threaded AMD module loader modeled on `loader.js`.
//!
//! Modules are registered with `define` and executed lazily, at most once,
//! the first time something `require`s them:
//!
//! - Dependency graphs are discovered and run depth-first on `require()`
//! - The magic `require`, `exports` and `module` dependencies
//! - Relative identifiers (`./`, `../`) and `/index` fallback
//! - Aliases that share the exports of their target
//! - `define.exports` for modules whose exports are known up front
//! - Default export synthesis and a `wrapModules` instrumentation hook
//! - `noConflict` for running several loaders side by side
//!
//! ## Quick Start
//!
//! ```rust
//! use amd_loader::{Loader, Value};
//!
//! let loader = Loader::new();
//! let define = loader.define();
//! let require = loader.require();
//!
//! define.exports("config", Value::from("production"));
//! define.define("app", ["config", "exports"], |_module, deps| {
//!     let config = deps[0].as_value().cloned().unwrap_or_default();
//!     deps[1].as_exports().unwrap().set("env", config);
//!     Ok(Value::Undefined)
//! });
//! define.alias_from("app", "main");
//!
//! let app = require.require("main").unwrap();
//! assert_eq!(app.get("env"), Value::from("production"));
//! assert_eq!(app, require.require("app").unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod define;
pub mod error;
pub mod globals;
pub mod loader;
mod macros;
pub mod module;
pub mod path;
pub mod registry;
pub mod require;
pub mod value;

// Re-exports
pub use config::{LoaderOptions, WrapModules};
pub use define::{Alias, DefaultDeps, Define};
pub use error::{LoaderError, Result};
#[allow(deprecated)]
pub use globals::{
    get_available_globals, get_globals, AvailableGlobals, GlobalScope, GlobalValue, Globals,
    NoConflict,
};
pub use loader::Loader;
pub use module::{Dep, ExportsCell, MagicDependency, Module, ModuleCallback, ModuleState};
pub use registry::{Entries, Registry};
pub use require::{LocalRequire, Require};
pub use value::{JsObject, NativeFunction, Value};

/// Version of the loader crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of `loader.js` whose behavior this crate follows
pub const LOADER_JS_VERSION: &str = "4.7.0";
