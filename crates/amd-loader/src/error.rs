// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while defining or requiring modules
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Neither the identifier nor its `/index` fallback is registered
    #[error("Could not find module `{id}` imported from `{referrer}`")]
    ModuleNotFound {
        /// Module identifier that was looked up
        id: String,
        /// Identifier of the module (or entry point) that asked for it
        referrer: String,
    },

    /// A relative identifier tried to navigate above the root
    #[error("Cannot access parent module of root: `{specifier}` relative to `{base}`")]
    PathEscape {
        /// The relative specifier as written
        specifier: String,
        /// The module it was resolved against
        base: String,
    },

    /// An alias chain led back to an identifier already visited
    #[error("Alias cycle detected while resolving `{0}`")]
    AliasCycle(String),

    /// A dependency failed while the module was being reified
    #[error("Module `{id}` could not load dependency `{dependency}`: {source}")]
    DependencyFailed {
        /// The module being reified
        id: String,
        /// The dependency that failed
        dependency: String,
        /// Underlying failure
        #[source]
        source: Box<LoaderError>,
    },

    /// The module's own callback failed
    #[error("Module `{id}` failed to execute: {source}")]
    ModuleFailed {
        /// The module whose callback failed
        id: String,
        /// Error returned by the callback
        #[source]
        source: Box<LoaderError>,
    },

    /// The module failed earlier and has not been redefined since
    #[error("Module `{0}` is in the errored state; redefine it before requiring it again")]
    Errored(String),

    /// Error raised from inside a module callback
    #[error("{0}")]
    Thrown(String),

    /// A callback destructured a different number of dependencies than it received
    #[error("Module `{id}` expected {expected} dependencies but received {actual}")]
    ArityMismatch {
        /// Module identifier
        id: String,
        /// Number of parameters the callback declares
        expected: usize,
        /// Number of resolved dependencies
        actual: usize,
    },

    /// A required loader global is absent from the scope
    #[error("loader.js: `{0}` global is not defined")]
    MissingGlobal(String),

    /// The loader owning a module or local require has been dropped
    #[error("Loader for module `{0}` no longer exists")]
    Detached(String),

    /// Options could not be parsed
    #[error("Invalid loader options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

impl LoaderError {
    /// Create an error to be returned from a module callback
    pub fn thrown(msg: impl Into<String>) -> Self {
        Self::Thrown(msg.into())
    }

    /// Create a module not found error
    pub fn not_found(id: impl Into<String>, referrer: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            id: id.into(),
            referrer: referrer.into(),
        }
    }

    /// Whether this error, or any error it wraps, is a missing module
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ModuleNotFound { .. } => true,
            Self::DependencyFailed { source, .. } | Self::ModuleFailed { source, .. } => {
                source.is_not_found()
            }
            _ => false,
        }
    }

    /// The innermost error in a chain of dependency/module failures
    pub fn root_cause(&self) -> &LoaderError {
        match self {
            Self::DependencyFailed { source, .. } | Self::ModuleFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}
