// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration

use crate::error::Result;
use crate::module::ModuleCallback;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Instrumentation hook called once per module before it first runs.
///
/// Receives the module id and its callback; the returned callback is used
/// from then on. Useful for coverage instrumentation.
pub type WrapModules = Rc<dyn Fn(&str, ModuleCallback) -> ModuleCallback>;

/// Serializable loader options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Re-expose object exports as their own `default` when none is set
    pub make_default_export: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            make_default_export: true,
        }
    }
}

impl LoaderOptions {
    /// Parse options from JSON, e.g. `{"makeDefaultExport": false}`.
    ///
    /// Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize options to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
