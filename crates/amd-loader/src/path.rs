// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module identifier normalization

use crate::error::{LoaderError, Result};

/// Suffix tried when a bare identifier is not registered
pub const INDEX_SUFFIX: &str = "/index";

/// Whether `specifier` must be resolved against a referring module
pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with('.')
}

/// Resolve `./` and `../` segments in `specifier` against the directory of `base`.
///
/// Non-relative specifiers are returned unchanged.
pub fn resolve(specifier: &str, base: &str) -> Result<String> {
    if !is_relative(specifier) {
        return Ok(specifier.to_string());
    }

    let mut segments: Vec<&str> = base.split('/').collect();
    // Drop the module's own name, keeping its directory.
    segments.pop();

    for part in specifier.split('/') {
        match part {
            ".." => {
                if segments.pop().is_none() {
                    return Err(LoaderError::PathEscape {
                        specifier: specifier.to_string(),
                        base: base.to_string(),
                    });
                }
            }
            "." => {}
            _ => segments.push(part),
        }
    }

    Ok(segments.join("/"))
}

/// The directory-style fallback identifier for `id`
pub fn index_of(id: &str) -> String {
    format!("{}{}", id, INDEX_SUFFIX)
}
