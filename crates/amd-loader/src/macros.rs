// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Convenience macros for defining modules and building exports.

/// `define(id, callback)` with the dependency list inferred from the
/// number of closure parameters (0 to 3), per [`DefaultDeps`](crate::DefaultDeps).
///
/// The body must evaluate to a `Result<Value>`; `?` can be used inside it.
/// Each parameter is bound to a [`Dep`](crate::Dep).
///
/// # Example
///
/// ```
/// use amd_loader::{define, Loader, Value};
///
/// let loader = Loader::new();
/// let d = loader.define();
///
/// d.exports("greeting", "hello");
/// define!(d, "app", |require, exports| {
///     let greeting = require.as_require().unwrap().require("greeting")?;
///     exports.as_exports().unwrap().set("message", greeting);
///     Ok(Value::Undefined)
/// });
///
/// let app = loader.require().require("app").unwrap();
/// assert_eq!(app.get("message"), Value::from("hello"));
/// ```
#[macro_export]
macro_rules! define {
    ($define:expr, $id:expr, || $body:expr) => {
        $define.define_with_arity($id, 0, move |_module, _deps| $body)
    };
    ($define:expr, $id:expr, |$a:ident $(,)?| $body:expr) => {
        $define.define_with_arity($id, 1, move |module, deps| {
            let [$a] = $crate::define::take_deps::<1>(module, deps)?;
            $body
        })
    };
    ($define:expr, $id:expr, |$a:ident, $b:ident $(,)?| $body:expr) => {
        $define.define_with_arity($id, 2, move |module, deps| {
            let [$a, $b] = $crate::define::take_deps::<2>(module, deps)?;
            $body
        })
    };
    ($define:expr, $id:expr, |$a:ident, $b:ident, $c:ident $(,)?| $body:expr) => {
        $define.define_with_arity($id, 3, move |module, deps| {
            let [$a, $b, $c] = $crate::define::take_deps::<3>(module, deps)?;
            $body
        })
    };
}

/// Create an object [`Value`](crate::Value) from key-value pairs.
///
/// Values go through `Value::from`.
///
/// # Example
///
/// ```
/// use amd_loader::{object, Value};
///
/// let obj = object! {
///     "name" => "foo",
///     "count" => 2,
/// };
/// assert_eq!(obj.get("count"), Value::from(2));
/// ```
#[macro_export]
macro_rules! object {
    () => {
        $crate::Value::Object($crate::JsObject::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let obj = $crate::JsObject::new();
        $(obj.set($key, $crate::Value::from($value));)+
        $crate::Value::Object(obj)
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Loader, LoaderError, Value};

    #[test]
    fn test_define_infers_deps_from_params() {
        let loader = Loader::new();
        let d = loader.define();

        let none = define!(d, "none", || Ok(Value::from(0)));
        let one = define!(d, "one", |_require| Ok(Value::from(1)));
        let two = define!(d, "two", |_require, _exports| Ok(Value::Undefined));
        let three = define!(d, "three", |_require, _exports, module| {
            module.as_module().unwrap().set(Value::from(3));
            Ok(Value::Undefined)
        });

        assert!(none.deps().is_empty());
        assert_eq!(one.deps(), ["require"]);
        assert_eq!(two.deps(), ["require", "exports"]);
        assert_eq!(three.deps(), ["require", "exports", "module"]);

        let require = loader.require();
        assert_eq!(require.require("none").unwrap(), Value::from(0));
        assert_eq!(require.require("one").unwrap(), Value::from(1));
        assert_eq!(require.require("three").unwrap(), Value::from(3));
    }

    #[test]
    fn test_object_macro() {
        let obj = object! { "a" => 1, "b" => "two" };
        assert_eq!(obj.get("a"), Value::from(1));
        assert_eq!(obj.get("b"), Value::from("two"));
        assert!(object! {}.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_take_deps_mismatch() {
        let loader = Loader::new();
        let d = loader.define();
        d.define("short", ["require"], |module, deps| {
            let [_a, _b] = crate::define::take_deps::<2>(module, deps)?;
            Ok(Value::Undefined)
        });
        let err = loader.require().require("short").unwrap_err();
        assert!(matches!(
            err.root_cause(),
            LoaderError::ArityMismatch { expected: 2, actual: 1, .. }
        ));
    }
}
