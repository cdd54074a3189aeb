// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Values exported by modules.
//!
//! Objects and functions are reference types: cloning a [`Value`] holding one
//! shares it, and equality compares identity the way `===` does.

use crate::error::Result;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Insertion-ordered property storage
pub type PropertyMap = IndexMap<String, Value, FxBuildHasher>;

/// A value exported by a module
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Shared object reference
    Object(JsObject),
    /// Shared native function reference
    Function(NativeFunction),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN never equals itself, same as f64
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true for everything except objects and functions.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::Function(_))
    }

    /// Borrow the object handle, if this is an object.
    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Borrow the function handle, if this is a function.
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Borrow the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Property lookup that yields `Undefined` for missing keys and non-objects.
    pub fn get(&self, key: &str) -> Value {
        self.as_object()
            .and_then(|obj| obj.get(key))
            .unwrap_or_default()
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Convert a JSON document into a value.
    ///
    /// Arrays become index-keyed objects carrying a `length` property.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => {
                let obj = JsObject::new();
                for (i, v) in arr.iter().enumerate() {
                    obj.set(i.to_string(), Value::from_json(v));
                }
                obj.set("length", Value::Number(arr.len() as f64));
                Value::Object(obj)
            }
            serde_json::Value::Object(map) => {
                let obj = JsObject::new();
                for (k, v) in map {
                    obj.set(k.clone(), Value::from_json(v));
                }
                Value::Object(obj)
            }
        }
    }

    /// Convert this value into JSON.
    ///
    /// Functions, `undefined` and repeated references to an object that is
    /// already being serialized become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut visiting = Vec::new();
        self.to_json_inner(&mut visiting)
    }

    fn to_json_inner(&self, visiting: &mut Vec<JsObject>) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Object(obj) => {
                if visiting.iter().any(|seen| seen.ptr_eq(obj)) {
                    return serde_json::Value::Null;
                }
                visiting.push(obj.clone());
                let mut map = serde_json::Map::new();
                for (key, value) in obj.entries() {
                    if value.as_object().is_some_and(|inner| inner.ptr_eq(obj)) {
                        continue;
                    }
                    map.insert(key, value.to_json_inner(visiting));
                }
                visiting.pop();
                serde_json::Value::Object(map)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(func) => write!(f, "[Function: {}]", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<JsObject> for Value {
    fn from(obj: JsObject) -> Self {
        Value::Object(obj)
    }
}

impl From<NativeFunction> for Value {
    fn from(func: NativeFunction) -> Self {
        Value::Function(func)
    }
}

#[derive(Default)]
struct ObjectData {
    properties: PropertyMap,
    /// Set by default-export synthesis: `default` resolves to the object itself.
    default_is_self: bool,
}

/// A shared, mutable, insertion-ordered property bag.
///
/// A self-referential `default` is stored as a flag rather than as a
/// property so that synthesized default exports do not form an `Rc` cycle.
#[derive(Clone, Default)]
pub struct JsObject(Rc<RefCell<ObjectData>>);

impl JsObject {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object from key/value pairs.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let obj = Self::new();
        for (key, value) in entries {
            obj.set(key, value);
        }
        obj
    }

    /// Gets a property value.
    pub fn get(&self, key: &str) -> Option<Value> {
        let data = self.0.borrow();
        if key == "default" && data.default_is_self {
            return Some(Value::Object(self.clone()));
        }
        data.properties.get(key).cloned()
    }

    /// Sets a property value.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut data = self.0.borrow_mut();
        if key == "default" {
            data.default_is_self = false;
        }
        data.properties.insert(key, value);
    }

    /// Deletes a property, returning whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut data = self.0.borrow_mut();
        if key == "default" && data.default_is_self {
            data.default_is_self = false;
            return true;
        }
        data.properties.shift_remove(key).is_some()
    }

    /// Checks if a property exists.
    pub fn has(&self, key: &str) -> bool {
        let data = self.0.borrow();
        (key == "default" && data.default_is_self) || data.properties.contains_key(key)
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    /// Snapshot of all properties in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let data = self.0.borrow();
        let mut entries: Vec<(String, Value)> = data
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if data.default_is_self {
            entries.push(("default".to_string(), Value::Object(self.clone())));
        }
        entries
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        let data = self.0.borrow();
        data.properties.len() + usize::from(data.default_is_self)
    }

    /// Whether the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Re-expose the object as its own `default` property.
    pub(crate) fn set_default_to_self(&self) {
        let mut data = self.0.borrow_mut();
        data.properties.shift_remove("default");
        data.default_is_self = true;
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject").field("keys", &self.keys()).finish()
    }
}

type NativeFn = dyn Fn(&[Value]) -> Result<Value>;

/// A named Rust closure that modules can export as a function value
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    /// Wrap a closure as a function value
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Self {
            name: Rc::from(name.into()),
            func: Rc::new(func),
        }
    }

    /// The function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_identity() {
        let a = JsObject::new();
        let b = a.clone();
        let c = JsObject::new();
        assert_eq!(Value::Object(a.clone()), Value::Object(b));
        assert_ne!(Value::Object(a), Value::Object(c));
    }

    #[test]
    fn test_nan_is_not_equal() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_eq!(Value::Number(1.0), Value::from(1));
    }

    #[test]
    fn test_default_is_self() {
        let obj = JsObject::from_entries([("zapp", Value::from(1))]);
        assert!(!obj.has("default"));

        obj.set_default_to_self();
        assert!(obj.has("default"));
        assert_eq!(obj.get("default"), Some(Value::Object(obj.clone())));
        assert_eq!(obj.keys(), vec!["zapp".to_string(), "default".to_string()]);

        obj.set("default", Value::from("explicit"));
        assert_eq!(obj.get("default"), Some(Value::from("explicit")));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn test_delete_preserves_order() {
        let obj = JsObject::from_entries([
            ("a", Value::from(1)),
            ("b", Value::from(2)),
            ("c", Value::from(3)),
        ]);
        assert!(obj.delete("b"));
        assert!(!obj.delete("b"));
        assert_eq!(obj.keys(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_json_conversion() {
        let value = Value::from_json(&json!({ "name": "foo", "tags": ["a", "b"], "n": 2 }));
        assert_eq!(value.get("name"), Value::from("foo"));
        assert_eq!(value.get("tags").get("length"), Value::from(2));
        assert_eq!(value.get("tags").get("1"), Value::from("b"));
        assert_eq!(value.to_json()["n"], json!(2.0));
    }

    #[test]
    fn test_to_json_skips_self_default() {
        let obj = JsObject::from_entries([("zapp", Value::from(1))]);
        obj.set_default_to_self();
        assert_eq!(Value::Object(obj).to_json(), json!({ "zapp": 1.0 }));
    }

    #[test]
    fn test_native_function() {
        let double = NativeFunction::new("double", |args| {
            let n = args.first().and_then(Value::as_number).unwrap_or(0.0);
            Ok(Value::Number(n * 2.0))
        });
        assert_eq!(double.call(&[Value::from(21)]).unwrap(), Value::from(42));
        assert_eq!(Value::from(double).to_string(), "[Function: double]");
    }
}
