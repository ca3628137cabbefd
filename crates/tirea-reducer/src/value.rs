//! Persistent JSON values for state snapshots.
//!
//! `StateValue` has the shape of `serde_json::Value`, but strings, arrays
//! and objects live behind `Arc`. Cloning a snapshot is O(1), and a new
//! snapshot shares every container it did not change with the one it was
//! derived from. Container identity is observable through
//! [`StateValue::ptr_eq`], which is what change detection downstream of the
//! reducer relies on.

use crate::{Path, ReducerError, ReducerResult, Seg};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use std::sync::Arc;

/// Object container type of a [`StateValue`].
pub type StateMap = IndexMap<String, StateValue>;

/// An immutable, structurally shared JSON value.
#[derive(Clone, Debug, Default)]
pub enum StateValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<StateValue>>),
    Object(Arc<StateMap>),
}

impl StateValue {
    /// Name of this value's JSON type.
    pub fn type_name(&self) -> &'static str {
        match self {
            StateValue::Null => "null",
            StateValue::Bool(_) => "boolean",
            StateValue::Number(_) => "number",
            StateValue::String(_) => "string",
            StateValue::Array(_) => "array",
            StateValue::Object(_) => "object",
        }
    }

    /// Identity comparison.
    ///
    /// Containers are identical when they share the same allocation; scalars
    /// are identical when they are equal.
    pub fn ptr_eq(&self, other: &StateValue) -> bool {
        match (self, other) {
            (StateValue::Null, StateValue::Null) => true,
            (StateValue::Bool(a), StateValue::Bool(b)) => a == b,
            (StateValue::Number(a), StateValue::Number(b)) => a == b,
            (StateValue::String(a), StateValue::String(b)) => Arc::ptr_eq(a, b) || a == b,
            (StateValue::Array(a), StateValue::Array(b)) => Arc::ptr_eq(a, b),
            (StateValue::Object(a), StateValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Structural equality that also requires object keys in the same
    /// order.
    ///
    /// `==` follows `serde_json` and ignores key order; change detection
    /// uses this instead, since key order is observable in the snapshot.
    pub fn eq_ordered(&self, other: &StateValue) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self, other) {
            (StateValue::Array(a), StateValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_ordered(y))
            }
            (StateValue::Object(a), StateValue::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.eq_ordered(vb))
            }
            _ => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StateValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&StateMap> {
        match self {
            StateValue::Object(map) => Some(&**map),
            _ => None,
        }
    }

    /// Mutable access to the object container, copying it first if it is
    /// shared with another snapshot.
    pub fn as_object_mut(&mut self) -> Option<&mut StateMap> {
        match self {
            StateValue::Object(map) => Some(Arc::make_mut(map)),
            _ => None,
        }
    }

    /// Mutable access to the array container, copying it first if it is
    /// shared with another snapshot.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<StateValue>> {
        match self {
            StateValue::Array(items) => Some(Arc::make_mut(items)),
            _ => None,
        }
    }

    /// Child at a single segment.
    pub fn get(&self, seg: &Seg) -> Option<&StateValue> {
        match (self, seg) {
            (StateValue::Object(map), Seg::Key(k)) => map.get(k),
            (StateValue::Array(items), Seg::Index(i)) => items.get(*i),
            _ => None,
        }
    }

    /// Child under an object key.
    pub fn get_key(&self, key: &str) -> Option<&StateValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Value at `path`, or `None` when any segment is missing.
    pub fn pointer(&self, path: &Path) -> Option<&StateValue> {
        path.iter().try_fold(self, |current, seg| current.get(seg))
    }

    /// Value at `path` with a precise error when it cannot be reached.
    pub fn lookup(&self, path: &Path) -> ReducerResult<&StateValue> {
        let mut current = self;
        for (depth, seg) in path.iter().enumerate() {
            current = step(current, seg, || path.prefix(depth + 1))?;
        }
        Ok(current)
    }

    /// Convert into a plain JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            StateValue::Null => Value::Null,
            StateValue::Bool(b) => Value::Bool(*b),
            StateValue::Number(n) => Value::Number(n.clone()),
            StateValue::String(s) => Value::String(s.to_string()),
            StateValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            StateValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Encode a typed value.
    pub fn encode<T: Serialize + ?Sized>(value: &T, at: &Path) -> ReducerResult<Self> {
        serde_json::to_value(value)
            .map(StateValue::from)
            .map_err(|source| ReducerError::Encode {
                path: at.clone(),
                type_name: std::any::type_name::<T>(),
                source,
            })
    }

    /// Decode into a typed value. `at` is only used for error reporting.
    pub fn decode<T: DeserializeOwned>(&self, at: &Path) -> ReducerResult<T> {
        serde_json::from_value(self.to_json()).map_err(|source| ReducerError::Decode {
            path: at.clone(),
            type_name: std::any::type_name::<T>(),
            source,
        })
    }

    /// Rebuild `new` while reusing every subtree of `old` it is equal to.
    ///
    /// If nothing differs the result is `old` itself, so identity checks on
    /// the result report "unchanged".
    pub fn reconcile(old: &StateValue, new: Value) -> StateValue {
        match (old, new) {
            (StateValue::Object(old_map), Value::Object(new_map)) => {
                let same_shape = old_map.len() == new_map.len()
                    && old_map.keys().zip(new_map.keys()).all(|(a, b)| a == b);
                let mut changed = !same_shape;
                let mut rebuilt = StateMap::with_capacity(new_map.len());
                for (key, new_child) in new_map {
                    let child = match old_map.get(&key) {
                        Some(old_child) => {
                            let child = Self::reconcile(old_child, new_child);
                            changed |= !child.ptr_eq(old_child);
                            child
                        }
                        None => StateValue::from(new_child),
                    };
                    rebuilt.insert(key, child);
                }
                if changed {
                    StateValue::Object(Arc::new(rebuilt))
                } else {
                    old.clone()
                }
            }
            (StateValue::Array(old_items), Value::Array(new_items)) => {
                let mut changed = old_items.len() != new_items.len();
                let rebuilt: Vec<StateValue> = new_items
                    .into_iter()
                    .enumerate()
                    .map(|(i, new_child)| match old_items.get(i) {
                        Some(old_child) => {
                            let child = Self::reconcile(old_child, new_child);
                            changed |= !child.ptr_eq(old_child);
                            child
                        }
                        None => StateValue::from(new_child),
                    })
                    .collect();
                if changed {
                    StateValue::Array(Arc::new(rebuilt))
                } else {
                    old.clone()
                }
            }
            (_, new) => {
                let new = StateValue::from(new);
                if new.ptr_eq(old) {
                    old.clone()
                } else {
                    new
                }
            }
        }
    }
}

/// Step one segment down, reporting where the walk stopped.
pub(crate) fn step<'a>(
    current: &'a StateValue,
    seg: &Seg,
    here: impl FnOnce() -> Path,
) -> ReducerResult<&'a StateValue> {
    match (current, seg) {
        (StateValue::Object(map), Seg::Key(k)) => {
            map.get(k).ok_or_else(|| ReducerError::path_not_found(here()))
        }
        (StateValue::Array(items), Seg::Index(i)) => items
            .get(*i)
            .ok_or_else(|| ReducerError::index_out_of_bounds(here(), *i, items.len())),
        (other, Seg::Key(_)) => Err(ReducerError::type_mismatch(
            here(),
            "object",
            other.type_name(),
        )),
        (other, Seg::Index(_)) => Err(ReducerError::type_mismatch(
            here(),
            "array",
            other.type_name(),
        )),
    }
}

impl PartialEq for StateValue {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self, other) {
            (StateValue::String(a), StateValue::String(b)) => a == b,
            (StateValue::Array(a), StateValue::Array(b)) => a == b,
            (StateValue::Object(a), StateValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for StateValue {}

impl PartialEq<Value> for StateValue {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (StateValue::Null, Value::Null) => true,
            (StateValue::Bool(a), Value::Bool(b)) => a == b,
            (StateValue::Number(a), Value::Number(b)) => a == b,
            (StateValue::String(a), Value::String(b)) => a.as_ref() == b.as_str(),
            (StateValue::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
            }
            (StateValue::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map_or(false, |other| v == other))
            }
            _ => false,
        }
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => StateValue::Null,
            Value::Bool(b) => StateValue::Bool(b),
            Value::Number(n) => StateValue::Number(n),
            Value::String(s) => StateValue::String(Arc::from(s)),
            Value::Array(items) => {
                StateValue::Array(Arc::new(items.into_iter().map(StateValue::from).collect()))
            }
            Value::Object(map) => StateValue::Object(Arc::new(
                map.into_iter()
                    .map(|(k, v)| (k, StateValue::from(v)))
                    .collect(),
            )),
        }
    }
}

impl From<&StateValue> for Value {
    fn from(value: &StateValue) -> Self {
        value.to_json()
    }
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StateValue::Null => serializer.serialize_unit(),
            StateValue::Bool(b) => serializer.serialize_bool(*b),
            StateValue::Number(n) => n.serialize(serializer),
            StateValue::String(s) => serializer.serialize_str(s),
            StateValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            StateValue::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(StateValue::from)
    }
}
