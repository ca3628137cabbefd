//! Immutable, structurally shared updates of a snapshot at a path.
//!
//! Every function here is pure: the input snapshot is never modified and
//! any other holder of it keeps seeing the same values. Only the containers
//! on the way from the root to the changed value are copied, and each copy
//! is shallow, so all untouched siblings stay shared with the input.
//!
//! ```
//! use tirea_reducer::{path, update, StateValue};
//! use serde_json::json;
//!
//! let state = StateValue::from(json!({"a": {"n": 1}, "b": {"n": 2}}));
//! let next = update(&state, &path!("a", "n"), |draft| {
//!     *draft = StateValue::from(json!(5));
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(next, json!({"a": {"n": 5}, "b": {"n": 2}}));
//! assert!(next.get_key("b").unwrap().ptr_eq(state.get_key("b").unwrap()));
//! assert_eq!(state, json!({"a": {"n": 1}, "b": {"n": 2}}));
//! ```

use crate::value::step;
use crate::{Path, ReducerError, ReducerResult, Seg, StateValue};

/// Apply `mutate` to a draft of the value at `path`.
///
/// The draft starts as an O(1) clone of the current value. Mutating it
/// through [`StateValue::as_object_mut`] / [`StateValue::as_array_mut`]
/// copies containers on write, so the current value is never aliased
/// mutably. If the draft ends up equal to the current value, `state`
/// itself is returned.
pub fn update<F>(state: &StateValue, path: &Path, mutate: F) -> ReducerResult<StateValue>
where
    F: FnOnce(&mut StateValue) -> ReducerResult<()>,
{
    replace(state, path, |current| {
        let mut draft = current.clone();
        mutate(&mut draft)?;
        Ok(draft)
    })
}

/// Replace the value at `path` with the one computed by `compute`.
///
/// Returns `state` unchanged when the computed value is identical to the
/// current one, or equal to it with object keys in the same order.
pub fn replace<F>(state: &StateValue, path: &Path, compute: F) -> ReducerResult<StateValue>
where
    F: FnOnce(&StateValue) -> ReducerResult<StateValue>,
{
    let current = state.lookup(path)?;
    let next = compute(current)?;
    if next.eq_ordered(current) {
        return Ok(state.clone());
    }
    splice(state, path.segments(), next, path, 0)
}

/// Set the value at `path`. The path must already exist.
pub fn set_at(state: &StateValue, path: &Path, value: StateValue) -> ReducerResult<StateValue> {
    replace(state, path, move |_| Ok(value))
}

/// Read the value at `path`.
pub fn get_at<'a>(state: &'a StateValue, path: &Path) -> ReducerResult<&'a StateValue> {
    state.lookup(path)
}

/// Rebuild `current` with `leaf` spliced in at `segments`.
///
/// Each level is a shallow copy: `Arc::make_mut` clones the container of
/// the input snapshot (it is always shared here), which clones only the
/// child handles.
fn splice(
    current: &StateValue,
    segments: &[Seg],
    leaf: StateValue,
    full_path: &Path,
    depth: usize,
) -> ReducerResult<StateValue> {
    let (seg, rest) = match segments.split_first() {
        None => return Ok(leaf),
        Some(split) => split,
    };

    let here = || full_path.prefix(depth + 1);
    let child = step(current, seg, here)?;
    let new_child = splice(child, rest, leaf, full_path, depth + 1)?;

    let mut copy = current.clone();
    match seg {
        Seg::Key(key) => {
            let map = copy
                .as_object_mut()
                .ok_or_else(|| ReducerError::type_mismatch(here(), "object", current.type_name()))?;
            let slot = map
                .get_mut(key)
                .ok_or_else(|| ReducerError::path_not_found(here()))?;
            *slot = new_child;
        }
        Seg::Index(index) => {
            let items = copy
                .as_array_mut()
                .ok_or_else(|| ReducerError::type_mismatch(here(), "array", current.type_name()))?;
            let len = items.len();
            let slot = items
                .get_mut(*index)
                .ok_or_else(|| ReducerError::index_out_of_bounds(here(), *index, len))?;
            *slot = new_child;
        }
    }
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn sample() -> StateValue {
        StateValue::from(json!({
            "x": {"y": {"z": {"count": 0}}, "other": [1, 2]},
            "sibling": {"keep": true}
        }))
    }

    #[test]
    fn update_copies_only_the_spine() {
        let state = sample();
        let next = update(&state, &path!("x", "y", "z"), |draft| {
            draft
                .as_object_mut()
                .unwrap()
                .insert("count".into(), StateValue::from(json!(1)));
            Ok(())
        })
        .unwrap();

        assert_eq!(next.pointer(&path!("x", "y", "z", "count")).unwrap(), &json!(1));
        assert!(!next.ptr_eq(&state));
        assert!(!next.get_key("x").unwrap().ptr_eq(state.get_key("x").unwrap()));
        assert!(next
            .get_key("sibling")
            .unwrap()
            .ptr_eq(state.get_key("sibling").unwrap()));
        assert!(next
            .pointer(&path!("x", "other"))
            .unwrap()
            .ptr_eq(state.pointer(&path!("x", "other")).unwrap()));
    }

    #[test]
    fn update_never_mutates_input() {
        let state = sample();
        let before = state.to_json();
        let _ = update(&state, &path!("x", "other"), |draft| {
            draft.as_array_mut().unwrap().push(StateValue::from(json!(3)));
            Ok(())
        })
        .unwrap();
        assert_eq!(state.to_json(), before);
    }

    #[test]
    fn noop_update_returns_same_snapshot() {
        let state = sample();
        let next = update(&state, &path!("x", "y"), |_| Ok(())).unwrap();
        assert!(next.ptr_eq(&state));
    }

    #[test]
    fn rewriting_an_equal_value_is_a_noop() {
        let state = sample();
        let next = set_at(&state, &path!("sibling"), StateValue::from(json!({"keep": true}))).unwrap();
        assert!(next.ptr_eq(&state));
    }

    #[test]
    fn reordering_keys_is_a_change() {
        let state = StateValue::from(json!({"cfg": {"a": 1, "b": 2}, "other": {"k": 0}}));
        let next = set_at(&state, &path!("cfg"), StateValue::from(json!({"b": 2, "a": 1}))).unwrap();
        assert!(!next.ptr_eq(&state));
        let keys: Vec<_> = next
            .get_key("cfg")
            .and_then(StateValue::as_object)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["b", "a"]);
        assert!(next.get_key("other").unwrap().ptr_eq(state.get_key("other").unwrap()));
    }

    #[test]
    fn splice_reports_missing_slots() {
        let state = sample();
        let err = splice(&state, path!("x", "gone").segments(), StateValue::Null, &path!("x", "gone"), 0)
            .unwrap_err();
        assert!(matches!(err, ReducerError::PathNotFound { path } if path == path!("x", "gone")));

        let rows = StateValue::from(json!([0]));
        let err = splice(&rows, path!(3).segments(), StateValue::Null, &path!(3), 0).unwrap_err();
        assert!(matches!(err, ReducerError::IndexOutOfBounds { index: 3, len: 1, .. }));
    }

    #[test]
    fn empty_path_replaces_the_root() {
        let state = StateValue::from(json!(41));
        let next = replace(&state, &Path::root(), |v| {
            Ok(StateValue::from(json!(v.as_i64().unwrap() + 1)))
        })
        .unwrap();
        assert_eq!(next, json!(42));
    }

    #[test]
    fn update_inside_arrays() {
        let state = StateValue::from(json!({"rows": [{"v": 1}, {"v": 2}]}));
        let next = set_at(&state, &path!("rows", 1, "v"), StateValue::from(json!(20))).unwrap();
        assert_eq!(next, json!({"rows": [{"v": 1}, {"v": 20}]}));
        assert!(next
            .pointer(&path!("rows", 0))
            .unwrap()
            .ptr_eq(state.pointer(&path!("rows", 0)).unwrap()));
    }

    #[test]
    fn missing_path_is_reported() {
        let state = sample();
        let err = set_at(&state, &path!("x", "nope", "deeper"), StateValue::Null).unwrap_err();
        assert!(matches!(err, ReducerError::PathNotFound { path } if path == path!("x", "nope")));
    }

    #[test]
    fn mutate_error_propagates_and_leaves_state_alone() {
        let state = sample();
        let err = update(&state, &path!("x"), |_| {
            Err(ReducerError::unknown_action_type("boom"))
        })
        .unwrap_err();
        assert!(matches!(err, ReducerError::UnknownActionType { .. }));
        assert_eq!(get_at(&state, &path!("sibling", "keep")).unwrap(), &json!(true));
    }
}
