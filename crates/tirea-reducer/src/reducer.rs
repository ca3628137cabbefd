//! The dispatch-time reducer.
//!
//! ```text
//! State' = observers(own(State, Action), Action)
//! ```
//!
//! - `own` applies the action's handler at the action's path; it runs only
//!   for actions created by this tree, every other action skips it
//! - `observers` applies every whole-action reducer at its node path, in
//!   tree declaration order, each seeing the state left by the previous one
//!
//! Both steps go through [`replace`], so a step that changes nothing keeps
//! the snapshot identical, and a step that changes one node shares every
//! other subtree with its input.

use crate::action::{Origin, TreeId};
use crate::node::ObserveFn;
use crate::{replace, Action, Path, ReducerResult, StateValue};
use std::fmt;
use std::sync::Arc;

/// A whole-action reducer anchored at its node path.
#[derive(Clone)]
pub(crate) struct Observer {
    pub(crate) path: Path,
    pub(crate) observe: ObserveFn,
}

struct Inner {
    tree: TreeId,
    initial: StateValue,
    observers: Vec<Observer>,
}

/// Reducer compiled from a state tree.
///
/// Cloning is cheap; all clones share the compiled tables. The reducer is a
/// pure function of its inputs, so it can be handed to any store runtime
/// that serializes dispatch.
#[derive(Clone)]
pub struct Reducer {
    inner: Arc<Inner>,
}

impl Reducer {
    pub(crate) fn new(tree: TreeId, initial: StateValue, observers: Vec<Observer>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tree,
                initial,
                observers,
            }),
        }
    }

    /// The compiled initial state.
    pub fn initial_state(&self) -> &StateValue {
        &self.inner.initial
    }

    /// Paths of nodes that declared a whole-action reducer, in the order
    /// they run.
    pub fn observer_paths(&self) -> impl Iterator<Item = &Path> {
        self.inner.observers.iter().map(|o| &o.path)
    }

    /// Reduce one action.
    ///
    /// `None` stands for the store's initialization call and is replaced by
    /// the initial state. Actions created by another compiled tree are
    /// handled like external ones: only whole-action reducers see them.
    pub fn reduce(&self, state: Option<&StateValue>, action: &Action) -> ReducerResult<StateValue> {
        let mut state = match state {
            Some(state) => state.clone(),
            None => self.inner.initial.clone(),
        };

        match action.origin() {
            Origin::Own { tree, path, apply } if *tree == self.inner.tree => {
                let next = replace(&state, path, |current| apply(current))?;
                tracing::trace!(
                    action_type = action.action_type(),
                    path = %path,
                    changed = !next.ptr_eq(&state),
                    "applied own action"
                );
                state = next;
            }
            Origin::Own { .. } => {
                tracing::trace!(
                    action_type = action.action_type(),
                    "action belongs to another tree, skipping own step"
                );
            }
            Origin::External => {}
        }

        for observer in &self.inner.observers {
            let next = replace(&state, &observer.path, |current| {
                (observer.observe)(&observer.path, current, action)
            })?;
            if !next.ptr_eq(&state) {
                tracing::trace!(
                    action_type = action.action_type(),
                    path = %observer.path,
                    "whole-action reducer changed state"
                );
            }
            state = next;
        }

        Ok(state)
    }

    /// Reduce a sequence of actions, starting from `state` (or the initial
    /// state).
    pub fn reduce_all<'a>(
        &self,
        state: Option<&StateValue>,
        actions: impl IntoIterator<Item = &'a Action>,
    ) -> ReducerResult<StateValue> {
        let start = match state {
            Some(state) => state.clone(),
            None => self.inner.initial.clone(),
        };
        actions
            .into_iter()
            .try_fold(start, |acc, action| self.reduce(Some(&acc), action))
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer")
            .field("observers", &self.observer_paths().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn counting_observer(at: Path) -> Observer {
        Observer {
            path: at,
            observe: Arc::new(|_at: &Path, current: &StateValue, action: &Action| {
                if action.action_type() == "tick" {
                    Ok(StateValue::from(json!(current.as_i64().unwrap_or(0) + 1)))
                } else {
                    Ok(current.clone())
                }
            }),
        }
    }

    #[test]
    fn none_state_starts_from_initial() {
        let reducer = Reducer::new(TreeId::next(), StateValue::from(json!({"n": 0})), vec![]);
        let state = reducer.reduce(None, &Action::external("noop", ())).unwrap();
        assert!(state.ptr_eq(reducer.initial_state()));
    }

    #[test]
    fn observers_see_external_actions() {
        let reducer = Reducer::new(
            TreeId::next(),
            StateValue::from(json!({"a": 0, "b": 0})),
            vec![counting_observer(path!("a")), counting_observer(path!("b"))],
        );
        let state = reducer.reduce(None, &Action::external("tick", ())).unwrap();
        assert_eq!(state, json!({"a": 1, "b": 1}));
    }

    #[test]
    fn unrelated_actions_keep_identity() {
        let reducer = Reducer::new(
            TreeId::next(),
            StateValue::from(json!({"a": 0})),
            vec![counting_observer(path!("a"))],
        );
        let start = reducer.initial_state().clone();
        let state = reducer
            .reduce(Some(&start), &Action::external("other", ()))
            .unwrap();
        assert!(state.ptr_eq(&start));
    }

    #[test]
    fn reduce_all_folds_in_order() {
        let reducer = Reducer::new(
            TreeId::next(),
            StateValue::from(json!({"a": 0})),
            vec![counting_observer(path!("a"))],
        );
        let ticks = vec![Action::external("tick", ()); 3];
        let state = reducer.reduce_all(None, &ticks).unwrap();
        assert_eq!(state, json!({"a": 3}));
        assert_eq!(reducer.observer_paths().collect::<Vec<_>>(), [&path!("a")]);
    }
}
