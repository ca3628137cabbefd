//! State nodes: an initial value plus the actions and reducer that act on it.
//!
//! Handlers are written against the node's own value type `T` and mutate it
//! in place. Inside a compiled tree the node's value lives in the snapshot
//! as a [`StateValue`]; each handler call decodes it, runs the handler and
//! reconciles the result with the previous value, so fields the handler did
//! not change stay shared and a handler that changes nothing leaves the
//! snapshot identical.

use crate::action::{ErasedHandler, Handler, Payload, TypedHandler};
use crate::{Action, Path, ReducerError, ReducerResult, StateValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Values a node can hold.
pub trait NodeValue: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> NodeValue for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Whole-action reducer, erased over the node value type.
pub(crate) type ObserveFn =
    Arc<dyn Fn(&Path, &StateValue, &Action) -> ReducerResult<StateValue> + Send + Sync>;

type InitialFn = Box<dyn FnOnce(&Path) -> ReducerResult<StateValue> + Send + Sync>;

/// Decode the node value at `at`, let `f` mutate it, and fold the result
/// back into the snapshot representation.
fn rewrite<T: NodeValue>(
    at: &Path,
    current: &StateValue,
    f: impl FnOnce(&mut T),
) -> ReducerResult<StateValue> {
    let mut value: T = current.decode(at)?;
    f(&mut value);
    let json = serde_json::to_value(&value).map_err(|source| ReducerError::Encode {
        path: at.clone(),
        type_name: std::any::type_name::<T>(),
        source,
    })?;
    Ok(StateValue::reconcile(current, json))
}

/// A bundle of actions (and optionally a whole-action reducer) for nodes
/// holding a `T`.
///
/// Sets can be layered onto a node with [`Node::extend`], which is how
/// reusable behaviour is shared between nodes.
///
/// ```
/// use tirea_reducer::{ActionSet, Node};
///
/// fn resettable() -> ActionSet<i64> {
///     ActionSet::new().action("reset", |n: &mut i64, ()| *n = 0)
/// }
///
/// let node = Node::new(5i64)
///     .action("add", |n: &mut i64, by: i64| *n += by)
///     .extend(resettable());
/// assert_eq!(node.action_names().collect::<Vec<_>>(), ["add", "reset"]);
/// ```
pub struct ActionSet<T> {
    actions: Vec<(String, Arc<dyn ErasedHandler>)>,
    reducer: Option<ObserveFn>,
    _value: PhantomData<fn(T) -> T>,
}

impl<T: NodeValue> ActionSet<T> {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            reducer: None,
            _value: PhantomData,
        }
    }

    /// Declare an action.
    ///
    /// `A` is the payload the action creator takes: `()` for none, a plain
    /// type for one argument, a tuple for several. Declaring a name twice
    /// keeps the position of the first declaration and the handler of the
    /// last.
    pub fn action<A, F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        A: Payload,
        F: Fn(&mut T, A) + Send + Sync + 'static,
    {
        let handler: Handler<A> = Arc::new(move |at: &Path, current: &StateValue, args: A| {
            rewrite::<T>(at, current, |value| handler(value, args))
        });
        self.insert(name.into(), Arc::new(TypedHandler { handler }));
        self
    }

    /// Attach a reducer that sees every dispatched action.
    ///
    /// If a reducer is already attached, the new one runs after it.
    pub fn reducer<F>(mut self, reducer: F) -> Self
    where
        F: Fn(&mut T, &Action) + Send + Sync + 'static,
    {
        let observe: ObserveFn = Arc::new(move |at: &Path, current: &StateValue, action: &Action| {
            rewrite::<T>(at, current, |value| reducer(value, action))
        });
        self.chain_reducer(observe);
        self
    }

    /// Layer `other` on top of this set.
    pub fn merge(mut self, other: ActionSet<T>) -> Self {
        for (name, handler) in other.actions {
            self.insert(name, handler);
        }
        if let Some(observe) = other.reducer {
            self.chain_reducer(observe);
        }
        self
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|(name, _)| name.as_str())
    }

    fn insert(&mut self, name: String, handler: Arc<dyn ErasedHandler>) {
        match self.actions.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = handler,
            None => self.actions.push((name, handler)),
        }
    }

    fn chain_reducer(&mut self, next: ObserveFn) {
        self.reducer = Some(match self.reducer.take() {
            None => next,
            Some(first) => Arc::new(move |at: &Path, current: &StateValue, action: &Action| {
                let mid = first(at, current, action)?;
                next(at, &mid, action)
            }),
        });
    }
}

impl<T: NodeValue> Default for ActionSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ActionSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSet")
            .field(
                "actions",
                &self.actions.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .field("reducer", &self.reducer.is_some())
            .finish()
    }
}

/// The atomic unit of a state tree.
///
/// ```
/// use tirea_reducer::Node;
///
/// let toggle = Node::new(false).action("toggle", |on: &mut bool, ()| *on = !*on);
/// assert_eq!(*toggle.value(), false);
/// ```
pub struct Node<T> {
    value: T,
    set: ActionSet<T>,
}

impl<T: NodeValue> Node<T> {
    /// A node with `value` as its initial value and no actions.
    pub fn new(value: T) -> Self {
        Self {
            value,
            set: ActionSet::new(),
        }
    }

    /// Declare an action; see [`ActionSet::action`].
    pub fn action<A, F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        A: Payload,
        F: Fn(&mut T, A) + Send + Sync + 'static,
    {
        self.set = self.set.action(name, handler);
        self
    }

    /// Attach a whole-action reducer; see [`ActionSet::reducer`].
    pub fn reducer<F>(mut self, reducer: F) -> Self
    where
        F: Fn(&mut T, &Action) + Send + Sync + 'static,
    {
        self.set = self.set.reducer(reducer);
        self
    }

    /// Layer a preset action set onto this node.
    pub fn extend(mut self, set: ActionSet<T>) -> Self {
        self.set = self.set.merge(set);
        self
    }

    /// The initial value.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.set.action_names()
    }

    pub(crate) fn erase(self) -> AnyNode {
        let value = self.value;
        AnyNode {
            initial: Box::new(move |at: &Path| StateValue::encode(&value, at)),
            actions: self.set.actions,
            reducer: self.set.reducer,
            value_type: std::any::type_name::<T>(),
        }
    }
}

impl<T: NodeValue + fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value)
            .field("set", &self.set)
            .finish()
    }
}

/// A node with its value type erased, as stored in a [`StateTree`](crate::StateTree).
pub struct AnyNode {
    pub(crate) initial: InitialFn,
    pub(crate) actions: Vec<(String, Arc<dyn ErasedHandler>)>,
    pub(crate) reducer: Option<ObserveFn>,
    value_type: &'static str,
}

impl AnyNode {
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }
}

impl fmt::Debug for AnyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyNode")
            .field("value_type", &self.value_type)
            .field(
                "actions",
                &self.actions.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .field("reducer", &self.reducer.is_some())
            .finish()
    }
}
