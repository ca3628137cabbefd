//! Actions and typed action creators.
//!
//! An [`Action`] is a command record. Actions produced by a compiled tree
//! carry the node path and a closure applying the node's handler with the
//! captured, statically typed arguments; foreign actions
//! ([`Action::external`]) carry only a type and payload and are seen by
//! whole-action reducers alone.

use crate::{Path, ReducerError, ReducerResult, StateValue};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handler of one action, erased over the node value type.
pub(crate) type Handler<A> =
    Arc<dyn Fn(&Path, &StateValue, A) -> ReducerResult<StateValue> + Send + Sync>;

/// Closure embedded in an own action.
pub(crate) type ApplyFn = Arc<dyn Fn(&StateValue) -> ReducerResult<StateValue> + Send + Sync>;

/// Bound payload types for action creators.
pub trait Payload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<A> Payload for A where A: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Identity of one compiled tree. Own actions only apply in the tree that
/// created them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TreeId(u64);

impl TreeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TreeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub(crate) enum Origin {
    Own {
        tree: TreeId,
        path: Path,
        apply: ApplyFn,
    },
    External,
}

/// A dispatchable command.
#[derive(Clone)]
pub struct Action {
    action_type: Arc<str>,
    payload: Value,
    origin: Origin,
}

impl Action {
    /// An action that does not belong to any compiled tree.
    ///
    /// Only whole-action reducers react to it.
    pub fn external(action_type: impl Into<String>, payload: impl Serialize) -> Self {
        let action_type: Arc<str> = Arc::from(action_type.into());
        let payload = encode_payload(&action_type, &payload);
        Self {
            action_type,
            payload,
            origin: Origin::External,
        }
    }

    /// The action type string.
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// JSON form of the arguments the action was created with.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Decode the payload, `None` if it does not have the shape of `A`.
    pub fn payload_as<A: DeserializeOwned>(&self) -> Option<A> {
        serde_json::from_value(self.payload.clone()).ok()
    }

    /// Path of the node that owns this action, `None` for external actions.
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Own { path, .. } => Some(path),
            Origin::External => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.origin, Origin::External)
    }

    /// Whether this action was produced by `creator`, or by the creator of
    /// the same action in the same compiled tree.
    pub fn is<A>(&self, creator: &ActionCreator<A>) -> bool {
        match &self.origin {
            Origin::Own { tree, .. } => {
                *tree == creator.tree && *self.action_type == *creator.action_type
            }
            Origin::External => false,
        }
    }

    /// Wire form: `{"type": .., "payload": ..}`.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "type": &*self.action_type,
            "payload": self.payload,
        })
    }

    pub(crate) fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("type", &self.action_type)
            .field("payload", &self.payload)
            .field("path", &self.path())
            .finish()
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("Action", 2)?;
        out.serialize_field("type", &*self.action_type)?;
        out.serialize_field("payload", &self.payload)?;
        out.end()
    }
}

fn encode_payload<A: Serialize + ?Sized>(action_type: &str, args: &A) -> Value {
    match serde_json::to_value(args) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(action_type, error = %e, "action payload is not serializable");
            Value::Null
        }
    }
}

/// Creates actions for one declared node action.
///
/// The payload type `A` is fixed when the creator is bound, so every call
/// is checked at compile time.
pub struct ActionCreator<A> {
    tree: TreeId,
    action_type: Arc<str>,
    path: Path,
    handler: Handler<A>,
}

impl<A> Clone for ActionCreator<A> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            action_type: self.action_type.clone(),
            path: self.path.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<A> fmt::Debug for ActionCreator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("type", &self.action_type)
            .field("path", &self.path)
            .finish()
    }
}

impl<A: Payload> ActionCreator<A> {
    /// Create the action carrying `args`.
    pub fn create(&self, args: A) -> Action {
        let payload = encode_payload(&self.action_type, &args);
        let handler = self.handler.clone();
        let at = self.path.clone();
        let apply: ApplyFn =
            Arc::new(move |current: &StateValue| handler(&at, current, args.clone()));
        Action {
            action_type: self.action_type.clone(),
            payload,
            origin: Origin::Own {
                tree: self.tree,
                path: self.path.clone(),
                apply,
            },
        }
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActionCreator<()> {
    /// Create an action that takes no arguments.
    pub fn call(&self) -> Action {
        self.create(())
    }
}

/// Type-erased view of a declared handler.
pub(crate) trait ErasedHandler: Send + Sync {
    fn payload_type(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn create_from_json(&self, bound: &BoundAction, payload: Value) -> ReducerResult<Action>;
}

pub(crate) struct TypedHandler<A> {
    pub(crate) handler: Handler<A>,
}

impl<A: Payload> ErasedHandler for TypedHandler<A> {
    fn payload_type(&self) -> &'static str {
        std::any::type_name::<A>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn create_from_json(&self, bound: &BoundAction, payload: Value) -> ReducerResult<Action> {
        let args: A = serde_json::from_value(payload)?;
        let creator = ActionCreator {
            tree: bound.tree,
            action_type: bound.action_type.clone(),
            path: bound.path.clone(),
            handler: self.handler.clone(),
        };
        Ok(creator.create(args))
    }
}

/// A node action resolved to its position in the compiled tree.
#[derive(Clone)]
pub(crate) struct BoundAction {
    pub(crate) tree: TreeId,
    pub(crate) action_type: Arc<str>,
    pub(crate) path: Path,
    pub(crate) handler: Arc<dyn ErasedHandler>,
}

impl fmt::Debug for BoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction")
            .field("type", &self.action_type)
            .field("payload", &self.handler.payload_type())
            .finish()
    }
}

impl BoundAction {
    pub(crate) fn creator<A: Payload>(&self) -> ReducerResult<ActionCreator<A>> {
        let typed = self
            .handler
            .as_any()
            .downcast_ref::<TypedHandler<A>>()
            .ok_or_else(|| ReducerError::PayloadTypeMismatch {
                action_type: self.action_type.to_string(),
                expected: self.handler.payload_type(),
                requested: std::any::type_name::<A>(),
            })?;
        Ok(ActionCreator {
            tree: self.tree,
            action_type: self.action_type.clone(),
            path: self.path.clone(),
            handler: typed.handler.clone(),
        })
    }

    pub(crate) fn from_json(&self, payload: Value) -> ReducerResult<Action> {
        self.handler.create_from_json(self, payload)
    }
}

/// Action creators of a single node.
#[derive(Clone)]
pub struct NodeActions {
    path: Path,
    separator: Arc<str>,
    actions: IndexMap<String, BoundAction>,
}

impl NodeActions {
    pub(crate) fn new(
        path: Path,
        separator: Arc<str>,
        actions: IndexMap<String, BoundAction>,
    ) -> Self {
        Self {
            path,
            separator,
            actions,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared action names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// The type string `name` dispatches with.
    pub fn action_type(&self, name: &str) -> Option<&str> {
        self.actions.get(name).map(|b| &*b.action_type)
    }

    /// Bind the creator of `name` with payload type `A`.
    pub fn creator<A: Payload>(&self, name: &str) -> ReducerResult<ActionCreator<A>> {
        self.actions
            .get(name)
            .ok_or_else(|| {
                ReducerError::unknown_action_type(self.path.action_type(name, &self.separator))
            })?
            .creator()
    }
}

impl fmt::Debug for NodeActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeActions")
            .field("path", &self.path)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Tree of action creators mirroring the compiled state tree.
#[derive(Clone, Debug)]
pub enum ActionCreators {
    Node(NodeActions),
    Branch(IndexMap<String, ActionCreators>),
}

impl ActionCreators {
    /// Child subtree under `key`.
    pub fn get(&self, key: &str) -> Option<&ActionCreators> {
        match self {
            ActionCreators::Branch(children) => children.get(key),
            ActionCreators::Node(_) => None,
        }
    }

    /// Subtree at `path` (keys only).
    pub fn at(&self, path: &Path) -> Option<&ActionCreators> {
        path.iter().try_fold(self, |current, seg| current.get(seg.as_key()?))
    }

    pub fn as_node(&self) -> Option<&NodeActions> {
        match self {
            ActionCreators::Node(node) => Some(node),
            ActionCreators::Branch(_) => None,
        }
    }

    /// Bind a creator of this node.
    pub fn creator<A: Payload>(&self, name: &str) -> ReducerResult<ActionCreator<A>> {
        match self {
            ActionCreators::Node(node) => node.creator(name),
            ActionCreators::Branch(_) => Err(ReducerError::unknown_action_type(name)),
        }
    }

    /// All action types below this subtree, in declaration order.
    pub fn action_types(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_types(&mut out);
        out
    }

    fn collect_types(&self, out: &mut Vec<String>) {
        match self {
            ActionCreators::Node(node) => {
                out.extend(node.actions.values().map(|b| b.action_type.to_string()))
            }
            ActionCreators::Branch(children) => {
                for child in children.values() {
                    child.collect_types(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn adder() -> BoundAction {
        adder_in(TreeId::next())
    }

    fn adder_in(tree: TreeId) -> BoundAction {
        let handler: Handler<i64> = Arc::new(|_at: &Path, current: &StateValue, by: i64| {
            Ok(StateValue::from(json!(current.as_i64().unwrap_or(0) + by)))
        });
        BoundAction {
            tree,
            action_type: Arc::from("counter.add"),
            path: path!("counter"),
            handler: Arc::new(TypedHandler { handler }),
        }
    }

    #[test]
    fn created_action_carries_type_payload_and_path() {
        let creator = adder().creator::<i64>().unwrap();
        let action = creator.create(5);
        assert_eq!(action.action_type(), "counter.add");
        assert_eq!(action.payload(), &json!(5));
        assert_eq!(action.path(), Some(&path!("counter")));
        assert!(action.is(&creator));
        assert_eq!(action.to_json(), json!({"type": "counter.add", "payload": 5}));
    }

    #[test]
    fn embedded_apply_runs_the_handler() {
        let action = adder().creator::<i64>().unwrap().create(2);
        let Origin::Own { apply, .. } = action.origin() else {
            panic!("expected an own action");
        };
        let next = apply(&StateValue::from(json!(40))).unwrap();
        assert_eq!(next, json!(42));
        // applying twice uses the same captured arguments
        assert_eq!(apply(&next).unwrap(), json!(44));
    }

    #[test]
    fn wrong_payload_type_is_rejected() {
        let err = adder().creator::<String>().unwrap_err();
        match err {
            ReducerError::PayloadTypeMismatch {
                action_type,
                expected,
                requested,
            } => {
                assert_eq!(action_type, "counter.add");
                assert_eq!(expected, "i64");
                assert_eq!(requested, std::any::type_name::<String>());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_json_decodes_payload() {
        let action = adder().from_json(json!(7)).unwrap();
        assert_eq!(action.payload_as::<i64>(), Some(7));
        assert!(adder().from_json(json!("seven")).is_err());
    }

    #[test]
    fn external_actions_have_no_path() {
        let action = Action::external("app/reset", json!({"hard": true}));
        assert!(action.is_external());
        assert_eq!(action.path(), None);
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "app/reset", "payload": {"hard": true}})
        );
        let creator = adder().creator::<i64>().unwrap();
        assert!(!Action::external("counter.add", 1).is(&creator));
    }

    #[test]
    fn is_distinguishes_trees_with_the_same_type() {
        let tree = TreeId::next();
        let ours = adder_in(tree);
        let action = ours.creator::<i64>().unwrap().create(1);
        assert!(action.is(&adder_in(tree).creator::<i64>().unwrap()));
        assert!(!action.is(&adder().creator::<i64>().unwrap()));
    }

    #[test]
    fn from_json_keeps_the_tree_identity() {
        let bound = adder();
        let rebuilt = bound.from_json(json!(3)).unwrap();
        assert!(rebuilt.is(&bound.creator::<i64>().unwrap()));
    }
}
