//! The tree compiler.
//!
//! Walks a [`StateTree`] depth-first in declaration order and produces, in
//! one pass:
//!
//! - the initial state, shaped like the tree (branches become objects,
//!   nodes contribute their raw value)
//! - the action creator tree and a type → action registry
//! - the selector tree
//! - the ordered list of whole-action reducers

use crate::action::{BoundAction, TreeId};
use crate::node::AnyNode;
use crate::reducer::Observer;
use crate::selector::NodeSelectors;
use crate::tree::Branch;
use crate::{
    Action, ActionCreator, ActionCreators, NodeActions, Path, Payload, Reducer, ReducerError,
    ReducerResult, Selector, SelectorTree, StateMap, StateTree, StateValue,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Options controlling how a tree is compiled.
///
/// Deserializes with defaults for missing fields, so it can be embedded in
/// a host application's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Joins path keys and the action name into an action type.
    pub separator: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// The output of compiling a [`StateTree`].
#[derive(Clone, Debug)]
pub struct CompiledTree {
    actions: ActionCreators,
    selectors: SelectorTree,
    reducer: Reducer,
    registry: Arc<IndexMap<String, BoundAction>>,
    options: CompileOptions,
}

/// Wire form accepted by [`CompiledTree::action_from_json`].
#[derive(Deserialize)]
struct WireAction {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    payload: Value,
}

impl CompiledTree {
    pub fn initial_state(&self) -> &StateValue {
        self.reducer.initial_state()
    }

    pub fn actions(&self) -> &ActionCreators {
        &self.actions
    }

    pub fn selectors(&self) -> &SelectorTree {
        &self.selectors
    }

    pub fn reducer(&self) -> &Reducer {
        &self.reducer
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Reduce one action; see [`Reducer::reduce`].
    pub fn reduce(&self, state: Option<&StateValue>, action: &Action) -> ReducerResult<StateValue> {
        self.reducer.reduce(state, action)
    }

    /// Bind the creator of action `name` on the node at `path`.
    pub fn creator<A: Payload>(&self, path: &Path, name: &str) -> ReducerResult<ActionCreator<A>> {
        self.actions
            .at(path)
            .ok_or_else(|| ReducerError::path_not_found(path.clone()))?
            .creator(name)
    }

    /// Bind a creator by its full action type.
    pub fn creator_for_type<A: Payload>(&self, action_type: &str) -> ReducerResult<ActionCreator<A>> {
        self.registry
            .get(action_type)
            .ok_or_else(|| ReducerError::unknown_action_type(action_type))?
            .creator()
    }

    /// Resolve a selector; see [`SelectorTree::find`].
    pub fn selector(&self, path: &Path) -> Option<&Selector> {
        self.selectors.find(path)
    }

    /// All action types of the tree, in declaration order.
    pub fn action_types(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    /// Rebuild an action of this tree from its wire form
    /// (`{"type": .., "payload": ..}`), e.g. one recorded by a devtools
    /// listener.
    pub fn action_from_json(&self, value: &Value) -> ReducerResult<Action> {
        let wire: WireAction = serde_json::from_value(value.clone())?;
        self.registry
            .get(&wire.action_type)
            .ok_or_else(|| ReducerError::unknown_action_type(&wire.action_type))?
            .from_json(wire.payload)
    }
}

struct Collected {
    tree: TreeId,
    observers: Vec<Observer>,
    registry: IndexMap<String, BoundAction>,
    nodes: usize,
}

struct Compiled {
    state: StateValue,
    actions: ActionCreators,
    selectors: SelectorTree,
}

pub(crate) fn compile(tree: StateTree, options: &CompileOptions) -> ReducerResult<CompiledTree> {
    let separator: Arc<str> = Arc::from(options.separator.as_str());
    let mut collected = Collected {
        tree: TreeId::next(),
        observers: Vec::new(),
        registry: IndexMap::new(),
        nodes: 0,
    };
    let root = walk(tree, &Path::root(), &separator, &mut collected)?;

    tracing::debug!(
        nodes = collected.nodes,
        actions = collected.registry.len(),
        observers = collected.observers.len(),
        "compiled state tree"
    );

    Ok(CompiledTree {
        actions: root.actions,
        selectors: root.selectors,
        reducer: Reducer::new(collected.tree, root.state, collected.observers),
        registry: Arc::new(collected.registry),
        options: options.clone(),
    })
}

fn walk(
    tree: StateTree,
    path: &Path,
    separator: &Arc<str>,
    out: &mut Collected,
) -> ReducerResult<Compiled> {
    match tree {
        StateTree::Node(node) => compile_node(node, path, separator, out),
        StateTree::Branch(branch) => compile_branch(branch, path, separator, out),
    }
}

fn compile_branch(
    branch: Branch,
    path: &Path,
    separator: &Arc<str>,
    out: &mut Collected,
) -> ReducerResult<Compiled> {
    let mut state = StateMap::with_capacity(branch.entries.len());
    let mut actions = IndexMap::with_capacity(branch.entries.len());
    let mut selectors = IndexMap::with_capacity(branch.entries.len());

    for (key, child) in branch.entries {
        check_key(&key, path, separator)?;
        if state.contains_key(&key) {
            return Err(ReducerError::duplicate_key(path.clone(), key));
        }
        let child_path = path.child(key.as_str());
        let compiled = walk(child, &child_path, separator, out)?;
        state.insert(key.clone(), compiled.state);
        actions.insert(key.clone(), compiled.actions);
        selectors.insert(key, compiled.selectors);
    }

    Ok(Compiled {
        state: StateValue::Object(Arc::new(state)),
        actions: ActionCreators::Branch(actions),
        selectors: SelectorTree::Branch(selectors),
    })
}

fn compile_node(
    node: AnyNode,
    path: &Path,
    separator: &Arc<str>,
    out: &mut Collected,
) -> ReducerResult<Compiled> {
    let AnyNode {
        initial,
        actions,
        reducer,
        ..
    } = node;
    let state = initial(path)?;

    let mut bound = IndexMap::with_capacity(actions.len());
    for (name, handler) in actions {
        check_key(&name, path, separator)?;
        let action_type = path.action_type(&name, separator);
        if out.registry.contains_key(&action_type) {
            return Err(ReducerError::DuplicateActionType { action_type });
        }
        let action = BoundAction {
            tree: out.tree,
            action_type: Arc::from(action_type.as_str()),
            path: path.clone(),
            handler,
        };
        out.registry.insert(action_type, action.clone());
        bound.insert(name, action);
    }

    if let Some(observe) = reducer {
        out.observers.push(Observer {
            path: path.clone(),
            observe,
        });
    }
    out.nodes += 1;

    Ok(Compiled {
        selectors: SelectorTree::Node(NodeSelectors::new(path, &state)),
        actions: ActionCreators::Node(NodeActions::new(path.clone(), separator.clone(), bound)),
        state,
    })
}

fn check_key(key: &str, path: &Path, separator: &str) -> ReducerResult<()> {
    if key.is_empty() {
        return Err(ReducerError::invalid_key(path.clone(), key, "key is empty"));
    }
    if !separator.is_empty() && key.contains(separator) {
        return Err(ReducerError::invalid_key(
            path.clone(),
            key,
            "key contains the action type separator",
        ));
    }
    Ok(())
}
