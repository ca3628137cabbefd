//! Declarative state trees.

use crate::node::{AnyNode, NodeValue};
use crate::{CompileOptions, CompiledTree, Node, ReducerResult};

/// A tree of nodes: either a single node or a branch of keyed subtrees.
///
/// ```
/// use tirea_reducer::{Branch, Node, StateTree};
///
/// let tree: StateTree = Branch::new()
///     .with("a", Node::new(1i64))
///     .with("b", Branch::new().with("c", Node::new("two".to_string())))
///     .into();
/// let compiled = tree.compile().unwrap();
/// assert_eq!(
///     compiled.initial_state().to_json(),
///     serde_json::json!({"a": 1, "b": {"c": "two"}})
/// );
/// ```
#[derive(Debug)]
pub enum StateTree {
    Node(AnyNode),
    Branch(Branch),
}

impl StateTree {
    /// Start a branch; same as [`Branch::new`].
    pub fn branch() -> Branch {
        Branch::new()
    }

    /// Compile with default options.
    pub fn compile(self) -> ReducerResult<CompiledTree> {
        self.compile_with(&CompileOptions::default())
    }

    /// Compile with explicit options.
    pub fn compile_with(self, options: &CompileOptions) -> ReducerResult<CompiledTree> {
        crate::compile::compile(self, options)
    }
}

/// Ordered, keyed children of a tree level.
#[derive(Debug, Default)]
pub struct Branch {
    pub(crate) entries: Vec<(String, StateTree)>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child. Keys must be unique per level; duplicates are reported
    /// when the tree is compiled.
    pub fn with(mut self, key: impl Into<String>, child: impl Into<StateTree>) -> Self {
        self.entries.push((key.into(), child.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn compile(self) -> ReducerResult<CompiledTree> {
        StateTree::Branch(self).compile()
    }

    pub fn compile_with(self, options: &CompileOptions) -> ReducerResult<CompiledTree> {
        StateTree::Branch(self).compile_with(options)
    }
}

impl<T: NodeValue> From<Node<T>> for StateTree {
    fn from(node: Node<T>) -> Self {
        StateTree::Node(node.erase())
    }
}

impl From<Branch> for StateTree {
    fn from(branch: Branch) -> Self {
        StateTree::Branch(branch)
    }
}

impl<T: NodeValue> Node<T> {
    /// Compile this node as a bare single-node tree.
    pub fn compile(self) -> ReducerResult<CompiledTree> {
        StateTree::from(self).compile()
    }
}
