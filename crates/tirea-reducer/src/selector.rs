//! Read-side selectors derived from the tree shape.
//!
//! Selectors are created once when a tree is compiled. Cloning one shares
//! the same allocation, so a selector handle can be stored and compared by
//! identity (e.g. as a memoization key in a UI binding).

use crate::{Path, ReducerResult, StateValue};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Reads the value at a fixed path of the full state.
#[derive(Clone, Debug)]
pub struct Selector(Arc<Path>);

impl Selector {
    pub(crate) fn new(path: Path) -> Self {
        Self(Arc::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The current value at this selector's path.
    pub fn select<'s>(&self, state: &'s StateValue) -> ReducerResult<&'s StateValue> {
        state.lookup(&self.0)
    }

    /// The current value decoded as `T`.
    pub fn select_as<T: DeserializeOwned>(&self, state: &StateValue) -> ReducerResult<T> {
        self.select(state)?.decode(&self.0)
    }

    /// Whether both handles come from the same compiled selector.
    pub fn ptr_eq(&self, other: &Selector) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Selectors of one node: the node value itself and each key of its
/// initial value when that value is an object.
#[derive(Clone, Debug)]
pub struct NodeSelectors {
    value: Selector,
    fields: IndexMap<String, Selector>,
}

impl NodeSelectors {
    pub(crate) fn new(path: &Path, initial: &StateValue) -> Self {
        let fields = initial
            .as_object()
            .map(|map| {
                map.keys()
                    .map(|key| (key.clone(), Selector::new(path.child(key.as_str()))))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            value: Selector::new(path.clone()),
            fields,
        }
    }

    /// Selector of the whole node value.
    pub fn value(&self) -> &Selector {
        &self.value
    }

    /// Selector of one key of the node value.
    pub fn field(&self, key: &str) -> Option<&Selector> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.fields.iter().map(|(k, s)| (k.as_str(), s))
    }
}

/// Tree of selectors mirroring the compiled state tree.
#[derive(Clone, Debug)]
pub enum SelectorTree {
    Node(NodeSelectors),
    Branch(IndexMap<String, SelectorTree>),
}

impl SelectorTree {
    pub fn get(&self, key: &str) -> Option<&SelectorTree> {
        match self {
            SelectorTree::Branch(children) => children.get(key),
            SelectorTree::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&NodeSelectors> {
        match self {
            SelectorTree::Node(node) => Some(node),
            SelectorTree::Branch(_) => None,
        }
    }

    /// Resolve a selector by path.
    ///
    /// The path walks branch keys down to a node; it may end at the node
    /// (selecting its whole value) or name one key of the node value.
    pub fn find(&self, path: &Path) -> Option<&Selector> {
        let mut current = self;
        let mut segments = path.iter();
        while let Some(seg) = segments.next() {
            let key = seg.as_key()?;
            match current {
                SelectorTree::Branch(children) => current = children.get(key)?,
                SelectorTree::Node(node) => {
                    return match segments.next() {
                        None => node.field(key),
                        Some(_) => None,
                    };
                }
            }
        }
        current.as_node().map(NodeSelectors::value)
    }

    /// Every selector in the tree, node value selectors first, in
    /// declaration order.
    pub fn all(&self) -> Vec<&Selector> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Selector>) {
        match self {
            SelectorTree::Node(node) => {
                out.push(&node.value);
                out.extend(node.fields.values());
            }
            SelectorTree::Branch(children) => {
                for child in children.values() {
                    child.collect(out);
                }
            }
        }
    }
}
