//! Compile a declarative tree of state nodes into a reducer.
//!
//! `tirea-reducer` removes the boilerplate of hand-written reducers. A tree
//! of [`Node`]s is compiled once into:
//!
//! - an initial state shaped like the tree
//! - a tree of typed [`ActionCreator`]s with namespaced action types
//! - a tree of [`Selector`]s
//! - a single [`Reducer`] to hand to the store runtime
//!
//! # Core Concepts
//!
//! - **Node**: an initial value, named actions that mutate it, and an
//!   optional whole-action reducer that sees every dispatched action
//! - **StateTree**: nodes and nested branches, keyed per level
//! - **Path**: the keys leading to a node; also the prefix of its action types
//! - **StateValue**: the immutable, structurally shared snapshot type
//!
//! # Reduction
//!
//! ```text
//! State' = reduce(State, Action)
//! ```
//!
//! - only the containers on the path to a changed node are copied
//! - a reduction that changes nothing returns the input snapshot itself
//! - the input snapshot is never mutated
//!
//! # Quick Start
//!
//! ```
//! use tirea_reducer::{path, Branch, Node};
//! use serde_json::json;
//!
//! let compiled = Branch::new()
//!     .with("counter", Node::new(0i64).action("add", |n: &mut i64, by: i64| *n += by))
//!     .with(
//!         "log",
//!         Node::new(Vec::<String>::new())
//!             .reducer(|log: &mut Vec<String>, action| log.push(action.action_type().to_string())),
//!     )
//!     .compile()
//!     .unwrap();
//!
//! let add = compiled.creator::<i64>(&path!("counter"), "add").unwrap();
//! let action = add.create(5);
//! assert_eq!(action.action_type(), "counter.add");
//!
//! let state = compiled.reduce(None, &action).unwrap();
//! assert_eq!(state, json!({"counter": 5, "log": ["counter.add"]}));
//!
//! let count = compiled.selector(&path!("counter")).unwrap();
//! assert_eq!(count.select_as::<i64>(&state).unwrap(), 5);
//! ```

mod action;
mod compile;
mod error;
mod node;
mod path;
mod reducer;
mod selector;
mod tree;
mod update;
mod value;

pub use action::{Action, ActionCreator, ActionCreators, NodeActions, Payload};
pub use compile::{CompileOptions, CompiledTree};
pub use error::{ReducerError, ReducerResult};
pub use node::{ActionSet, AnyNode, Node, NodeValue};
pub use path::{Path, Seg};
pub use reducer::Reducer;
pub use selector::{NodeSelectors, Selector, SelectorTree};
pub use tree::{Branch, StateTree};
pub use update::{get_at, replace, set_at, update};
pub use value::{StateMap, StateValue};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
