//! Error types for tree compilation and dispatch.

use crate::Path;
use thiserror::Error;

/// Result type alias for tirea-reducer operations.
pub type ReducerResult<T> = Result<T, ReducerError>;

/// Errors raised while compiling a tree or reducing an action.
#[derive(Debug, Error)]
pub enum ReducerError {
    /// Path does not exist in the snapshot.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: Path,
    },

    /// Array index is out of bounds.
    #[error("index {index} out of bounds (len: {len}) at path {path}")]
    IndexOutOfBounds {
        path: Path,
        index: usize,
        len: usize,
    },

    /// A segment could not be applied to the value found at `path`.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },

    /// Two entries of one tree level share a key.
    #[error("duplicate key `{key}` at {path}")]
    DuplicateKey { path: Path, key: String },

    /// A key cannot be used as a path segment.
    #[error("invalid key `{key}` at {path}: {reason}")]
    InvalidKey {
        path: Path,
        key: String,
        reason: &'static str,
    },

    /// Two actions in the tree resolve to the same type string.
    #[error("action type `{action_type}` is declared more than once")]
    DuplicateActionType { action_type: String },

    /// No action in the tree has the given type.
    #[error("unknown action type `{action_type}`")]
    UnknownActionType { action_type: String },

    /// An action creator was requested with a payload type other than the
    /// one its handler was declared with.
    #[error("action `{action_type}` takes `{expected}`, requested `{requested}`")]
    PayloadTypeMismatch {
        action_type: String,
        expected: &'static str,
        requested: &'static str,
    },

    /// The value at a node path does not deserialize into the node's type.
    #[error("cannot decode `{type_name}` at {path}: {source}")]
    Decode {
        path: Path,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A node value could not be serialized into a snapshot.
    #[error("cannot encode `{type_name}` at {path}: {source}")]
    Encode {
        path: Path,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReducerError {
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        ReducerError::PathNotFound { path }
    }

    #[inline]
    pub fn index_out_of_bounds(path: Path, index: usize, len: usize) -> Self {
        ReducerError::IndexOutOfBounds { path, index, len }
    }

    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        ReducerError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    #[inline]
    pub fn duplicate_key(path: Path, key: impl Into<String>) -> Self {
        ReducerError::DuplicateKey {
            path,
            key: key.into(),
        }
    }

    #[inline]
    pub fn invalid_key(path: Path, key: impl Into<String>, reason: &'static str) -> Self {
        ReducerError::InvalidKey {
            path,
            key: key.into(),
            reason,
        }
    }

    #[inline]
    pub fn unknown_action_type(action_type: impl Into<String>) -> Self {
        ReducerError::UnknownActionType {
            action_type: action_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn display_includes_path() {
        let err = ReducerError::path_not_found(path!("todos", "items"));
        assert_eq!(err.to_string(), "path not found: $.todos.items");
    }

    #[test]
    fn decode_error_keeps_source() {
        use std::error::Error as _;
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = ReducerError::Decode {
            path: path!("n"),
            type_name: "u8",
            source,
        };
        assert!(err.to_string().starts_with("cannot decode `u8` at $.n"));
        assert!(err.source().is_some());
    }
}
