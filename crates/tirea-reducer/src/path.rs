//! Paths addressing a location inside a state tree.
//!
//! A path is the ordered list of keys leading from the root of a compiled
//! tree to a node, optionally continuing into the node's own value. The same
//! path is used to address state and to derive the action type string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single step in a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl Seg {
    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, ".{}", k),
            Seg::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<&String> for Seg {
    fn from(s: &String) -> Self {
        Seg::Key(s.clone())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// Location of a value inside a state snapshot.
///
/// The empty path addresses the whole snapshot, which is where a bare
/// single-node tree keeps its value.
///
/// ```
/// use tirea_reducer::{path, Path};
///
/// let p = Path::root().key("todos").key("items");
/// assert_eq!(p, path!("todos", "items"));
/// assert_eq!(p.to_string(), "$.todos.items");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The empty path.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Append a key segment (builder).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Push a segment onto the path.
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    /// Return a new path extended by one segment.
    #[inline]
    pub fn child(&self, seg: impl Into<Seg>) -> Path {
        let mut p = self.clone();
        p.0.push(seg.into());
        p
    }

    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Prefix of the first `len` segments.
    #[inline]
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Check whether this path is a prefix of `other` (or equal to it).
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }

    /// Join the segments and a trailing action name into an action type.
    ///
    /// Index segments are rendered as their decimal position. An empty path
    /// yields the bare name.
    ///
    /// ```
    /// use tirea_reducer::path;
    ///
    /// assert_eq!(path!("x", "y", "z").action_type("w", "."), "x.y.z.w");
    /// assert_eq!(path!().action_type("increment", "."), "increment");
    /// ```
    pub fn action_type(&self, name: &str, separator: &str) -> String {
        let mut out = String::new();
        for seg in &self.0 {
            match seg {
                Seg::Key(k) => out.push_str(k),
                Seg::Index(i) => out.push_str(&i.to_string()),
            }
            out.push_str(separator);
        }
        out.push_str(name);
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.0 {
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a [`Path`] from keys and indices.
///
/// ```
/// use tirea_reducer::{path, Seg};
///
/// let p = path!("lists", 2, "title");
/// assert_eq!(p[1], Seg::Index(2));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}
