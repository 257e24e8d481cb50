//! Hierarchical type identities.
//!
//! Every declared unit or quantity is identified by the fully-qualified name
//! of the type that carries the declaration, e.g. `Units.UnitOfLength` or
//! `Quantities.Length`. Identities are compared structurally and are the keys
//! of every population.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dot-separated, fully-qualified type name.
///
/// # Examples
///
/// ```
/// # use measures_ast::foundation::Path;
/// let path = Path::from("Quantities.Length");
/// assert_eq!(path.segments(), &["Quantities", "Length"]);
/// assert_eq!(path.last(), Some("Length"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Creates a new path from a list of segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parses a path from a dot-separated string.
    pub fn from_path_str(s: &str) -> Self {
        Self {
            segments: s.split('.').map(String::from).collect(),
        }
    }

    /// Get the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Get the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the last segment, i.e. the simple type name.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::from_path_str(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::from_path_str(&s)
    }
}

/// Identity of a declared unit or quantity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub Path);

impl TypeId {
    /// Creates a new identity from a path.
    pub fn new(p: impl Into<Path>) -> Self {
        Self(p.into())
    }

    /// Returns a reference to the underlying path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The simple (unqualified) type name.
    ///
    /// This is the name generated code would use, and therefore the name
    /// constants and unit instances must not collide with.
    pub fn name(&self) -> &str {
        self.0.last().unwrap_or_default()
    }

    /// At least one segment, and no empty segment.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.segments().iter().all(|s| !s.is_empty())
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeId {
    fn from(s: &str) -> Self {
        Self(Path::from_path_str(s))
    }
}

impl From<String> for TypeId {
    fn from(s: String) -> Self {
        Self(Path::from_path_str(&s))
    }
}

impl From<Path> for TypeId {
    fn from(p: Path) -> Self {
        Self(p)
    }
}
