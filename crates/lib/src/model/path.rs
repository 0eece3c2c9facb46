//! Path types for addressing nodes in a [`Model`](super::Model) document.
//!
//! Paths are dot separated strings such as `"info.users.1.name"`. Before any
//! traversal they are parsed into typed [`Segment`]s so the resolver never
//! has to guess whether a component is an object key or an array index.
//!
//! # Usage
//!
//! ```rust
//! use livemodel::model::path::{PathBuf, Segment};
//!
//! // Parsing normalises stray dots
//! let path = PathBuf::parse("info..users.1.");
//! assert_eq!(path.to_string(), "info.users.1");
//! assert_eq!(path.segments()[2], Segment::Index(1));
//!
//! // Build incrementally
//! let path = PathBuf::root().push("info").push(1usize);
//! assert_eq!(path.to_string(), "info.1");
//! ```

use std::{fmt, str::FromStr};

/// A single component of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object key.
    Key(String),
    /// Array index. Used against an object it acts as the key of the same spelling.
    Index(usize),
}

impl Segment {
    /// Classifies a raw component.
    ///
    /// Only canonical decimal numbers become indices, so `"007"` stays a key
    /// and keeps addressing the same object entry it was written with.
    pub fn parse(component: &str) -> Self {
        if !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = component.parse::<usize>() {
                if index.to_string() == component {
                    return Segment::Index(index);
                }
            }
        }
        Segment::Key(component.to_string())
    }

    /// Returns the index if this segment is numeric.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }

    /// The object key this segment addresses.
    pub fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{k}"),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::parse(s)
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::parse(&s)
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

/// An owned, parsed path.
///
/// The empty path addresses the document root. Two paths are equal when their
/// segments are equal, so `"a.1"` and `"a..1"` compare equal after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathBuf {
    segments: Vec<Segment>,
}

impl PathBuf {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path string.
    ///
    /// Never fails: empty components from leading, trailing or doubled dots
    /// are dropped, so `"..."` is the root.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|c| !c.is_empty())
                .map(Segment::parse)
                .collect(),
        }
    }

    /// Creates a path from already parsed segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Appends a segment (or a dotted sub-path given as a string).
    pub fn push(mut self, segment: impl Into<PathPart>) -> Self {
        match segment.into() {
            PathPart::Segment(s) => self.segments.push(s),
            PathPart::Path(p) => self.segments.extend(p.segments),
        }
        self
    }

    /// Joins this path with another path.
    pub fn join(mut self, other: &PathBuf) -> Self {
        self.segments.extend(other.segments.iter().cloned());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Returns the number of segments in the path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the parent path, or `None` if this is the root.
    pub fn parent(&self) -> Option<PathBuf> {
        if self.segments.is_empty() {
            None
        } else {
            Some(PathBuf {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Returns the last segment, or `None` for the root.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns `true` if `self` equals `other` or lies underneath it.
    pub fn starts_with(&self, other: &PathBuf) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

/// Anything that can be appended to a [`PathBuf`].
#[derive(Debug, Clone)]
pub enum PathPart {
    Segment(Segment),
    Path(PathBuf),
}

impl From<&str> for PathPart {
    fn from(s: &str) -> Self {
        PathPart::Path(PathBuf::parse(s))
    }
}

impl From<String> for PathPart {
    fn from(s: String) -> Self {
        PathPart::Path(PathBuf::parse(&s))
    }
}

impl From<usize> for PathPart {
    fn from(i: usize) -> Self {
        PathPart::Segment(Segment::Index(i))
    }
}

impl From<Segment> for PathPart {
    fn from(s: Segment) -> Self {
        PathPart::Segment(s)
    }
}

impl From<&PathBuf> for PathPart {
    fn from(p: &PathBuf) -> Self {
        PathPart::Path(p.clone())
    }
}

impl FromStr for PathBuf {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PathBuf {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for PathBuf {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&String> for PathBuf {
    fn from(s: &String) -> Self {
        Self::parse(s)
    }
}

impl From<&PathBuf> for PathBuf {
    fn from(path: &PathBuf) -> Self {
        path.clone()
    }
}

impl From<Vec<Segment>> for PathBuf {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

/// The dotted form. The root renders as the empty string so it can be used as a key.
impl fmt::Display for PathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Builds a [`PathBuf`] from components.
///
/// ```rust
/// # use livemodel::path;
/// let p = path!("info.users", 1usize, "name");
/// assert_eq!(p.to_string(), "info.users.1.name");
/// assert!(path!().is_root());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::model::path::PathBuf::root()
    };
    ($($part:expr),+ $(,)?) => {
        $crate::model::path::PathBuf::root()$(.push($part))+
    };
}
