//! Path expressions for navigating document structure.
//!
//! A path is a slash-delimited sequence of segments addressing a location in
//! a JSON document. Each segment names an object property and may carry an
//! array index in bracket notation: `/users[0]/name`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Marker prefix for capture segments in path patterns.
const CAPTURE_MARKER: char = ':';

/// A single segment in a path expression.
///
/// The segment addresses the object property `key`; when `index` is set the
/// segment additionally indexes into the array stored under that property.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seg {
    /// Object property name.
    pub key: String,
    /// Array index for `key[index]` segments.
    pub index: Option<usize>,
}

impl Seg {
    /// Create a plain property segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg {
            key: k.into(),
            index: None,
        }
    }

    /// Create an indexed segment (`key[index]`).
    #[inline]
    pub fn indexed(k: impl Into<String>, index: usize) -> Self {
        Seg {
            key: k.into(),
            index: Some(index),
        }
    }

    /// Returns true if this segment indexes into an array.
    #[inline]
    pub fn is_array(&self) -> bool {
        self.index.is_some()
    }

    /// Parse one token of a path expression.
    ///
    /// A trailing `[<digits>]` group splits the token into property and
    /// index; anything else is taken verbatim as a property name.
    pub fn parse_token(token: &str) -> Self {
        if let Some(open) = token.rfind('[') {
            if let Some(inner) = token[open..]
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(index) = inner.parse::<usize>() {
                        return Seg {
                            key: token[..open].to_string(),
                            index: Some(index),
                        };
                    }
                }
            }
        }
        Seg::key(token)
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.key, i),
            None => write!(f, "{}", self.key),
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::parse_token(s)
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::parse_token(&s)
    }
}

/// A complete path into a document.
///
/// Paths are immutable sequences of segments. The canonical string form
/// starts with a single `/`; the empty path serializes as exactly `/`.
///
/// # Examples
///
/// ```
/// use arbor_state::Path;
///
/// let path = Path::parse("/users[0]/name");
/// assert_eq!(path.len(), 2);
/// assert_eq!(path.to_string(), "/users[0]/name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Path(segments)
    }

    /// Parse a path expression.
    ///
    /// The empty string and the bare delimiter both yield the root path.
    /// A single leading delimiter is stripped; empty tokens are skipped.
    pub fn parse(expr: &str) -> Self {
        let trimmed = expr.strip_prefix('/').unwrap_or(expr);
        Path(
            trimmed
                .split('/')
                .filter(|token| !token.is_empty())
                .map(Seg::parse_token)
                .collect(),
        )
    }

    /// Append a property segment and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::key(k));
        self
    }

    /// Append an indexed segment and return self (builder pattern).
    #[inline]
    pub fn indexed(mut self, k: impl Into<String>, index: usize) -> Self {
        self.0.push(Seg::indexed(k, index));
        self
    }

    /// Push a segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    /// Pop the last segment from the path.
    #[inline]
    pub fn pop(&mut self) -> Option<Seg> {
        self.0.pop()
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last segment.
    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Get the parent path (path without the last segment).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Check if this path is a strict or equal prefix of another path.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_state::Path;
    ///
    /// let parent = Path::parse("/user");
    /// let child = Path::parse("/user/name");
    /// assert!(parent.is_prefix_of(&child));
    /// assert!(!child.is_prefix_of(&parent));
    /// ```
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Check if this path starts with another path.
    #[inline]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }

    /// Resolve a relative path expression against this path.
    ///
    /// Rules, in order: an expression with a leading delimiter is already
    /// absolute and is parsed as-is; `..` drops the last segment; one or
    /// more leading `../` groups drop that many trailing segments (clamped
    /// at root) before the remainder is appended; anything else is appended
    /// after the current segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_state::Path;
    ///
    /// let base = Path::parse("/users");
    /// assert_eq!(base.resolve("[0]").to_string(), "/users[0]");
    /// assert_eq!(base.resolve("/settings").to_string(), "/settings");
    /// assert_eq!(Path::parse("/a/b").resolve("..").to_string(), "/a");
    /// ```
    pub fn resolve(&self, relative: &str) -> Path {
        if relative.starts_with('/') {
            return Path::parse(relative);
        }
        if relative == ".." {
            return self.parent().unwrap_or_default();
        }

        let mut up = 0usize;
        let mut rest = relative;
        while let Some(stripped) = rest.strip_prefix("../") {
            up += 1;
            rest = stripped;
        }
        if rest == ".." {
            up += 1;
            rest = "";
        }

        let keep = self.0.len().saturating_sub(up);
        let mut result = Path(self.0[..keep].to_vec());
        result.append_relative(&Path::parse(rest));
        result
    }

    /// Append segments of a parsed relative expression.
    ///
    /// A leading bare-index segment (`[0]`) attaches its index to the last
    /// existing segment instead of opening a new one, so that resolving
    /// `[0]` against `/users` yields `/users[0]`.
    fn append_relative(&mut self, relative: &Path) {
        let mut segs = relative.0.iter();
        if let Some(first) = segs.next() {
            match (first.key.is_empty(), first.index, self.0.last_mut()) {
                (true, Some(index), Some(last)) if last.index.is_none() => {
                    last.index = Some(index);
                }
                _ => self.0.push(first.clone()),
            }
            self.0.extend(segs.cloned());
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for seg in &self.0 {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Seg;
    type IntoIter = std::vec::IntoIter<Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
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

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expr = String::deserialize(deserializer)?;
        if expr.is_empty() || expr.starts_with('/') {
            Ok(Path::parse(&expr))
        } else {
            Err(D::Error::custom(format!(
                "path expression must be absolute: {expr}"
            )))
        }
    }
}

/// Match a parameterized path pattern against a concrete path.
///
/// Pattern segments whose property begins with `:` capture the concrete
/// segment's property name under the marker-less name. A match requires
/// equal segment counts, equal array/non-array shape per position, equal
/// indices where both are concrete, and equal property names for
/// non-capture segments. Any mismatch returns an empty map; there are no
/// partial captures.
///
/// # Examples
///
/// ```
/// use arbor_state::{extract_params, Path};
///
/// let params = extract_params("/users/:name/posts[0]", &Path::parse("/users/alice/posts[0]"));
/// assert_eq!(params.get("name").map(String::as_str), Some("alice"));
/// ```
pub fn extract_params(pattern: &str, path: &Path) -> HashMap<String, String> {
    let pattern = Path::parse(pattern);
    if pattern.len() != path.len() {
        return HashMap::new();
    }

    let mut params = HashMap::new();
    for (expected, actual) in pattern.iter().zip(path.iter()) {
        if expected.is_array() != actual.is_array() {
            return HashMap::new();
        }
        if let (Some(want), Some(got)) = (expected.index, actual.index) {
            if want != got {
                return HashMap::new();
            }
        }
        match expected.key.strip_prefix(CAPTURE_MARKER) {
            Some(name) => {
                params.insert(name.to_string(), actual.key.clone());
            }
            None if expected.key == actual.key => {}
            None => return HashMap::new(),
        }
    }
    params
}

/// Construct a [`Path`] from a sequence of segment tokens.
///
/// String tokens go through segment parsing, so bracket notation works:
///
/// ```
/// use arbor_state::path;
///
/// let p = path!("users[0]", "name");
/// assert_eq!(p.to_string(), "/users[0]/name");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let path = Path::parse("/users/alice/email");
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], Seg::key("users"));
        assert_eq!(path[2], Seg::key("email"));
    }

    #[test]
    fn test_parse_root_forms() {
        assert!(Path::parse("").is_empty());
        assert!(Path::parse("/").is_empty());
        assert_eq!(Path::parse("/").to_string(), "/");
    }

    #[test]
    fn test_parse_bracket_index() {
        let path = Path::parse("/users[3]/name");
        assert_eq!(path[0], Seg::indexed("users", 3));
        assert!(path[0].is_array());
        assert!(!path[1].is_array());
    }

    #[test]
    fn test_parse_non_numeric_brackets_are_literal() {
        let path = Path::parse("/users[abc]");
        assert_eq!(path[0], Seg::key("users[abc]"));
        assert_eq!(path[0].index, None);
    }

    #[test]
    fn test_parse_skips_empty_tokens() {
        let path = Path::parse("/a//b/");
        assert_eq!(path.len(), 2);
        assert_eq!(path.to_string(), "/a/b");
    }

    #[test]
    fn test_display_round_trip() {
        for expr in ["/", "/a", "/a/b[0]", "/users[12]/posts[3]/title"] {
            let parsed = Path::parse(expr);
            assert_eq!(Path::parse(&parsed.to_string()), parsed);
            assert_eq!(parsed.to_string(), expr);
        }
    }

    #[test]
    fn test_resolve_absolute() {
        let base = Path::parse("/users");
        assert_eq!(base.resolve("/settings").to_string(), "/settings");
    }

    #[test]
    fn test_resolve_bare_index_merges() {
        let base = Path::parse("/users");
        assert_eq!(base.resolve("[0]").to_string(), "/users[0]");
        assert_eq!(base.resolve("[0]/name").to_string(), "/users[0]/name");
    }

    #[test]
    fn test_resolve_parent() {
        assert_eq!(Path::parse("/a/b").resolve("..").to_string(), "/a");
        assert_eq!(Path::parse("/a").resolve("..").to_string(), "/");
        assert_eq!(Path::root().resolve("..").to_string(), "/");
    }

    #[test]
    fn test_resolve_parent_groups() {
        let base = Path::parse("/a/b/c");
        assert_eq!(base.resolve("../x").to_string(), "/a/b/x");
        assert_eq!(base.resolve("../../x").to_string(), "/a/x");
        assert_eq!(base.resolve("../../../../x").to_string(), "/x");
        assert_eq!(base.resolve("../..").to_string(), "/a");
    }

    #[test]
    fn test_resolve_repeat_equals_stepwise() {
        let base = Path::parse("/a/b/c");
        let mut stepwise = base.clone();
        for _ in 0..2 {
            stepwise = stepwise.resolve("..");
        }
        assert_eq!(base.resolve(&"../".repeat(2)), stepwise);
    }

    #[test]
    fn test_resolve_append() {
        let base = Path::parse("/users");
        assert_eq!(base.resolve("posts[0]/title").to_string(), "/users/posts[0]/title");
        assert_eq!(base.resolve("").to_string(), "/users");
    }

    #[test]
    fn test_parent_and_prefix() {
        let path = Path::parse("/a/b[1]/c");
        assert_eq!(path.parent().unwrap().to_string(), "/a/b[1]");
        assert!(Path::parse("/a").is_prefix_of(&path));
        assert!(path.is_prefix_of(&path));
        assert!(!path.is_prefix_of(&Path::parse("/a")));
    }

    #[test]
    fn test_path_macro() {
        let p = path!("users[0]", "name");
        assert_eq!(p.len(), 2);
        assert_eq!(p[0], Seg::indexed("users", 0));
        assert_eq!(path!(), Path::root());
    }

    #[test]
    fn test_path_serde() {
        let path = Path::parse("/users[0]/name");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/users[0]/name\"");
        let parsed: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn test_path_serde_rejects_relative() {
        let err = serde_json::from_str::<Path>("\"users/name\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_extract_params_captures() {
        let params = extract_params("/users/:id", &Path::parse("/users/u42"));
        assert_eq!(params.get("id").map(String::as_str), Some("u42"));
    }

    #[test]
    fn test_extract_params_literal_mismatch() {
        let params = extract_params("/users/:id", &Path::parse("/teams/t1"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_extract_params_no_partial_capture() {
        // First segment captures, second fails: nothing is returned.
        let params = extract_params("/:kind/settings", &Path::parse("/users/profile"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_extract_params_shape_and_index() {
        assert!(extract_params("/users/:id", &Path::parse("/users[0]/u1")).is_empty());
        assert!(extract_params("/a[0]/:x", &Path::parse("/a[1]/y")).is_empty());
        let params = extract_params("/a[2]/:x", &Path::parse("/a[2]/y"));
        assert_eq!(params.get("x").map(String::as_str), Some("y"));
    }

    #[test]
    fn test_extract_params_length_mismatch() {
        assert!(extract_params("/a/:b", &Path::parse("/a/b/c")).is_empty());
    }
}
