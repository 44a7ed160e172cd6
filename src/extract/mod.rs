//! # Path Extraction
//!
//! Pull individual values out of a parsed document using declarative paths.
//!
//! A [`Path`] is a list of keys, each either an object field name or an array
//! index, applied left to right:
//!
//! ```
//! use portalframe::extract::{self, Path, PathKey, Value};
//!
//! let doc = serde_json::json!({"items": [{"title": "first"}, {"title": "second"}]});
//! let path = Path::new(vec![
//!     PathKey::from("items"),
//!     PathKey::from(1usize),
//!     PathKey::from("title"),
//! ]);
//! assert_eq!(extract::extract(&doc, &path).unwrap(), Value::Text("second".into()));
//! ```
//!
//! In config files a path is written as a JSON array: `["items", 1, "title"]`.
//!
//! Both JSON and XML bodies are parsed into the same tree model
//! (`serde_json::Value`), see [`xml`] for the XML mapping.

pub mod xml;

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::PortalError;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    /// Array index
    Index(usize),
    /// Object field
    Key(String),
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        PathKey::Key(key.to_string())
    }
}

impl From<String> for PathKey {
    fn from(key: String) -> Self {
        PathKey::Key(key)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "[{}]", i),
            PathKey::Key(k) => write!(f, "[{:?}]", k),
        }
    }
}

/// An ordered sequence of keys into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathKey>);

impl Path {
    pub fn new(keys: Vec<PathKey>) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `len` keys, used to report where a walk failed.
    fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for key in &self.0 {
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl FromIterator<PathKey> for Path {
    fn from_iter<I: IntoIterator<Item = PathKey>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

/// A value pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A JSON integer
    Integer(i64),
    /// Anything else, as text
    Text(String),
}

impl Value {
    /// Convert a document node. Strings keep their raw content; integers stay
    /// integers; everything else (floats, booleans, null, containers) becomes
    /// its JSON text.
    pub fn from_json(node: &JsonValue) -> Self {
        match node {
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Text(n.to_string()),
            },
            JsonValue::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Integer reading of this value, also for text such as `"1234"`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Body format of a data endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Xml,
}

/// Parse a response body into the shared tree model.
pub fn parse_document(body: &str, format: DocumentFormat) -> Result<JsonValue, PortalError> {
    match format {
        DocumentFormat::Json => serde_json::from_str(body)
            .map_err(|e| PortalError::Parse(format!("Invalid JSON: {}", e))),
        DocumentFormat::Xml => xml::parse(body),
    }
}

/// Walk `path` and return the node it names.
///
/// ## Errors
///
/// [`PortalError::Extraction`] at the first key that is missing, out of
/// bounds, or applied to the wrong kind of node. The reported path is the
/// prefix up to and including the failing key.
pub fn lookup<'a>(document: &'a JsonValue, path: &Path) -> Result<&'a JsonValue, PortalError> {
    let mut node = document;
    for (step, key) in path.keys().iter().enumerate() {
        let fail = |reason: String| PortalError::Extraction {
            path: path.prefix(step + 1).to_string(),
            reason,
        };

        node = match (key, node) {
            (PathKey::Key(k), JsonValue::Object(map)) => map
                .get(k)
                .ok_or_else(|| fail(format!("missing key {:?}", k)))?,
            (PathKey::Index(i), JsonValue::Array(items)) => items.get(*i).ok_or_else(|| {
                fail(format!("index {} out of bounds (length {})", i, items.len()))
            })?,
            (PathKey::Key(k), other) => {
                return Err(fail(format!(
                    "cannot look up key {:?} in {}",
                    k,
                    kind_of(other)
                )));
            }
            (PathKey::Index(i), other) => {
                return Err(fail(format!("cannot index {} with {}", kind_of(other), i)));
            }
        };
    }
    Ok(node)
}

/// Extract a single value.
pub fn extract(document: &JsonValue, path: &Path) -> Result<Value, PortalError> {
    lookup(document, path).map(Value::from_json)
}

/// Extract one value per path, in order. Fails as a whole if any path fails.
pub fn extract_all(document: &JsonValue, paths: &[Path]) -> Result<Vec<Value>, PortalError> {
    paths.iter().map(|path| extract(document, path)).collect()
}

fn kind_of(node: &JsonValue) -> &'static str {
    match node {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
