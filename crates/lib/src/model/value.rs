//! Node types for model documents.
//!
//! [`Value`] is the tagged union every node of the document tree is made of.
//! Besides the usual scalar and container variants it carries two *markers*:
//! [`Value::Ref`] (a live alias to another path) and [`Value::Func`] (a
//! computed value). Markers only ever live inside the tree. Snapshots handed
//! out by [`Model::get`](super::Model::get) have them resolved away.
//!
//! # Direct Comparisons
//!
//! ```
//! # use livemodel::model::Value;
//! let text = Value::from("hello");
//! assert!(text == "hello");
//! assert!(Value::Int(42) == 42);
//! assert!(!(Value::Bool(true) == 1));
//! ```
//!
//! # Serialization
//!
//! Values serialize as plain JSON. Markers become tagged objects so a
//! document holding references survives a JSON round trip:
//!
//! ```
//! # use livemodel::model::{Reference, Value};
//! let marker = Value::from(Reference::keyed("info.users", "userIndex"));
//! let json = serde_json::to_string(&marker).unwrap();
//! assert_eq!(json, r#"{"$ref":{"key":"userIndex","target":"info.users"}}"#);
//! let back: Value = serde_json::from_str(&json).unwrap();
//! assert_eq!(back, marker);
//! ```

use std::{collections::BTreeMap, fmt};

use serde_json::{Map as JsonMap, Number};

use super::{ModelError, path::PathBuf, path::Segment};

const REF_TAG: &str = "$ref";
const FUNC_TAG: &str = "$func";

/// An alias descriptor, produced by [`Model::reference`](super::Model::reference).
///
/// Without a key the marker redirects to `target`. With a key, the scalar
/// currently stored at `key` is appended to `target` first, so the alias
/// follows whatever that key path points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    target: PathBuf,
    key: Option<PathBuf>,
}

impl Reference {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            key: None,
        }
    }

    pub fn keyed(target: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            key: Some(key.into()),
        }
    }

    pub fn target(&self) -> &PathBuf {
        &self.target
    }

    pub fn key(&self) -> Option<&PathBuf> {
        self.key.as_ref()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "ref({}[{}])", self.target, key),
            None => write!(f, "ref({})", self.target),
        }
    }
}

/// A computed-value descriptor, produced by [`Model::func`](super::Model::func).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionMarker {
    name: String,
}

impl FunctionMarker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A node of the document tree.
///
/// ## Scalars
/// - [`Value::Null`], [`Value::Bool`], [`Value::Int`], [`Value::Float`], [`Value::Text`]
///
/// ## Containers
/// - [`Value::Object`] - string keyed children
/// - [`Value::Array`] - index addressed children
///
/// ## Markers
/// - [`Value::Ref`] - live alias, see [`Reference`]
/// - [`Value::Func`] - computed value, see [`FunctionMarker`]
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(into = "serde_json::Value", from = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),

    Object(BTreeMap<String, Value>),
    Array(Vec<Value>),

    Ref(Reference),
    Func(FunctionMarker),
}

impl Value {
    /// Builds an object from key/value pairs.
    ///
    /// ```
    /// # use livemodel::model::Value;
    /// let user = Value::object([("name", Value::from("ben")), ("age", 3.into())]);
    /// assert_eq!(user.as_object().map(|o| o.len()), Some(2));
    /// ```
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds an array from values.
    pub fn array<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Returns true for string/number/boolean/null leaves
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_)
        )
    }

    /// Returns true for objects and arrays
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Returns true for reference and function markers
    pub fn is_marker(&self) -> bool {
        matches!(self, Value::Ref(_) | Value::Func(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value or anything below it is a marker.
    pub fn contains_marker(&self) -> bool {
        match self {
            Value::Ref(_) | Value::Func(_) => true,
            Value::Object(map) => map.values().any(Value::contains_marker),
            Value::Array(items) => items.iter().any(Value::contains_marker),
            _ => false,
        }
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Ref(_) => "reference",
            Value::Func(_) => "function",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of ints and floats alike.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Converts a scalar into the path segment it names when used as a
    /// reference key. Containers, markers and null name nothing.
    pub fn to_segment(&self) -> Option<Segment> {
        match self {
            Value::Text(s) => Some(Segment::parse(s)),
            Value::Int(n) if *n >= 0 => Some(Segment::Index(*n as usize)),
            Value::Int(n) => Some(Segment::Key(n.to_string())),
            Value::Float(n) if n.fract() == 0.0 && *n >= 0.0 && *n < usize::MAX as f64 => {
                Some(Segment::Index(*n as usize))
            }
            Value::Float(n) => Some(Segment::Key(n.to_string())),
            Value::Bool(b) => Some(Segment::Key(b.to_string())),
            _ => None,
        }
    }

    /// Converts a marker-free value into JSON. Markers use their tagged form.
    pub fn to_json(&self) -> serde_json::Value {
        self.clone().into()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Object(_) | Value::Array(_) => write!(f, "{}", self.to_json()),
            Value::Ref(r) => write!(f, "{r}"),
            Value::Func(func) => write!(f, "func({})", func.name()),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::Number(n.into()),
            Value::Float(n) => Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Ref(reference) => {
                let mut body = JsonMap::new();
                body.insert(
                    "target".to_string(),
                    serde_json::Value::String(reference.target.to_string()),
                );
                if let Some(key) = reference.key {
                    body.insert("key".to_string(), serde_json::Value::String(key.to_string()));
                }
                let mut tagged = JsonMap::new();
                tagged.insert(REF_TAG.to_string(), serde_json::Value::Object(body));
                serde_json::Value::Object(tagged)
            }
            Value::Func(func) => {
                let mut tagged = JsonMap::new();
                tagged.insert(FUNC_TAG.to_string(), serde_json::Value::String(func.name));
                serde_json::Value::Object(tagged)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => match marker_from_json(&map) {
                Some(marker) => marker,
                None => Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
            },
        }
    }
}

/// Recognizes the tagged single-key objects markers serialize to.
fn marker_from_json(map: &JsonMap<String, serde_json::Value>) -> Option<Value> {
    if map.len() != 1 {
        return None;
    }
    if let Some(serde_json::Value::String(name)) = map.get(FUNC_TAG) {
        return Some(Value::Func(FunctionMarker::new(name.as_str())));
    }
    let body = map.get(REF_TAG)?.as_object()?;
    let target = body.get("target")?.as_str()?;
    let reference = match body.get("key").and_then(|k| k.as_str()) {
        Some(key) => Reference::keyed(target, key),
        None => Reference::new(target),
    };
    Some(Value::Ref(reference))
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Value::Ref(reference)
    }
}

impl From<FunctionMarker> for Value {
    fn from(func: FunctionMarker) -> Self {
        Value::Func(func)
    }
}

impl TryFrom<&Value> for String {
    type Error = ModelError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(ModelError::TypeMismatch {
                expected: "text".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

impl TryFrom<&Value> for i64 {
    type Error = ModelError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(n) => Ok(*n),
            _ => Err(ModelError::TypeMismatch {
                expected: "int".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = ModelError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| ModelError::TypeMismatch {
            expected: "number".to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

impl TryFrom<&Value> for bool {
    type Error = ModelError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(ModelError::TypeMismatch {
                expected: "bool".to_string(),
                actual: value.type_name().to_string(),
            }),
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Value::Text(s) if s == other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<String> for Value {
    fn eq(&self, other: &String) -> bool {
        self == other.as_str()
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Value::Int(n) if n == other)
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        matches!(self, Value::Int(n) if *n == *other as i64)
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        self.as_f64() == Some(*other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Value::Bool(b) if b == other)
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        *self == Value::from(other.clone())
    }
}

impl PartialEq<Value> for &str {
    fn eq(&self, other: &Value) -> bool {
        other == *self
    }
}

impl PartialEq<Value> for i64 {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}

impl PartialEq<Value> for bool {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}
