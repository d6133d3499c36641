use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A value that can live in a query string.
///
/// Scalars are strings or numbers; arrays hold scalars and are written as
/// repeated keys. `Null` marks an entry that is omitted when stringified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    Number(f64),
    String(String),
    Array(Vec<QueryValue>),
}

impl QueryValue {
    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, QueryValue::Number(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[QueryValue]> {
        match self {
            QueryValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Render a scalar the way it appears in a URL. `None` for arrays and null.
    pub fn to_query_text(&self) -> Option<String> {
        match self {
            QueryValue::String(s) => Some(s.clone()),
            QueryValue::Number(n) => Some(format_number(*n)),
            QueryValue::Null | QueryValue::Array(_) => None,
        }
    }

    /// Convert a JSON value, rejecting shapes a query string cannot carry.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SyncError> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(QueryValue::Null),
            Value::String(s) => Ok(QueryValue::String(s.clone())),
            Value::Number(n) => n
                .as_f64()
                .map(QueryValue::Number)
                .ok_or_else(|| SyncError::Unsupported(format!("number {n}"))),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Array(_) | Value::Object(_) => {
                        Err(SyncError::Unsupported(format!("nested value {item}")))
                    }
                    _ => QueryValue::from_json(item),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(QueryValue::Array),
            Value::Bool(b) => Err(SyncError::Unsupported(format!("boolean {b}"))),
            Value::Object(_) => Err(SyncError::Unsupported(format!("object {value}"))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            QueryValue::Null => Value::Null,
            QueryValue::String(s) => Value::String(s.clone()),
            QueryValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            QueryValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

/// Format a number as a browser would when writing it into a URL.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        // Covers -0.
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Null => f.write_str(""),
            QueryValue::String(s) => f.write_str(s),
            QueryValue::Number(n) => f.write_str(&format_number(*n)),
            QueryValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<f64> for QueryValue {
    fn from(n: f64) -> Self {
        QueryValue::Number(n)
    }
}

impl From<i32> for QueryValue {
    fn from(n: i32) -> Self {
        QueryValue::Number(n as f64)
    }
}

impl From<i64> for QueryValue {
    fn from(n: i64) -> Self {
        QueryValue::Number(n as f64)
    }
}

impl From<u32> for QueryValue {
    fn from(n: u32) -> Self {
        QueryValue::Number(n as f64)
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::String(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::String(s)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(items: Vec<T>) -> Self {
        QueryValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Insertion-ordered mapping from query keys to values.
///
/// Used both for application state (schema key order) and for mappings
/// parsed out of a URL (first-occurrence order). Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryMap(IndexMap<String, QueryValue>);

/// Application state mirrored into the URL.
pub type State = QueryMap;

impl QueryMap {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    /// Insert or overwrite. Overwriting keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a copy of `self` with every entry of `top` laid over it.
    ///
    /// Keys from `top` win; keys only in `self` survive untouched.
    pub fn overlay(&self, top: &QueryMap) -> QueryMap {
        let mut merged = self.clone();
        for (key, value) in top.iter() {
            merged.insert(key, value.clone());
        }
        merged
    }

    /// Drop every key for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| keep(k));
    }

    /// Build a map from a JSON object of scalars and scalar arrays.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SyncError> {
        let object = value
            .as_object()
            .ok_or_else(|| SyncError::Unsupported(format!("expected an object, got {value}")))?;
        let mut map = QueryMap::new();
        for (key, value) in object {
            map.insert(key.clone(), QueryValue::from_json(value)?);
        }
        Ok(map)
    }

    /// Parse a JSON document into a map.
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<QueryValue>, const N: usize> From<[(K, V); N]> for QueryMap {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for QueryMap {
    type Item = (String, QueryValue);
    type IntoIter = indexmap::map::IntoIter<String, QueryValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Build a [`QueryMap`] from `key => value` pairs of mixed value types.
///
/// ```ignore
/// let defaults = query_map! { "page" => 1, "q" => "", "tags" => vec!["a"] };
/// ```
#[macro_export]
macro_rules! query_map {
    () => { $crate::QueryMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::QueryMap::new();
        $( map.insert($key, $crate::QueryValue::from($value)); )+
        map
    }};
}

/// Unique handle for a state observer, returned by `QuerySync::subscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
