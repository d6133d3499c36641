use std::sync::Arc;

use crate::value::{QueryMap, QueryValue};

/// The inferred kind of a schema key, taken from its default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    String,
    Array,
    Null,
}

impl ValueKind {
    pub fn of(value: &QueryValue) -> Self {
        match value {
            QueryValue::Number(_) => ValueKind::Number,
            QueryValue::String(_) => ValueKind::String,
            QueryValue::Array(_) => ValueKind::Array,
            QueryValue::Null => ValueKind::Null,
        }
    }
}

/// The fixed key set of a sync session, defined by its default state.
///
/// Cheap to clone (shared `Arc`). Two schemas are the *same reference*
/// only when they come from the same `Schema::new` call; the controller
/// uses this to decide whether the navigation subscription must be
/// re-established.
#[derive(Debug, Clone)]
pub struct Schema {
    defaults: Arc<QueryMap>,
}

impl Schema {
    pub fn new(defaults: QueryMap) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }

    /// The default state, in schema key order.
    pub fn defaults(&self) -> &QueryMap {
        &self.defaults
    }

    pub fn contains(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys()
    }

    pub fn kind(&self, key: &str) -> Option<ValueKind> {
        self.defaults.get(key).map(ValueKind::of)
    }

    /// True when `key` exists and its default is a number.
    pub fn is_numeric(&self, key: &str) -> bool {
        self.kind(key) == Some(ValueKind::Number)
    }

    pub fn same_reference(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.defaults, &other.defaults)
    }
}

impl From<QueryMap> for Schema {
    fn from(defaults: QueryMap) -> Self {
        Schema::new(defaults)
    }
}
