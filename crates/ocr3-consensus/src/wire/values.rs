//! Dynamic value tree carried in observations and encodable outcomes.
//!
//! Maps are `BTreeMap`-backed so that encoding the same value twice always
//! yields the same bytes.

use std::collections::BTreeMap;

/// A single dynamically-typed value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Value {
    #[prost(oneof = "value::Kind", tags = "1, 2, 3, 4, 5, 6, 7, 8")]
    pub kind: Option<value::Kind>,
}

/// Nested types for [`Value`].
pub mod value {
    /// The concrete variant held by a [`super::Value`].
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(string, tag = "1")]
        StringValue(String),
        #[prost(bool, tag = "2")]
        BoolValue(bool),
        #[prost(bytes = "vec", tag = "3")]
        BytesValue(Vec<u8>),
        #[prost(message, tag = "4")]
        MapValue(super::Map),
        #[prost(message, tag = "5")]
        ListValue(super::List),
        #[prost(sint64, tag = "6")]
        Int64Value(i64),
        #[prost(uint64, tag = "7")]
        Uint64Value(u64),
        #[prost(double, tag = "8")]
        Float64Value(f64),
    }
}

/// String-keyed map of values.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Map {
    #[prost(btree_map = "string, message", tag = "1")]
    pub fields: BTreeMap<String, Value>,
}

/// Ordered list of values.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct List {
    #[prost(message, repeated, tag = "1")]
    pub fields: Vec<Value>,
}

impl Value {
    fn of(kind: value::Kind) -> Self {
        Self { kind: Some(kind) }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::of(value::Kind::StringValue(s.into()))
    }

    pub fn bool(b: bool) -> Self {
        Self::of(value::Kind::BoolValue(b))
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::of(value::Kind::BytesValue(b.into()))
    }

    pub fn int64(i: i64) -> Self {
        Self::of(value::Kind::Int64Value(i))
    }

    pub fn uint64(u: u64) -> Self {
        Self::of(value::Kind::Uint64Value(u))
    }

    pub fn float64(f: f64) -> Self {
        Self::of(value::Kind::Float64Value(f))
    }

    pub fn map(m: Map) -> Self {
        Self::of(value::Kind::MapValue(m))
    }

    pub fn list(l: List) -> Self {
        Self::of(value::Kind::ListValue(l))
    }

    /// Returns the inner string if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            Some(value::Kind::StringValue(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner map if this is a map value.
    pub fn as_map(&self) -> Option<&Map> {
        match &self.kind {
            Some(value::Kind::MapValue(m)) => Some(m),
            _ => None,
        }
    }

    /// Returns the inner list if this is a list value.
    pub fn as_list(&self) -> Option<&List> {
        match &self.kind {
            Some(value::Kind::ListValue(l)) => Some(l),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::int64(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::uint64(u)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::map(m)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::list(l)
    }
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the map for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl List {
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<V: Into<Value>> FromIterator<V> for List {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}
