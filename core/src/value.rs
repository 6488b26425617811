//! Value codec: the in-memory value universe and its document form.
//!
//! RULE: Decimals never travel as JSON numbers. A decimal is written as
//! the one-key wrapper `{"decimal": "<literal>"}` and read back from the
//! literal, so no precision is lost in either direction.
//!
//! Tuples and lists share the JSON array encoding. A decoded array is
//! always a `List`; entity constructors recover tuple arity from the
//! field they are reading.

use crate::{
    error::{SimError, SimResult},
    registry::Entity,
};
use rust_decimal::Decimal;
use serde_json::{Map, Number};
use std::collections::BTreeMap;

/// Key of the one-key decimal wrapper.
pub const DECIMAL_KEY: &str = "decimal";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// An integer above `i64::MAX`. Smaller integers are always `Int`.
    UInt(u64),
    Decimal(Decimal),
    Text(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A reconstructed tagged entity. Only the registry knows how to
    /// encode these; the plain codec rejects them.
    Entity(Box<Entity>),
}

impl Value {
    /// Stable name of the value's shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null       => "null",
            Value::Bool(_)    => "bool",
            Value::Int(_)     => "int",
            Value::UInt(_)    => "uint",
            Value::Decimal(_) => "decimal",
            Value::Text(_)    => "text",
            Value::List(_)    => "list",
            Value::Tuple(_)   => "tuple",
            Value::Map(_)     => "map",
            Value::Entity(_)  => "entity",
        }
    }

    pub fn from_u64(n: u64) -> Self {
        i64::try_from(n).map_or(Value::UInt(n), Value::Int)
    }

    pub fn pair(a: Value, b: Value) -> Self {
        Value::Tuple(vec![a, b])
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Value::Int(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Value::Int(n.into()) }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self { Value::Decimal(d) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Encode a plain value into a document node.
///
/// Containers are encoded element by element. `Value::Entity` is not part
/// of the plain universe and fails with `UnsupportedValue`; use
/// `registry::serialize` for trees that contain entities.
pub fn encode(value: &Value) -> SimResult<serde_json::Value> {
    Ok(match value {
        Value::Null       => serde_json::Value::Null,
        Value::Bool(b)    => serde_json::Value::Bool(*b),
        Value::Int(n)     => serde_json::Value::Number(Number::from(*n)),
        Value::UInt(n)    => serde_json::Value::Number(Number::from(*n)),
        Value::Decimal(d) => encode_decimal(d),
        Value::Text(s)    => serde_json::Value::String(s.clone()),
        Value::List(items) | Value::Tuple(items) => serde_json::Value::Array(
            items.iter().map(encode).collect::<SimResult<Vec<_>>>()?,
        ),
        Value::Map(entries) => {
            let mut obj = Map::new();
            for (key, item) in entries {
                obj.insert(key.clone(), encode(item)?);
            }
            serde_json::Value::Object(obj)
        }
        Value::Entity(_) => {
            return Err(SimError::UnsupportedValue { type_name: value.type_name().into() })
        }
    })
}

pub fn encode_decimal(d: &Decimal) -> serde_json::Value {
    let mut obj = Map::new();
    obj.insert(DECIMAL_KEY.to_string(), serde_json::Value::String(d.to_string()));
    serde_json::Value::Object(obj)
}

/// Decode a document node into a plain value.
///
/// JSON floats are rejected: every fractional quantity in a slot document
/// is a wrapped decimal, so a bare float means the document was not
/// produced by this codec.
pub fn decode(node: &serde_json::Value) -> SimResult<Value> {
    Ok(match node {
        serde_json::Value::Null      => Value::Null,
        serde_json::Value::Bool(b)   => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => match n.as_u64() {
                Some(u) => Value::UInt(u),
                None => return Err(SimError::UnsupportedValue { type_name: "float".into() }),
            },
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => {
            Value::List(items.iter().map(decode).collect::<SimResult<Vec<_>>>()?)
        }
        serde_json::Value::Object(obj) => {
            if let Some(literal) = decimal_literal(obj) {
                return decode_decimal(literal);
            }
            let mut entries = BTreeMap::new();
            for (key, item) in obj {
                entries.insert(key.clone(), decode(item)?);
            }
            Value::Map(entries)
        }
    })
}

/// The literal of a `{"decimal": "<literal>"}` wrapper, if `obj` is one.
fn decimal_literal(obj: &Map<String, serde_json::Value>) -> Option<&str> {
    if obj.len() != 1 {
        return None;
    }
    obj.get(DECIMAL_KEY).and_then(serde_json::Value::as_str)
}

fn decode_decimal(literal: &str) -> SimResult<Value> {
    literal
        .parse::<Decimal>()
        .map(Value::Decimal)
        .map_err(|_| SimError::InvalidDecimal { literal: literal.to_string() })
}
