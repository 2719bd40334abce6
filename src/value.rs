// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;
use crate::typing::Type;
use crate::*;

use core::fmt;
use std::collections::BTreeMap;
use std::ops;

use anyhow::{anyhow, Result};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

// Objects are always keyed by strings in this language, so keys are kept as
// plain strings instead of values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(Rc<str>),

    // Homogenous list. Sets are represented as lists as well.
    List(Rc<Vec<Value>>),
    // Heterogenous sequence. Sequences read from JSON or YAML are tuples.
    Tuple(Rc<Vec<Value>>),

    Object(Rc<BTreeMap<Rc<str>, Value>>),

    // A value that is not known until apply time, with its expected type.
    Unknown(Type),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) | Value::Tuple(items) => serializer.collect_seq(items.iter()),
            Value::Object(fields) => {
                serializer.collect_map(fields.iter().map(|(k, v)| (k.as_ref(), v)))
            }
            // Shown as a marker so that environments can be printed.
            Value::Unknown(Type::Dynamic) => serializer.serialize_str("<unknown>"),
            Value::Unknown(ty) => serializer.collect_str(&format_args!("<unknown {ty}>")),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON or YAML value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::from(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Tuple(Rc::new(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut fields = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            fields.insert(Rc::from(key), value);
        }
        Ok(Value::Object(Rc::new(fields)))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Value {
    /// A value of any type that is not yet known.
    pub fn dynamic() -> Value {
        Value::Unknown(Type::Dynamic)
    }

    pub fn new_object() -> Value {
        Value::Object(Rc::new(BTreeMap::new()))
    }

    pub fn new_list() -> Value {
        Value::List(Rc::new(vec![]))
    }

    pub fn from_json_str(json: &str) -> Result<Value> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Value> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Whether the value, or any value nested inside it, is unknown.
    pub fn is_known(&self) -> bool {
        match self {
            Value::Unknown(_) => false,
            Value::List(a) | Value::Tuple(a) => a.iter().all(Value::is_known),
            Value::Object(fields) => fields.values().all(Value::is_known),
            _ => true,
        }
    }

    /// The type of the value. Sequences and objects report their structure.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Null | Value::Unknown(Type::Dynamic) => Type::Dynamic,
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::List(a) => Type::list(a.first().map(Value::type_of).unwrap_or(Type::Dynamic)),
            Value::Tuple(a) => Type::Tuple {
                items: a.iter().map(Value::type_of).collect(),
            },
            Value::Object(fields) => Type::object(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.type_of()))
                    .collect(),
            ),
            Value::Unknown(ty) => ty.clone(),
        }
    }

    // Error for an accessor applied to a value of another type.
    fn mismatch(&self, wanted: &str) -> anyhow::Error {
        anyhow!("{wanted} required, found {}", self.type_of())
    }

    pub fn as_bool(&self) -> Result<&bool> {
        match self {
            Value::Bool(b) => Ok(b),
            _ => Err(self.mismatch("bool")),
        }
    }

    pub fn as_string(&self) -> Result<&Rc<str>> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    /// Elements of a list or tuple.
    pub fn as_list(&self) -> Result<&Vec<Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Ok(items),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn as_object(&self) -> Result<&BTreeMap<Rc<str>, Value>> {
        match self {
            Value::Object(fields) => Ok(fields),
            _ => Err(self.mismatch("object")),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut BTreeMap<Rc<str>, Value>> {
        match self {
            Value::Object(fields) => Ok(Rc::make_mut(fields)),
            _ => Err(self.mismatch("object")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

number_from!(i64, u64, usize, f64);

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.as_str().into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::List(Rc::new(a))
    }
}

impl From<BTreeMap<Rc<str>, Value>> for Value {
    fn from(m: BTreeMap<Rc<str>, Value>) -> Self {
        Value::Object(Rc::new(m))
    }
}

// Indexing never fails. Out of range positions and missing keys yield null,
// as does indexing a value of the wrong kind.
impl ops::Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.as_list()
            .ok()
            .and_then(|items| items.get(index))
            .unwrap_or(&Value::Null)
    }
}

impl ops::Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self {
            Value::Object(fields) => fields.get(key).unwrap_or(&Value::Null),
            _ => &Value::Null,
        }
    }
}
