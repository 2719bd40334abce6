// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;
use crate::value::Value;
use crate::*;

use core::fmt;
use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The type of a value as described by provider schemas.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum Type {
    // Any type. Only known once a value is available.
    Dynamic,

    Bool,
    Number,
    String,

    // Homogenous collections
    List { item_type: Box<Type> },
    Set { item_type: Box<Type> },
    Map { item_type: Box<Type> },

    // Structural types
    Object { fields: Rc<BTreeMap<String, Type>> },
    Tuple { items: Vec<Type> },
}

impl Type {
    pub fn list(item: Type) -> Type {
        Type::List {
            item_type: Box::new(item),
        }
    }

    pub fn object(fields: BTreeMap<String, Type>) -> Type {
        Type::Object {
            fields: Rc::new(fields),
        }
    }

    pub fn empty_object() -> Type {
        Type::object(BTreeMap::new())
    }

    /// Convert a value to this type.
    ///
    /// Object attributes missing from the value become null. Unknown values
    /// stay unknown but take on the target type.
    pub fn conform(&self, value: &Value) -> Result<Value> {
        match (self, value) {
            (Type::Dynamic, _) => Ok(value.clone()),
            (_, Value::Unknown(_)) => Ok(Value::Unknown(self.clone())),
            (_, Value::Null) => Ok(Value::Null),

            (Type::Bool, Value::Bool(_)) => Ok(value.clone()),
            (Type::Bool, Value::String(s)) => match s.as_ref() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => bail!("a bool is required"),
            },

            (Type::Number, Value::Number(_)) => Ok(value.clone()),
            (Type::Number, Value::String(s)) => match Number::from_str(s) {
                Ok(n) => Ok(Value::Number(n)),
                Err(_) => bail!("a number is required"),
            },

            (Type::String, Value::String(_)) => Ok(value.clone()),
            (Type::String, Value::Bool(b)) => Ok(Value::from(b.to_string())),
            (Type::String, Value::Number(n)) => Ok(Value::from(n.format_decimal())),

            (
                Type::List { item_type } | Type::Set { item_type },
                Value::List(items) | Value::Tuple(items),
            ) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    match item_type.conform(item) {
                        Ok(v) => out.push(v),
                        Err(e) => bail!("element {idx}: {e}"),
                    }
                }
                Ok(Value::List(Rc::new(out)))
            }

            (Type::Tuple { items: types }, Value::List(items) | Value::Tuple(items)) => {
                if types.len() != items.len() {
                    bail!("tuple required with {} elements", types.len());
                }
                let mut out = Vec::with_capacity(items.len());
                for (idx, (ty, item)) in types.iter().zip(items.iter()).enumerate() {
                    match ty.conform(item) {
                        Ok(v) => out.push(v),
                        Err(e) => bail!("element {idx}: {e}"),
                    }
                }
                Ok(Value::Tuple(Rc::new(out)))
            }

            (Type::Map { item_type }, Value::Object(fields)) => {
                let mut out = BTreeMap::new();
                for (k, v) in fields.iter() {
                    match item_type.conform(v) {
                        Ok(v) => out.insert(k.clone(), v),
                        Err(e) => bail!("element {k:?}: {e}"),
                    };
                }
                Ok(Value::Object(Rc::new(out)))
            }

            (Type::Object { fields: types }, Value::Object(fields)) => {
                let mut out = BTreeMap::new();
                for (name, ty) in types.iter() {
                    let v = match fields.get(name.as_str()) {
                        Some(v) => match ty.conform(v) {
                            Ok(v) => v,
                            Err(e) => bail!("attribute {name:?}: {e}"),
                        },
                        None => Value::Null,
                    };
                    out.insert(Rc::from(name.as_str()), v);
                }
                Ok(Value::Object(Rc::new(out)))
            }

            _ => bail!("{self} required"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Dynamic => write!(f, "any value"),
            Type::Bool => write!(f, "bool"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::List { item_type } => write!(f, "list of {item_type}"),
            Type::Set { item_type } => write!(f, "set of {item_type}"),
            Type::Map { item_type } => write!(f, "map of {item_type}"),
            Type::Object { .. } => write!(f, "object"),
            Type::Tuple { .. } => write!(f, "tuple"),
        }
    }
}
