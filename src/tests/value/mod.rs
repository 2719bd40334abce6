// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::test_utils::*;
use crate::typing::Type;
use crate::value::Value;

use anyhow::Result;

#[test]
fn sequences_deserialize_as_tuples() -> Result<()> {
    let v = Value::from_json_str(r#"{"a": [1, "x"], "b": null}"#)?;
    assert!(matches!(v["a"], Value::Tuple(_)));
    assert_eq!(v["a"][1], Value::from("x"));
    assert_eq!(v["b"], Value::Null);
    // Missing keys and out of range indexes are null.
    assert_eq!(v["c"], Value::Null);
    assert_eq!(v["a"][5], Value::Null);
    Ok(())
}

#[test]
fn unknown_values_serialize_as_markers() -> Result<()> {
    let v = yaml_value("{a: '#dynamic', b: {list!: [1]}}")?;
    let json = serde_json::to_value(&v)?;
    assert_eq!(json["a"], serde_json::json!("<unknown>"));
    assert_eq!(json["b"], serde_json::json!([1]));
    Ok(())
}

#[test]
fn known_values() -> Result<()> {
    assert!(yaml_value("{a: [1, {b: 2}]}")?.is_known());
    assert!(!yaml_value("{a: [1, {b: '#dynamic'}]}")?.is_known());
    assert!(!Value::Unknown(Type::String).is_known());
    assert!(Value::Null.is_known());
    Ok(())
}

#[test]
fn type_of() -> Result<()> {
    assert_eq!(Value::Null.type_of(), Type::Dynamic);
    assert_eq!(
        yaml_value("list!: [a, b]")?.type_of(),
        Type::list(Type::String)
    );
    assert_eq!(Value::new_list().type_of(), Type::list(Type::Dynamic));
    assert_eq!(
        yaml_value("[1, true]")?.type_of(),
        Type::Tuple {
            items: vec![Type::Number, Type::Bool]
        }
    );
    assert_eq!(
        yaml_value("{unknown!: {type: string}}")?.type_of(),
        Type::String
    );
    assert_eq!(Value::new_object().type_of(), Type::empty_object());
    Ok(())
}

#[test]
fn accessors() -> Result<()> {
    let mut v = yaml_value("{n: 1, s: x, l: [1]}")?;
    assert_eq!(v["s"].as_string()?.as_ref(), "x");
    assert_eq!(v["l"].as_list()?.len(), 1);
    assert!(v["n"].as_bool().is_err());

    v.as_object_mut()?.insert("t".into(), Value::from(true));
    assert!(*v["t"].as_bool()?);
    Ok(())
}
