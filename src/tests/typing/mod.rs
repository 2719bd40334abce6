// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::test_utils::*;
use crate::typing::Type;
use crate::value::Value;

use std::collections::BTreeMap;

use anyhow::Result;

fn ty(yaml: &str) -> Result<Type> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[test]
fn primitives_convert_from_strings() -> Result<()> {
    match_values(&Type::Number.conform(&Value::from("3"))?, &Value::from(3u64))?;
    match_values(&Type::Bool.conform(&Value::from("false"))?, &Value::from(false))?;
    match_values(&Type::String.conform(&Value::from(true))?, &Value::from("true"))?;
    match_values(&Type::String.conform(&Value::from(2.5))?, &Value::from("2.5"))?;

    let err = Type::Number.conform(&Value::from("three")).unwrap_err();
    assert_eq!(err.to_string(), "a number is required");
    Ok(())
}

#[test]
fn null_and_unknown_keep_their_kind() -> Result<()> {
    let list_of_strings = Type::list(Type::String);
    assert_eq!(list_of_strings.conform(&Value::Null)?, Value::Null);
    assert_eq!(
        list_of_strings.conform(&Value::dynamic())?,
        Value::Unknown(list_of_strings.clone())
    );
    // Dynamic accepts anything as is.
    let v = yaml_value("[1, a]")?;
    assert_eq!(Type::Dynamic.conform(&v)?, v);
    Ok(())
}

#[test]
fn collections() -> Result<()> {
    let t = ty("{type: list, item_type: {type: number}}")?;
    match_values(&t.conform(&yaml_value(r#"["1", 2]"#)?)?, &yaml_value("list!: [1, 2]")?)?;

    let err = t.conform(&yaml_value("[1, x]")?).unwrap_err();
    assert_eq!(err.to_string(), "element 1: a number is required");

    let t = ty("{type: map, item_type: {type: string}}")?;
    match_values(&t.conform(&yaml_value("{a: 1, b: true}")?)?, &yaml_value(r#"{a: "1", b: "true"}"#)?)?;

    let t = Type::Tuple {
        items: vec![Type::String, Type::Number],
    };
    match_values(&t.conform(&yaml_value("[1, 2]")?)?, &yaml_value(r#"["1", 2]"#)?)?;
    let err = t.conform(&yaml_value("[1]")?).unwrap_err();
    assert_eq!(err.to_string(), "tuple required with 2 elements");
    Ok(())
}

#[test]
fn objects_fill_missing_attributes() -> Result<()> {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), Type::String);
    fields.insert("size".to_string(), Type::Number);
    let t = Type::object(fields);

    let v = t.conform(&yaml_value("{id: i-1, extra: 1}")?)?;
    match_values(&v, &yaml_value("{id: i-1, size: null}")?)?;

    let err = t.conform(&yaml_value("{size: big}")?).unwrap_err();
    assert_eq!(err.to_string(), r#"attribute "size": a number is required"#);

    let err = t.conform(&Value::from("x")).unwrap_err();
    assert_eq!(err.to_string(), "object required");
    Ok(())
}

#[test]
fn display() -> Result<()> {
    assert_eq!(Type::Dynamic.to_string(), "any value");
    assert_eq!(Type::list(Type::String).to_string(), "list of string");
    assert_eq!(
        ty("{type: map, item_type: {type: set, item_type: {type: bool}}}")?.to_string(),
        "map of set of bool"
    );
    assert_eq!(Type::empty_object().to_string(), "object");
    Ok(())
}
