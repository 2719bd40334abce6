// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use refscope::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

// Process test value specified in yaml to interpret special encodings.
pub fn process_value(v: &Value) -> Result<Value> {
    match v {
        // Value of any type not known yet.
        Value::String(s) if s.as_ref() == "#dynamic" => Ok(Value::dynamic()),

        // Unknown value of a given type
        // unknown! :
        //   type: list
        //   item_type: ...
        Value::Object(fields) if fields.len() == 1 && fields.contains_key("unknown!") => {
            let ty: Type = serde_json::from_str(&serde_json::to_string(&v["unknown!"])?)?;
            Ok(Value::Unknown(ty))
        }

        // Sequences read from yaml are tuples. Lists are written as
        // list! :
        //   - item1
        //   - item2
        Value::Object(fields) if fields.len() == 1 && fields.contains_key("list!") => {
            let mut items = vec![];
            for item in v["list!"].as_list()?.iter() {
                items.push(process_value(item)?);
            }
            Ok(Value::from(items))
        }

        Value::Tuple(items) => {
            let mut out = vec![];
            for item in items.iter() {
                out.push(process_value(item)?);
            }
            Ok(Value::Tuple(Arc::new(out)))
        }

        Value::Object(fields) => {
            let mut out = BTreeMap::new();
            for (key, value) in fields.iter() {
                out.insert(key.clone(), process_value(value)?);
            }
            Ok(Value::from(out))
        }

        _ => Ok(v.clone()),
    }
}

fn match_values(computed: &Value, expected: &Value) -> Result<()> {
    if computed != expected {
        bail!(
            "value mismatch\nexpected:\n{}computed:\n{}",
            serde_yaml::to_string(expected)?,
            serde_yaml::to_string(computed)?
        );
    }
    Ok(())
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct ExpectedDiag {
    severity: Severity,
    summary: String,
    // Substring of the detail.
    detail: Option<String>,
}

fn default_walk() -> Walk {
    Walk::Plan
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct Case {
    note: String,
    #[serde(default = "default_walk")]
    walk: Walk,
    #[serde(default)]
    scope: InterpolationScope,
    expr: String,
    want: Value,
    #[serde(default)]
    diagnostics: Vec<ExpectedDiag>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    module: Module,
    #[serde(default)]
    state: State,
    #[serde(default)]
    variables: BTreeMap<String, Value>,
    schemas: Option<Schemas>,
    cases: Vec<Case>,
}

fn working_dir() -> std::io::Result<PathBuf> {
    Ok(PathBuf::from("/work"))
}

fn environment_value(env: Environment) -> Value {
    let map: BTreeMap<Arc<str>, Value> = env
        .into_iter()
        .map(|(k, v)| (Arc::from(k.as_str()), v))
        .collect();
    Value::from(map)
}

fn check_diagnostics(case: &Case, diags: &Diagnostics) -> Result<()> {
    if diags.len() != case.diagnostics.len() {
        bail!(
            "expected {} diagnostics, got {}:\n{diags}",
            case.diagnostics.len(),
            diags.len()
        );
    }
    for (d, expected) in diags.iter().zip(case.diagnostics.iter()) {
        if d.severity != expected.severity || d.summary != expected.summary {
            bail!("diagnostic mismatch\nexpected: {expected:?}\ncomputed: {d}");
        }
        if let Some(detail) = &expected.detail {
            if !d.detail.contains(detail.as_str()) {
                bail!("detail `{}` does not contain `{detail}`", d.detail);
            }
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    let module = Arc::new(test.module);
    let state: Arc<dyn StateReader> = Arc::new(StateStore::new(test.state));
    let variables: Arc<dyn VariableValues> =
        Arc::new(VariableStore::from_root(test.variables));
    let schemas = test.schemas.map(Arc::new);

    for case in &test.cases {
        print!("case {} ", case.note);

        let mut interpolater = Interpolater::new(
            case.walk,
            ContextMeta::default(),
            module.clone(),
            state.clone(),
            variables.clone(),
        )
        .with_working_dir(working_dir);
        if let Some(schemas) = &schemas {
            interpolater = interpolater.with_schemas(schemas.clone());
        }

        let source = Source::from_contents("case.tf".to_string(), case.expr.clone())?;
        let expr = Parser::new(&source)?.parse_expr()?;
        let body = Body::single_attr("value", expr);
        let (refs, mut diags) = detect_references(&body, &DecodeSpec::attr("value"));
        let (env, value_diags) = interpolater.values(&case.scope, &refs);
        diags.append(value_diags);

        match_values(&environment_value(env), &process_value(&case.want)?)?;
        check_diagnostics(case, &diags)?;

        println!("passed");
    }

    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test]
#[ignore = "intended for running a single yaml file"]
fn one_yaml() -> Result<()> {
    env_logger::init();

    let mut file = String::default();
    for a in env::args() {
        if a.ends_with(".yaml") {
            file = a;
            break;
        }
    }

    if file.is_empty() {
        bail!("missing yaml test file");
    }

    yaml_test(file.as_str())
}

#[test_resources("tests/interpolater/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
