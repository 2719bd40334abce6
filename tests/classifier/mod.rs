// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::env;

use anyhow::{bail, Result};
use refscope::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct ExpectedRef {
    key: String,
    kind: ReferenceKind,
    start: Pos,
    end: Pos,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct ExpectedDiag {
    severity: Severity,
    summary: String,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct Case {
    note: String,
    // A single expression, analysed as the attribute `value`.
    expr: Option<String>,
    // A whole configuration body, analysed without a schema.
    body: Option<String>,
    #[serde(default)]
    references: Vec<ExpectedRef>,
    #[serde(default)]
    diagnostics: Vec<ExpectedDiag>,
    // Expected parse error.
    error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn detect(case: &Case) -> Result<(Vec<Reference>, Diagnostics)> {
    match (&case.expr, &case.body) {
        (Some(expr), None) => {
            let source = Source::from_contents("case.tf".to_string(), expr.clone())?;
            let expr = Parser::new(&source)?.parse_expr()?;
            let body = Body::single_attr("value", expr);
            Ok(detect_references(&body, &DecodeSpec::attr("value")))
        }
        (None, Some(body)) => {
            let source = Source::from_contents("case.tf".to_string(), body.clone())?;
            let body = Parser::new(&source)?.parse_body()?;
            Ok(detect_references(&body, &DecodeSpec::from_body(&body)))
        }
        _ => bail!("case must have exactly one of `expr` and `body`"),
    }
}

fn check(case: &Case, refs: &[Reference], diags: &Diagnostics) -> Result<()> {
    if refs.len() != case.references.len() {
        bail!(
            "expected {} references, got {}:\n{}",
            case.references.len(),
            refs.len(),
            serde_yaml::to_string(refs)?
        );
    }

    for (r, expected) in refs.iter().zip(case.references.iter()) {
        if r.key != expected.key || r.kind != expected.kind {
            bail!(
                "reference mismatch\nexpected:\n{}computed:\n{}",
                serde_yaml::to_string(expected)?,
                serde_yaml::to_string(r)?
            );
        }
        if r.range.start != expected.start || r.range.end != expected.end {
            bail!(
                "range mismatch for {}: expected {:?}-{:?}, got {:?}-{:?}",
                r.key,
                expected.start,
                expected.end,
                r.range.start,
                r.range.end
            );
        }
    }

    let computed: Vec<(Severity, &str)> = diags
        .iter()
        .map(|d| (d.severity, d.summary.as_str()))
        .collect();
    let expected: Vec<(Severity, &str)> = case
        .diagnostics
        .iter()
        .map(|d| (d.severity, d.summary.as_str()))
        .collect();
    if computed != expected {
        bail!("diagnostics mismatch\nexpected: {expected:?}\ncomputed: {diags}");
    }

    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_json::from_value(serde_yaml::from_str(&yaml)?)?;

    for case in &test.cases {
        print!("case {} ", case.note);

        match detect(case) {
            Ok((refs, diags)) => {
                if let Some(error) = &case.error {
                    bail!("expected error `{error}` but analysis succeeded");
                }
                check(case, &refs, &diags)?;
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!("Error message\n`{actual}\n`\ndoes not contain `{expected}`");
                    }
                }
                None => return Err(actual),
            },
        }

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

#[test_resources("tests/classifier/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
