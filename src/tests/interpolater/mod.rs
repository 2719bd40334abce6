// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::test_utils::*;
use crate::*;

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

const MODULE: &str = r#"
dir: modules/app
variables:
  - name: image
  - name: region
    default: westus
locals:
  - name: prefix
"#;

fn interpolater(walk: Walk) -> Result<Interpolater> {
    let module: Module = serde_yaml::from_str(MODULE)?;
    let mut values = BTreeMap::new();
    values.insert("image".to_string(), Value::from("ubuntu"));
    Ok(Interpolater::new(
        walk,
        ContextMeta::default(),
        Rc::new(module),
        Rc::new(StateStore::default()),
        Rc::new(VariableStore::from_root(values)),
    ))
}

fn resolve(interpolater: &Interpolater, expr: &str) -> Result<(Value, Diagnostics)> {
    let source = Source::from_contents("main.tf".to_string(), expr.to_string())?;
    let body = Body::single_attr("value", Parser::new(&source)?.parse_expr()?);
    let (refs, mut diags) = detect_references(&body, &DecodeSpec::attr("value"));
    let (env, more) = interpolater.values(&InterpolationScope::default(), &refs);
    diags.append(more);

    let mut out = Value::new_object();
    for (k, v) in env {
        out.as_object_mut()?.insert(k.as_str().into(), v);
    }
    Ok((out, diags))
}

fn no_working_dir() -> io::Result<PathBuf> {
    Err(io::Error::new(io::ErrorKind::NotFound, "removed"))
}

#[test]
fn missing_working_dir() -> Result<()> {
    let interp = interpolater(Walk::Plan)?.with_working_dir(no_working_dir);
    let (env, diags) = resolve(&interp, "path.cwd")?;

    match_values(&env, &yaml_value("path: {cwd: '', module: modules/app, root: modules/app}")?)?;
    assert_eq!(diags.len(), 1);
    let d = diags.iter().next().unwrap();
    assert_eq!(d.kind, DiagnosticKind::Environment);
    assert_eq!(d.summary, "Unable to get current working directory");
    assert!(d.detail.contains("removed"), "{}", d.detail);
    Ok(())
}

#[test]
fn each_name_resolved_once() -> Result<()> {
    let interp = interpolater(Walk::Plan)?;
    let (env, diags) = resolve(&interp, "[var.image, var.image, var.region, var.imag, var.imag]")?;

    match_values(&env, &yaml_value("var: {image: ubuntu, region: westus, imag: '#dynamic'}")?)?;
    // The misspelled name is reported once.
    assert_eq!(diags.len(), 1);
    let detail = &diags.iter().next().unwrap().detail;
    assert!(detail.ends_with("Did you mean \"image\"?"), "{detail}");
    Ok(())
}

#[test]
fn validate_leaves_variables_unknown() -> Result<()> {
    let interp = interpolater(Walk::Validate)?;
    let (env, diags) = resolve(&interp, "\"${var.image}-${local.prefix}\"")?;
    match_values(&env, &yaml_value("{var: {image: '#dynamic'}, local: {prefix: '#dynamic'}}")?)?;
    assert!(diags.is_empty());
    Ok(())
}

#[test]
fn namespaces_absent_without_references() -> Result<()> {
    let interp = interpolater(Walk::Plan)?;
    let (env, diags) = resolve(&interp, "terraform.workspace")?;
    match_values(&env, &yaml_value("terraform: {workspace: default}")?)?;
    assert!(diags.is_empty());
    Ok(())
}

#[test]
fn rendered_diagnostic_points_at_reference() -> Result<()> {
    let interp = interpolater(Walk::Plan)?;
    let source = Source::from_contents("main.tf".to_string(), "[1, var.nope]".to_string())?;
    let body = Body::single_attr("value", Parser::new(&source)?.parse_expr()?);
    let (refs, _) = detect_references(&body, &DecodeSpec::attr("value"));
    let (_, diags) = interp.values(&InterpolationScope::default(), &refs);

    let rendered = diags.iter().next().unwrap().render(&source);
    assert!(rendered.contains("--> main.tf:1:5"), "{rendered}");
    assert!(
        rendered.ends_with("error: Reference to undefined variable; This module declares no variable named \"nope\"."),
        "{rendered}"
    );
    Ok(())
}

// Input variables that count how often each is looked up.
#[derive(Default)]
struct CountingVariables {
    values: VariableStore,
    lookups: AtomicUsize,
}

impl VariableValues for CountingVariables {
    fn value(&self, path: &ModulePath, name: &str) -> Option<Value> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.values.value(path, name)
    }
}

fn refs_of(expr: &str) -> Result<Vec<Reference>> {
    let source = Source::from_contents("main.tf".to_string(), expr.to_string())?;
    let body = Body::single_attr("value", Parser::new(&source)?.parse_expr()?);
    Ok(detect_references(&body, &DecodeSpec::attr("value")).0)
}

#[test]
fn repeated_reference_is_looked_up_once() -> Result<()> {
    let module: Module = serde_yaml::from_str(MODULE)?;
    let variables = Rc::new(CountingVariables::default());
    variables
        .values
        .set(&ModulePath::root(), "image", Value::from("ubuntu"));
    let interp = Interpolater::new(
        Walk::Plan,
        ContextMeta::default(),
        Rc::new(module),
        Rc::new(StateStore::default()),
        variables.clone(),
    );

    let refs = refs_of("\"${var.image}${var.image}\" == var.image")?;
    assert_eq!(refs.len(), 3);
    let (env, diags) = interp.values(&InterpolationScope::default(), &refs);

    assert_eq!(variables.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(env["var"]["image"], Value::from("ubuntu"));
    assert!(diags.is_empty());
    Ok(())
}

#[test]
fn resolving_again_gives_the_same_result() -> Result<()> {
    let interp = interpolater(Walk::Plan)?.with_working_dir(no_working_dir);
    let refs = refs_of("[var.image, var.imag, local.prefix, path.cwd, count.index, self]")?;
    let scope = InterpolationScope::default();

    let (env, diags) = interp.values(&scope, &refs);
    let (again, again_diags) = interp.values(&scope, &refs);

    assert!(!diags.is_empty());
    assert_eq!(env, again);
    assert_eq!(diags, again_diags);
    Ok(())
}
