// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::Source;
use crate::parser::Parser;
use crate::value::Value;

use anyhow::{bail, Result};

fn parse(text: &str) -> Result<ExprRef> {
    let source = Source::from_contents("case.tf".to_string(), text.to_string())?;
    Parser::new(&source)?.parse_expr()
}

fn traversals(text: &str) -> Result<Vec<String>> {
    Ok(parse(text)?
        .variables()
        .iter()
        .map(|t| t.to_string())
        .collect())
}

#[test]
fn precedence() -> Result<()> {
    let expr = parse("a + b * c == d || !e && f")?;
    let Expr::LogicExpr {
        op: LogicOp::Or,
        lhs,
        rhs,
        ..
    } = expr.as_ref()
    else {
        bail!("expected `||` at the root: {expr:?}");
    };
    assert!(matches!(
        lhs.as_ref(),
        Expr::BoolExpr {
            op: BoolOp::Eq,
            ..
        }
    ));
    let Expr::LogicExpr {
        op: LogicOp::And,
        lhs,
        ..
    } = rhs.as_ref()
    else {
        bail!("expected `&&` on the right: {rhs:?}");
    };
    assert!(matches!(
        lhs.as_ref(),
        Expr::Unary {
            op: UnaryOp::Not,
            ..
        }
    ));
    Ok(())
}

#[test]
fn conditional_is_right_associative() -> Result<()> {
    let expr = parse("a ? b : c ? d : e")?;
    match expr.as_ref() {
        Expr::Conditional { otherwise, .. } => {
            assert!(matches!(otherwise.as_ref(), Expr::Conditional { .. }))
        }
        _ => bail!("expected conditional: {expr:?}"),
    }
    Ok(())
}

#[test]
fn traversal_steps() -> Result<()> {
    let expr = parse(r#"aws_instance.web[0].tags["Name"]"#)?;
    let Expr::ScopeTraversal { traversal, .. } = expr.as_ref() else {
        bail!("expected traversal: {expr:?}");
    };
    assert_eq!(traversal.steps.len(), 5);
    assert_eq!(traversal.root_name(), Some("aws_instance"));
    assert_eq!(traversal.to_string(), r#"aws_instance.web[0].tags["Name"]"#);
    Ok(())
}

#[test]
fn legacy_index_syntax() -> Result<()> {
    let expr = parse("var.list.0")?;
    let Expr::ScopeTraversal { traversal, .. } = expr.as_ref() else {
        bail!("expected traversal: {expr:?}");
    };
    assert!(matches!(
        &traversal.steps[2],
        Traverser::Index { key, .. } if *key == Value::from(0u64)
    ));
    Ok(())
}

#[test]
fn steps_after_call_are_relative() -> Result<()> {
    let expr = parse("element(var.list, 0).id")?;
    assert!(matches!(expr.as_ref(), Expr::RelativeTraversal { .. }));
    assert_eq!(traversals("element(var.list, 0).id")?, vec!["var.list"]);
    Ok(())
}

#[test]
fn splats() -> Result<()> {
    for text in ["aws_instance.web.*.id", "aws_instance.web[*].id"] {
        let expr = parse(text)?;
        match expr.as_ref() {
            Expr::Splat { source, each, .. } => {
                assert!(matches!(source.as_ref(), Expr::ScopeTraversal { .. }));
                assert_eq!(each.len(), 1);
            }
            _ => bail!("expected splat for {text}: {expr:?}"),
        }
        assert_eq!(traversals(text)?, vec!["aws_instance.web"]);
    }
    Ok(())
}

#[test]
fn call_with_expansion() -> Result<()> {
    let expr = parse("concat(var.a, var.b...)")?;
    match expr.as_ref() {
        Expr::Call {
            name,
            args,
            expand_final,
            ..
        } => {
            assert_eq!(name.text(), "concat");
            assert_eq!(args.len(), 2);
            assert!(*expand_final);
        }
        _ => bail!("expected call: {expr:?}"),
    }
    Ok(())
}

#[test]
fn template_parts() -> Result<()> {
    let expr = parse(r#""a\n${var.x}$${b} é""#)?;
    let Expr::Template { parts, .. } = expr.as_ref() else {
        bail!("expected template: {expr:?}");
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(
        parts[0].as_ref(),
        Expr::Literal { value, .. } if *value == Value::from("a\n")
    ));
    assert!(matches!(parts[1].as_ref(), Expr::ScopeTraversal { .. }));
    assert!(matches!(
        parts[2].as_ref(),
        Expr::Literal { value, .. } if *value == Value::from("${b} é")
    ));
    Ok(())
}

#[test]
fn template_directives_are_rejected() {
    let err = parse(r#""%{ if true }x%{ endif }""#).unwrap_err().to_string();
    assert!(err.contains("template directives are not supported"), "{err}");
}

#[test]
fn invalid_escape() {
    let err = parse(r#""\q""#).unwrap_err().to_string();
    assert!(err.contains("invalid escape sequence"), "{err}");
}

#[test]
fn object_keys() -> Result<()> {
    assert_eq!(
        traversals("{ name = var.a, (var.k) = 1, \"lit\": local.b }")?,
        vec!["var.a", "var.k", "local.b"]
    );
    Ok(())
}

#[test]
fn for_expressions_bind_names() -> Result<()> {
    assert_eq!(
        traversals("[for x in var.list : x.id if x.enabled]")?,
        vec!["var.list"]
    );
    assert_eq!(
        traversals("{for k, v in var.map : k => v.name... if var.keep}")?,
        vec!["var.map", "var.keep"]
    );
    // The bound names do not leak out of the for expression.
    assert_eq!(
        traversals("concat([for x in local.a : x], [x])")?,
        vec!["local.a", "x"]
    );
    Ok(())
}

#[test]
fn for_is_an_ordinary_name_outside_brackets() -> Result<()> {
    assert_eq!(traversals("[for]")?, vec!["for"]);
    Ok(())
}

#[test]
fn nul_does_not_truncate_expression() {
    let err = parse("var.a\u{0} + var.b").unwrap_err().to_string();
    assert!(err.contains("invalid character"), "{err}");
}

#[test]
fn trailing_tokens() {
    let err = parse("var.a var.b").unwrap_err().to_string();
    assert!(err.contains("unexpected token after expression"), "{err}");
}

#[test]
fn body_blocks_and_labels() -> Result<()> {
    let source = Source::from_contents(
        "main.tf".to_string(),
        r#"
resource "aws_instance" web {
  ami = var.ami
  ebs_block_device {
    size = 10
  }
}
name = "x"
"#
        .to_string(),
    )?;
    let body = Parser::new(&source)?.parse_body()?;
    assert_eq!(body.attributes.len(), 1);
    assert_eq!(body.blocks.len(), 1);

    let block = &body.blocks[0];
    assert_eq!(block.type_name, "resource");
    assert_eq!(block.labels, vec!["aws_instance", "web"]);
    assert!(block.body.attr("ami").is_some());
    assert_eq!(block.body.blocks_of_type("ebs_block_device").count(), 1);
    Ok(())
}

#[test]
fn block_labels_cannot_interpolate() -> Result<()> {
    let source = Source::from_contents(
        "main.tf".to_string(),
        "resource \"${var.t}\" {}".to_string(),
    )?;
    let err = match Parser::new(&source)?.parse_body() {
        Ok(_) => bail!("expected an error"),
        Err(e) => e.to_string(),
    };
    assert!(err.contains("block labels cannot contain interpolations"), "{err}");
    Ok(())
}
