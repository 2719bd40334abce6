// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;

use anyhow::Result;

fn tokens(text: &str) -> Result<Vec<(TokenKind, String)>> {
    let source = Source::from_contents("case.tf".to_string(), text.to_string())?;
    let mut lexer = Lexer::new(&source);
    let mut out = vec![];
    loop {
        let tok = lexer.next_token()?;
        if tok.0 == TokenKind::Eof {
            break;
        }
        out.push((tok.0, tok.1.text().to_string()));
    }
    Ok(out)
}

fn texts(text: &str) -> Result<Vec<String>> {
    Ok(tokens(text)?.into_iter().map(|(_, t)| t).collect())
}

#[test]
fn identifiers_may_contain_dashes() -> Result<()> {
    let toks = tokens("aws-instance.web_1")?;
    assert_eq!(
        toks,
        vec![
            (TokenKind::Ident, "aws-instance".to_string()),
            (TokenKind::Symbol, ".".to_string()),
            (TokenKind::Ident, "web_1".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn two_character_symbols() -> Result<()> {
    assert_eq!(
        texts("a == b != c <= d >= e && f || g => h...")?,
        vec![
            "a", "==", "b", "!=", "c", "<=", "d", ">=", "e", "&&", "f", "||", "g", "=>", "h", "..."
        ]
    );
    Ok(())
}

#[test]
fn templates_nest_interpolations() -> Result<()> {
    let text = r#""a ${lookup(var.m, "k")} ${ {x = "}"}.x }" rest"#;
    let toks = tokens(text)?;
    assert_eq!(toks.len(), 2);
    assert_eq!(toks[0].0, TokenKind::Template);
    assert_eq!(toks[0].1, r#""a ${lookup(var.m, "k")} ${ {x = "}"}.x }""#);
    assert_eq!(toks[1].1, "rest");
    Ok(())
}

#[test]
fn escaped_interpolation_is_not_skipped() -> Result<()> {
    let toks = tokens(r#""$${var.x}" y"#)?;
    assert_eq!(toks[0].1, r#""$${var.x}""#);
    assert_eq!(toks[1].1, "y");
    Ok(())
}

#[test]
fn comments_are_skipped() -> Result<()> {
    let text = "a # one\nb // two\n/* three\n */ c";
    assert_eq!(texts(text)?, vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn numbers() -> Result<()> {
    let toks = tokens("1 2.5 1e3 7.0E-2")?;
    assert!(toks.iter().all(|(k, _)| *k == TokenKind::Number));
    assert_eq!(toks.len(), 4);
    Ok(())
}

#[test]
fn unterminated_template() {
    let err = tokens("\"abc\nd\"").unwrap_err().to_string();
    assert!(err.contains("unterminated template string"), "{err}");
}

#[test]
fn unterminated_interpolation() {
    let err = tokens("\"${var.x\"").unwrap_err().to_string();
    assert!(err.contains("unterminated"), "{err}");
}

#[test]
fn unterminated_comment() {
    let err = tokens("a /* b").unwrap_err().to_string();
    assert!(err.contains("unterminated comment"), "{err}");
}

#[test]
fn invalid_character() {
    let err = tokens("a ; b").unwrap_err().to_string();
    assert!(err.contains("invalid character"), "{err}");
    // Errors point at the offending character.
    assert!(err.contains("--> case.tf:1:3"), "{err}");
}

#[test]
fn nul_is_not_end_of_input() {
    let err = tokens("var.a\u{0} + var.b").unwrap_err().to_string();
    assert!(err.contains("invalid character"), "{err}");
    assert!(err.contains("--> case.tf:1:6"), "{err}");

    let err = tokens("\"a\u{0}b\"").unwrap_err().to_string();
    assert!(err.contains("invalid character"), "{err}");

    // Comments may run up to a NUL, which is then rejected.
    let err = tokens("# note\u{0}\nx").unwrap_err().to_string();
    assert!(err.contains("invalid character"), "{err}");
}

#[test]
fn positions_count_characters() -> Result<()> {
    let source = Source::from_contents("case.tf".to_string(), "é = 1\nab = \"ü\"".to_string())?;
    assert_eq!(
        source.pos(3),
        Pos {
            line: 1,
            column: 3,
            byte: 3
        }
    );
    let second = source.contents().find("ab").unwrap_or_default() as u32;
    assert_eq!(
        source.pos(second + 5),
        Pos {
            line: 2,
            column: 6,
            byte: second + 5
        }
    );
    assert_eq!(source.line(1), "ab = \"ü\"");
    Ok(())
}

#[test]
fn range_display() -> Result<()> {
    let source = Source::from_contents("main.tf".to_string(), "a\nbc".to_string())?;
    assert_eq!(source.range(0, 1).to_string(), "main.tf:1,1-2");
    assert_eq!(source.range(0, 4).to_string(), "main.tf:1,1-2,3");
    Ok(())
}
