// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::decoder::{Attribute, Block, Body};
use crate::lexer::*;
use crate::number::*;
use crate::value::*;

use core::str::FromStr;

use anyhow::{bail, Result};
use indexmap::IndexMap;

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        Self::from_lexer(source, Lexer::new(source))
    }

    fn new_range(source: &'source Source, start: usize, end: usize) -> Result<Self> {
        Self::from_lexer(source, Lexer::new_range(source, start, end))
    }

    fn from_lexer(source: &'source Source, mut lexer: Lexer<'source>) -> Result<Self> {
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            end: tok.1.start,
            tok,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::Template => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn peek_token(&self) -> Result<Token> {
        self.lexer.clone().next_token()
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn expect_eof(&self, context: &str) -> Result<()> {
        match self.tok.0 {
            TokenKind::Eof => Ok(()),
            _ => Err(self.tok.1.error(&format!("unexpected token {context}"))),
        }
    }

    // Span from `start` up to the end of the last consumed token.
    fn span_from(&self, start: &Span) -> Span {
        Span::new(&self.source, start.start, self.end)
    }

    /// Parse a standalone expression. The whole source must be consumed.
    pub fn parse_expr(&mut self) -> Result<ExprRef> {
        let expr = self.parse_expression()?;
        self.expect_eof("after expression")?;
        Ok(expr)
    }

    /// Parse a configuration body made of attributes and blocks.
    pub fn parse_body(&mut self) -> Result<Body> {
        let body = self.parse_body_items()?;
        self.expect_eof("in body")?;
        Ok(body)
    }

    fn parse_body_items(&mut self) -> Result<Body> {
        let mut attributes: IndexMap<String, Attribute> = IndexMap::new();
        let mut blocks = vec![];
        loop {
            match (&self.tok.0, self.token_text()) {
                (TokenKind::Eof, _) | (TokenKind::Symbol, "}") => break,
                (TokenKind::Ident, _) => (),
                _ => bail!(self.tok.1.error("expecting attribute or block")),
            }

            let name = self.tok.1.clone();
            self.next_token()?;

            if self.token_text() == "=" {
                self.next_token()?;
                let expr = self.parse_expression()?;
                if attributes.contains_key(name.text()) {
                    bail!(name.error(&format!("duplicate attribute `{}`", name.text())));
                }
                attributes.insert(
                    name.text().to_string(),
                    Attribute {
                        name: name.text().to_string(),
                        span: self.span_from(&name),
                        expr,
                    },
                );
                continue;
            }

            let mut labels = vec![];
            loop {
                match self.tok.0 {
                    TokenKind::Template => {
                        labels.push(self.parse_label()?);
                        self.next_token()?;
                    }
                    TokenKind::Ident => {
                        labels.push(self.tok.1.text().to_string());
                        self.next_token()?;
                    }
                    _ => break,
                }
            }
            self.expect("{", "to open block body")?;
            let body = self.parse_body_items()?;
            self.expect("}", "to close block body")?;
            blocks.push(Block {
                type_name: name.text().to_string(),
                labels,
                span: self.span_from(&name),
                body,
            });
        }

        Ok(Body { attributes, blocks })
    }

    fn parse_label(&mut self) -> Result<String> {
        let expr = self.parse_template()?;
        match expr.as_ref() {
            Expr::Template { parts, .. } if parts.is_empty() => Ok(String::new()),
            Expr::Template { parts, .. } if parts.len() == 1 => match parts[0].as_ref() {
                Expr::Literal {
                    value: Value::String(s),
                    ..
                } => Ok(s.to_string()),
                _ => bail!(self.tok.1.error("block labels cannot contain interpolations")),
            },
            _ => bail!(self.tok.1.error("block labels cannot contain interpolations")),
        }
    }

    pub fn parse_expression(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let cond = self.parse_or()?;
        if self.token_text() != "?" {
            return Ok(cond);
        }
        self.next_token()?;
        let then = self.parse_expression()?;
        self.expect(":", "in conditional expression")?;
        let otherwise = self.parse_expression()?;
        Ok(Ref::new(Expr::Conditional {
            span: self.span_from(&start),
            cond,
            then,
            otherwise,
        }))
    }

    fn parse_or(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_and()?;
        while self.token_text() == "||" {
            self.next_token()?;
            let rhs = self.parse_and()?;
            expr = Ref::new(Expr::LogicExpr {
                span: self.span_from(&start),
                op: LogicOp::Or,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_equality()?;
        while self.token_text() == "&&" {
            self.next_token()?;
            let rhs = self.parse_equality()?;
            expr = Ref::new(Expr::LogicExpr {
                span: self.span_from(&start),
                op: LogicOp::And,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.token_text() {
                "==" => BoolOp::Eq,
                "!=" => BoolOp::Ne,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let rhs = self.parse_comparison()?;
            expr = Ref::new(Expr::BoolExpr {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_comparison(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.token_text() {
                "<" => BoolOp::Lt,
                "<=" => BoolOp::Le,
                ">" => BoolOp::Gt,
                ">=" => BoolOp::Ge,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let rhs = self.parse_additive()?;
            expr = Ref::new(Expr::BoolExpr {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_additive(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.token_text() {
                "+" => ArithOp::Add,
                "-" => ArithOp::Sub,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let rhs = self.parse_multiplicative()?;
            expr = Ref::new(Expr::ArithExpr {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_multiplicative(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.token_text() {
                "*" => ArithOp::Mul,
                "/" => ArithOp::Div,
                "%" => ArithOp::Mod,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let rhs = self.parse_unary()?;
            expr = Ref::new(Expr::ArithExpr {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_unary(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let op = match (&self.tok.0, self.token_text()) {
            (TokenKind::Symbol, "!") => UnaryOp::Not,
            (TokenKind::Symbol, "-") => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.next_token()?;
        let expr = self.parse_unary()?;
        Ok(Ref::new(Expr::Unary {
            span: self.span_from(&start),
            op,
            expr,
        }))
    }

    // Appends a static step to a traversal chain. Steps after a scope
    // variable extend its traversal; steps after any other expression form a
    // relative traversal.
    fn push_step(&self, start: &Span, expr: ExprRef, step: Traverser) -> ExprRef {
        let span = self.span_from(start);
        match expr.as_ref() {
            Expr::ScopeTraversal { traversal, .. } => {
                let mut steps = traversal.steps.clone();
                steps.push(step);
                Ref::new(Expr::ScopeTraversal {
                    span,
                    traversal: Traversal::new(steps),
                })
            }
            Expr::RelativeTraversal { source, steps, .. } => {
                let mut steps = steps.clone();
                steps.push(step);
                Ref::new(Expr::RelativeTraversal {
                    span,
                    source: source.clone(),
                    steps,
                })
            }
            _ => Ref::new(Expr::RelativeTraversal {
                span,
                source: expr.clone(),
                steps: vec![step],
            }),
        }
    }

    fn parse_postfix(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_primary()?;
        loop {
            match (&self.tok.0, self.token_text()) {
                (TokenKind::Symbol, ".") => {
                    let dot = self.tok.1.clone();
                    self.next_token()?;
                    match self.tok.0 {
                        TokenKind::Ident => {
                            let name = self.tok.1.text().to_string();
                            self.next_token()?;
                            let step = Traverser::Attr {
                                span: self.span_from(&dot),
                                name,
                            };
                            expr = self.push_step(&start, expr, step);
                        }
                        // Legacy index syntax: `foo.0`
                        TokenKind::Number => {
                            let key = self.parse_number()?;
                            self.next_token()?;
                            let step = Traverser::Index {
                                span: self.span_from(&dot),
                                key,
                            };
                            expr = self.push_step(&start, expr, step);
                        }
                        TokenKind::Symbol if self.token_text() == "*" => {
                            self.next_token()?;
                            let each = self.parse_splat_steps(false)?;
                            expr = Ref::new(Expr::Splat {
                                span: self.span_from(&start),
                                source: expr,
                                each,
                            });
                        }
                        _ => bail!(self.tok.1.error("expecting attribute name after `.`")),
                    }
                }
                (TokenKind::Symbol, "[") => {
                    let open = self.tok.1.clone();
                    self.next_token()?;
                    if self.token_text() == "*" && self.peek_token()?.1.text() == "]" {
                        self.next_token()?;
                        self.next_token()?;
                        let each = self.parse_splat_steps(true)?;
                        expr = Ref::new(Expr::Splat {
                            span: self.span_from(&start),
                            source: expr,
                            each,
                        });
                        continue;
                    }

                    let key = self.parse_expression()?;
                    self.expect("]", "to close index")?;
                    expr = match key.as_ref() {
                        Expr::Literal { value, .. } => {
                            let step = Traverser::Index {
                                span: self.span_from(&open),
                                key: value.clone(),
                            };
                            self.push_step(&start, expr, step)
                        }
                        _ => Ref::new(Expr::Index {
                            span: self.span_from(&start),
                            collection: expr,
                            key,
                        }),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    // Steps applied to each element of a splat. Attribute-only splats take
    // attribute steps; full splats take index steps too.
    fn parse_splat_steps(&mut self, full: bool) -> Result<Vec<Traverser>> {
        let mut each = vec![];
        loop {
            match self.token_text() {
                "." if self.peek_token()?.0 == TokenKind::Ident => {
                    let dot = self.tok.1.clone();
                    self.next_token()?;
                    let name = self.tok.1.text().to_string();
                    self.next_token()?;
                    each.push(Traverser::Attr {
                        span: self.span_from(&dot),
                        name,
                    });
                }
                "[" if full => {
                    let mut ahead = self.clone();
                    ahead.next_token()?;
                    let key = match ahead.tok.0 {
                        TokenKind::Number => ahead.parse_number()?,
                        _ => return Ok(each),
                    };
                    ahead.next_token()?;
                    if ahead.token_text() != "]" {
                        return Ok(each);
                    }
                    let open = self.tok.1.clone();
                    ahead.next_token()?;
                    *self = ahead;
                    each.push(Traverser::Index {
                        span: self.span_from(&open),
                        key,
                    });
                }
                _ => return Ok(each),
            }
        }
    }

    fn parse_number(&self) -> Result<Value> {
        match Number::from_str(self.tok.1.text()) {
            Ok(n) => Ok(Value::from(n)),
            Err(_) => bail!(self.tok.1.error("invalid number")),
        }
    }

    fn parse_primary(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        match (&self.tok.0, self.token_text()) {
            (TokenKind::Number, _) => {
                let value = self.parse_number()?;
                self.next_token()?;
                Ok(Ref::new(Expr::Literal { span: start, value }))
            }
            (TokenKind::Template, _) => {
                let expr = self.parse_template()?;
                self.next_token()?;
                Ok(expr)
            }
            (TokenKind::Ident, "true" | "false" | "null") => {
                let value = match start.text() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::Null,
                };
                self.next_token()?;
                Ok(Ref::new(Expr::Literal { span: start, value }))
            }
            (TokenKind::Ident, _) => {
                self.next_token()?;
                if self.token_text() == "(" {
                    return self.parse_call(start);
                }
                Ok(Ref::new(Expr::ScopeTraversal {
                    span: start.clone(),
                    traversal: Traversal::new(vec![Traverser::Root {
                        name: start.text().to_string(),
                        span: start,
                    }]),
                }))
            }
            (TokenKind::Symbol, "(") => {
                self.next_token()?;
                let expr = self.parse_expression()?;
                self.expect(")", "to close parenthesized expression")?;
                Ok(Ref::new(Expr::Parens {
                    span: self.span_from(&start),
                    expr,
                }))
            }
            (TokenKind::Symbol, "[") => self.parse_tuple(),
            (TokenKind::Symbol, "{") => self.parse_object(),
            _ => bail!(self.tok.1.error("expecting expression")),
        }
    }

    fn parse_call(&mut self, name: Span) -> Result<ExprRef> {
        self.expect("(", "to open argument list")?;
        let mut args = vec![];
        let mut expand_final = false;
        while self.token_text() != ")" {
            args.push(self.parse_expression()?);
            match self.token_text() {
                "," => self.next_token()?,
                "..." => {
                    self.next_token()?;
                    expand_final = true;
                    break;
                }
                _ => break,
            }
        }
        self.expect(")", "to close argument list")?;
        Ok(Ref::new(Expr::Call {
            span: self.span_from(&name),
            name,
            args,
            expand_final,
        }))
    }

    fn is_for_keyword(&self) -> Result<bool> {
        Ok(self.tok.0 == TokenKind::Ident
            && self.token_text() == "for"
            && self.peek_token()?.0 == TokenKind::Ident)
    }

    fn parse_tuple(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        self.expect("[", "to open tuple")?;
        if self.is_for_keyword()? {
            return self.parse_for(start, "]");
        }
        let mut items = vec![];
        while self.token_text() != "]" {
            items.push(self.parse_expression()?);
            if self.token_text() != "," {
                break;
            }
            self.next_token()?;
        }
        self.expect("]", "to close tuple")?;
        Ok(Ref::new(Expr::Tuple {
            span: self.span_from(&start),
            items,
        }))
    }

    fn parse_object(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        self.expect("{", "to open object")?;
        if self.is_for_keyword()? {
            return self.parse_for(start, "}");
        }
        let mut fields = vec![];
        while self.token_text() != "}" {
            // A bare identifier key is the literal name, not a variable.
            let key = match self.tok.0 {
                TokenKind::Ident if matches!(self.peek_token()?.1.text(), "=" | ":") => {
                    let span = self.tok.1.clone();
                    self.next_token()?;
                    Ref::new(Expr::Literal {
                        value: Value::from(span.text()),
                        span,
                    })
                }
                _ => self.parse_expression()?,
            };
            match self.token_text() {
                "=" | ":" => self.next_token()?,
                _ => bail!(self.tok.1.error("expecting `=` or `:` after object key")),
            }
            let value = self.parse_expression()?;
            fields.push((key, value));
            if self.token_text() == "," {
                self.next_token()?;
            }
        }
        self.expect("}", "to close object")?;
        Ok(Ref::new(Expr::Object {
            span: self.span_from(&start),
            fields,
        }))
    }

    fn parse_for(&mut self, start: Span, close: &str) -> Result<ExprRef> {
        // Skip `for`.
        self.next_token()?;

        let first = self.parse_ident("in for expression")?;
        let (key_var, value_var) = if self.token_text() == "," {
            self.next_token()?;
            (Some(first), self.parse_ident("in for expression")?)
        } else {
            (None, first)
        };
        if self.token_text() != "in" {
            bail!(self.tok.1.error("expecting `in` in for expression"));
        }
        self.next_token()?;
        let collection = self.parse_expression()?;
        self.expect(":", "in for expression")?;

        let is_object = close == "}";
        let key = if is_object {
            let key = self.parse_expression()?;
            self.expect("=>", "in object for expression")?;
            Some(key)
        } else {
            None
        };
        let value = self.parse_expression()?;

        let mut group = false;
        if is_object && self.token_text() == "..." {
            self.next_token()?;
            group = true;
        }

        let mut condition = None;
        if self.tok.0 == TokenKind::Ident && self.token_text() == "if" {
            self.next_token()?;
            condition = Some(self.parse_expression()?);
        }

        self.expect(close, "to close for expression")?;
        Ok(Ref::new(Expr::For {
            span: self.span_from(&start),
            key_var,
            value_var,
            collection,
            key,
            value,
            condition,
            group,
        }))
    }

    fn parse_ident(&mut self, context: &str) -> Result<Span> {
        if self.tok.0 != TokenKind::Ident {
            bail!(self.tok.1.error(&format!("expecting identifier {context}")));
        }
        let span = self.tok.1.clone();
        self.next_token()?;
        Ok(span)
    }

    // Splits the current template token into literal parts and
    // interpolations. Each interpolation is parsed by a parser restricted to
    // the rest of the template.
    fn parse_template(&mut self) -> Result<ExprRef> {
        let span = self.tok.1.clone();
        let source = self.source.clone();
        let contents = source.contents();
        let content_start = span.start as usize + 1;
        let content_end = span.end as usize - 1;

        let mut parts = vec![];
        let mut literal = String::new();
        let mut literal_start = content_start;
        let mut pos = content_start;

        while pos < content_end {
            let rest = &contents[pos..content_end];
            let mut chars = rest.chars();
            let ch = match chars.next() {
                Some(ch) => ch,
                None => break,
            };

            if rest.starts_with("$${") || rest.starts_with("%%{") {
                literal.push_str(&rest[1..3]);
                pos += 3;
                continue;
            }

            if rest.starts_with("%{") {
                let pos = source.pos(pos as u32);
                bail!(source.error(pos.line, pos.column, "template directives are not supported"));
            }

            if rest.starts_with("${") {
                if !literal.is_empty() {
                    parts.push(Ref::new(Expr::Literal {
                        span: Span::new(&source, literal_start as u32, pos as u32),
                        value: Value::from(std::mem::take(&mut literal)),
                    }));
                }
                let mut inner = Parser::new_range(&source, pos + 2, content_end)?;
                let expr = inner.parse_expression()?;
                if inner.token_text() != "}" {
                    bail!(inner.tok.1.error("expecting `}` to close interpolation"));
                }
                parts.push(expr);
                pos = inner.tok.1.end as usize;
                literal_start = pos;
                continue;
            }

            if ch == '\\' {
                let (decoded, len) = Self::decode_escape(&source, pos, &rest[1..])?;
                literal.push(decoded);
                pos += 1 + len;
                continue;
            }

            literal.push(ch);
            pos += ch.len_utf8();
        }

        if !literal.is_empty() {
            parts.push(Ref::new(Expr::Literal {
                span: Span::new(&source, literal_start as u32, content_end as u32),
                value: Value::from(literal),
            }));
        }

        Ok(Ref::new(Expr::Template { span, parts }))
    }

    fn decode_escape(source: &Source, pos: usize, rest: &str) -> Result<(char, usize)> {
        let invalid = || {
            let p = source.pos(pos as u32);
            source.error(p.line, p.column, "invalid escape sequence")
        };
        let ch = match rest.chars().next() {
            Some(ch) => ch,
            None => return Err(invalid()),
        };
        let simple = match ch {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            '"' => Some('"'),
            '\\' => Some('\\'),
            _ => None,
        };
        if let Some(c) = simple {
            return Ok((c, 1));
        }

        let digits = match ch {
            'u' => 4,
            'U' => 8,
            _ => return Err(invalid()),
        };
        let hex = rest.get(1..1 + digits).ok_or_else(invalid)?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
        let c = char::from_u32(code).ok_or_else(invalid)?;
        Ok((c, 1 + digits))
    }
}
