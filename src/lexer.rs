// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::*;
use core::cmp;
use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

struct SourceText {
    file: String,
    contents: String,
    // Byte offset at which each line starts.
    line_starts: Vec<u32>,
}

/// A named piece of configuration text. Cloning shares the text.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceText>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Source({:?})", self.src.file)
    }
}

/// A position in a source file.
///
/// Lines and columns start at 1. Columns count characters. Bytes start at 0.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
    pub byte: u32,
}

/// A half-open range of source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

impl SourceRange {
    /// The smallest range covering both `a` and `b`.
    pub fn between(a: &SourceRange, b: &SourceRange) -> SourceRange {
        SourceRange {
            filename: a.filename.clone(),
            start: cmp::min(a.start, b.start),
            end: cmp::max(a.end, b.end),
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{},{}-{}",
                self.filename, self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(
                f,
                "{}:{},{}-{},{}",
                self.filename,
                self.start.line,
                self.start.column,
                self.end.line,
                self.end.column
            )
        }
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        // Offsets are u32 and one past the end must stay representable.
        if contents.len() >= u32::MAX as usize {
            bail!("{file} is too large to analyse");
        }
        let line_starts = std::iter::once(0)
            .chain(contents.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();
        Ok(Self {
            src: Rc::new(SourceText {
                file,
                contents,
                line_starts,
            }),
        })
    }

    pub fn file(&self) -> &str {
        &self.src.file
    }

    pub fn contents(&self) -> &str {
        &self.src.contents
    }

    /// Text of the line at 0-based index `idx`, without its line terminator.
    pub fn line(&self, idx: u32) -> &str {
        let starts = &self.src.line_starts;
        let Some(start) = starts.get(idx as usize) else {
            return "";
        };
        let end = match starts.get(idx as usize + 1) {
            Some(next) => *next as usize - 1,
            None => self.src.contents.len(),
        };
        let text = self.src.contents.get(*start as usize..end).unwrap_or("");
        text.strip_suffix('\r').unwrap_or(text)
    }

    /// Position of a byte offset.
    pub fn pos(&self, byte: u32) -> Pos {
        let starts = &self.src.line_starts;
        let idx = starts.partition_point(|s| *s <= byte).saturating_sub(1);
        let line_start = starts[idx] as usize;
        let column = self
            .src
            .contents
            .get(line_start..byte as usize)
            .map_or(1, |prefix| prefix.chars().count() as u32 + 1);
        Pos {
            line: idx as u32 + 1,
            column,
            byte,
        }
    }

    pub fn range(&self, start: u32, end: u32) -> SourceRange {
        SourceRange {
            filename: self.src.file.clone(),
            start: self.pos(start),
            end: self.pos(end),
        }
    }

    /// Render `msg` with the source line and a caret under `col`.
    ///
    /// ```text
    /// --> main.tf:3:9
    ///   |
    /// 3 |   ami = var.ami
    ///   |         ^
    /// error: ...
    /// ```
    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line == 0 || line as usize > self.src.line_starts.len() {
            return format!("{}: {kind}: {msg}", self.src.file);
        }

        let gutter = " ".repeat(line.to_string().len() + 1);
        let indent = " ".repeat(col.saturating_sub(1) as usize);
        format!(
            "\n--> {file}:{line}:{col}\n{gutter}|\n{line:<width$}| {text}\n{gutter}| {indent}^\n{kind}: {msg}",
            file = self.src.file,
            width = gutter.len(),
            text = self.line(line - 1),
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow!(self.message(line, col, "error", msg))
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(source: &Source, start: u32, end: u32) -> Span {
        let pos = source.pos(start);
        Span {
            source: source.clone(),
            line: pos.line,
            col: pos.column,
            start,
            end,
        }
    }

    /// Span from the start of `self` to the end of `other`.
    pub fn join(&self, other: &Span) -> Span {
        Span {
            source: self.source.clone(),
            line: self.line,
            col: self.col,
            start: self.start,
            end: cmp::max(self.end, other.end),
        }
    }

    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn range(&self) -> SourceRange {
        self.source.range(self.start, self.end)
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{:?}", self.line, self.col, self.text())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    // A quoted string including its quotes. May contain interpolations.
    Template,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    offset: usize,
    end: usize,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self::new_range(source, 0, source.contents().len())
    }

    /// Lexer over the byte range `start..end` of the source.
    pub fn new_range(source: &'source Source, start: usize, end: usize) -> Self {
        let text = source.contents().get(start..end).unwrap_or("");
        Self {
            source: source.clone(),
            iter: text.char_indices().peekable(),
            offset: start,
            end: start + text.len(),
        }
    }

    // Past the end of input `peek` and `peekahead` yield NUL at offset
    // `end`. A NUL inside the text is told apart by its offset.
    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index + self.offset, *chr),
            _ => (self.end, '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index + self.offset, chr),
            _ => (self.end, '\x00'),
        }
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        Token(kind, Span::new(&self.source, start as u32, end as u32))
    }

    fn error_at(&self, byte: usize, msg: &str) -> anyhow::Error {
        let pos = self.source.pos(byte as u32);
        self.source.error(pos.line, pos.column, msg)
    }

    fn read_ident(&mut self) -> Token {
        let start = self.peek().0;
        loop {
            let ch = self.peek().1;
            if ch.is_alphanumeric() || ch == '_' || ch == '-' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.token(TokenKind::Ident, start, end)
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.peek().0;
        self.read_digits();

        // . must be followed by at least 1 digit.
        if self.peek().1 == '.' && self.peekahead(1).1.is_ascii_digit() {
            self.iter.next();
            self.read_digits();
        }

        let ch = self.peek().1;
        if ch == 'e' || ch == 'E' {
            self.iter.next();
            if matches!(self.peek().1, '+' | '-') {
                self.iter.next();
            }
            if !self.peek().1.is_ascii_digit() {
                return Err(self.error_at(start, "invalid number"));
            }
            self.read_digits();
        }

        let end = self.peek().0;
        let ch = self.peek().1;
        if ch == '_' || ch.is_ascii_alphabetic() {
            return Err(self.error_at(end, "invalid number"));
        }

        Ok(self.token(TokenKind::Number, start, end))
    }

    // Reads a quoted template. Interpolation sequences are skipped by lexing
    // their contents so that quotes and braces inside them nest correctly.
    fn read_template(&mut self) -> Result<Token> {
        let start = self.peek().0;
        self.iter.next();
        loop {
            let (offset, ch) = self.peek();
            match ch {
                '"' => {
                    self.iter.next();
                    break;
                }
                '\x00' if offset < self.end => {
                    return Err(self.error_at(offset, "invalid character"));
                }
                '\x00' | '\n' => {
                    return Err(self.error_at(start, "unterminated template string"));
                }
                '\\' => {
                    self.iter.next();
                    let (next, escaped) = self.peek();
                    if escaped == '\n' || next >= self.end {
                        return Err(self.error_at(offset, "invalid escape sequence"));
                    }
                    self.iter.next();
                }
                '$' | '%' if self.peekahead(1).1 == ch && self.peekahead(2).1 == '{' => {
                    // Escaped $${ or %%{.
                    self.iter.next();
                    self.iter.next();
                    self.iter.next();
                }
                '$' | '%' if self.peekahead(1).1 == '{' => {
                    self.iter.next();
                    self.iter.next();
                    self.skip_interpolation(offset)?;
                }
                _ => {
                    self.iter.next();
                }
            }
        }
        let end = self.peek().0;
        Ok(self.token(TokenKind::Template, start, end))
    }

    fn skip_interpolation(&mut self, open: usize) -> Result<()> {
        let mut depth = 0usize;
        loop {
            let tok = self.next_token()?;
            match (tok.0, tok.1.text()) {
                (TokenKind::Eof, _) => {
                    return Err(self.error_at(open, "unterminated template interpolation"))
                }
                (TokenKind::Symbol, "{") => depth += 1,
                (TokenKind::Symbol, "}") if depth == 0 => return Ok(()),
                (TokenKind::Symbol, "}") => depth -= 1,
                _ => (),
            }
        }
    }

    fn skip_ws(&mut self) -> Result<()> {
        // Newlines are insignificant within expressions and are skipped along
        // with comments.
        'outer: loop {
            match self.peek().1 {
                ' ' | '\t' | '\r' | '\n' => (),
                '#' => {
                    self.skip_line();
                    continue 'outer;
                }
                '/' if self.peekahead(1).1 == '/' => {
                    self.skip_line();
                    continue 'outer;
                }
                '/' if self.peekahead(1).1 == '*' => {
                    let start = self.peek().0;
                    self.iter.next();
                    self.iter.next();
                    loop {
                        let (offset, ch) = self.peek();
                        match ch {
                            '*' if self.peekahead(1).1 == '/' => {
                                self.iter.next();
                                self.iter.next();
                                continue 'outer;
                            }
                            _ if offset >= self.end => {
                                return Err(self.error_at(start, "unterminated comment"))
                            }
                            _ => {
                                self.iter.next();
                            }
                        }
                    }
                }
                _ => break,
            }
            self.iter.next();
        }
        Ok(())
    }

    fn skip_line(&mut self) {
        loop {
            let (offset, ch) = self.peek();
            if ch == '\n' || offset >= self.end {
                return;
            }
            self.iter.next();
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, chr) = self.peek();
        let next = self.peekahead(1).1;

        match chr {
            '.' if next == '.' && self.peekahead(2).1 == '.' => {
                self.iter.nth(2);
                Ok(self.token(TokenKind::Symbol, start, start + 3))
            }
            '=' if next == '=' || next == '>' => self.symbol2(start),
            '!' | '<' | '>' if next == '=' => self.symbol2(start),
            '&' if next == '&' => self.symbol2(start),
            '|' if next == '|' => self.symbol2(start),
            // grouping characters
            '{' | '}' | '[' | ']' | '(' | ')' |
            // arith operators
            '+' | '-' | '*' | '/' | '%' |
            // logic and comparison
            '!' | '<' | '>' | '=' |
            // separators
            ',' | '.' | ':' | '?' => {
                self.iter.next();
                Ok(self.token(TokenKind::Symbol, start, start + 1))
            }
            '"' => self.read_template(),
            '\x00' if start >= self.end => Ok(self.token(TokenKind::Eof, start, start)),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_alphabetic() || chr == '_' => Ok(self.read_ident()),
            _ => Err(self.error_at(start, "invalid character")),
        }
    }

    fn symbol2(&mut self, start: usize) -> Result<Token> {
        self.iter.next();
        self.iter.next();
        Ok(self.token(TokenKind::Symbol, start, start + 2))
    }
}
