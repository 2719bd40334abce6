// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::{Source, SourceRange};

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What went wrong, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    // Malformed reference syntax.
    Grammar,
    // Reference to something that is not declared.
    Resolution,
    // Failure of the host environment, such as the working directory.
    Environment,
    // A construct that is recognized but not handled.
    Unsupported,
    // A broken internal invariant.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub summary: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SourceRange>,
}

const BUG_NOTE: &str = "This is a bug and should be reported.";

impl Diagnostic {
    pub fn error(
        kind: DiagnosticKind,
        summary: &str,
        detail: String,
        subject: Option<SourceRange>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            summary: summary.to_string(),
            detail,
            subject,
        }
    }

    pub fn warning(
        kind: DiagnosticKind,
        summary: &str,
        detail: String,
        subject: Option<SourceRange>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            summary: summary.to_string(),
            detail,
            subject,
        }
    }

    /// An internal error. The detail is extended with a request to report it.
    pub fn bug(summary: &str, detail: String, subject: Option<SourceRange>) -> Self {
        Self::error(
            DiagnosticKind::Internal,
            summary,
            format!("{detail} {BUG_NOTE}"),
            subject,
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render with the subject line of `source` and a caret under its start.
    pub fn render(&self, source: &Source) -> String {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let msg = format!("{}; {}", self.summary, self.detail);
        match &self.subject {
            Some(r) => source.message(r.start.line, r.start.column, kind, &msg),
            None => format!("{kind}: {msg}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        match &self.subject {
            Some(r) => write!(f, "{kind}: {}: {} ({r})", self.summary, self.detail),
            None => write!(f, "{kind}: {}: {}", self.summary, self.detail),
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, d) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
