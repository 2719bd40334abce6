// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;
use crate::value::Value;
use crate::*;

use core::{cmp, fmt, ops::Deref};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BoolOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LogicOp {
    And,
    Or,
}

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> cmp::Ord for NodeRef<T> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        Rc::as_ptr(&self.r).cmp(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::PartialOrd for NodeRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

/// One step of a traversal.
#[derive(Debug, Clone)]
pub enum Traverser {
    // Name of a variable in scope. Only valid as the first step.
    Root { span: Span, name: String },
    // `.name`
    Attr { span: Span, name: String },
    // `[key]` with a literal key.
    Index { span: Span, key: Value },
}

impl Traverser {
    pub fn span(&self) -> &Span {
        match self {
            Self::Root { span, .. } | Self::Attr { span, .. } | Self::Index { span, .. } => span,
        }
    }
}

/// A static path through the variables of a scope, e.g. `var.foo["eek"]`.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub steps: Vec<Traverser>,
}

impl Traversal {
    pub fn new(steps: Vec<Traverser>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn root_name(&self) -> Option<&str> {
        match self.steps.first() {
            Some(Traverser::Root { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Range covering every step.
    pub fn range(&self) -> Option<SourceRange> {
        match (self.steps.first(), self.steps.last()) {
            (Some(first), Some(last)) => Some(first.span().join(last.span()).range()),
            _ => None,
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                Traverser::Root { name, .. } => write!(f, "{name}")?,
                Traverser::Attr { name, .. } => write!(f, ".{name}")?,
                Traverser::Index { key, .. } => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Expr {
    Literal {
        span: Span,
        value: Value,
    },

    // Quoted string. Literal parts are Literal expressions.
    Template {
        span: Span,
        parts: Vec<ExprRef>,
    },

    ScopeTraversal {
        span: Span,
        traversal: Traversal,
    },

    // Traversal applied to the result of another expression.
    RelativeTraversal {
        span: Span,
        source: ExprRef,
        steps: Vec<Traverser>,
    },

    // Index with a computed key.
    Index {
        span: Span,
        collection: ExprRef,
        key: ExprRef,
    },

    // `source.*.rest` or `source[*].rest`
    Splat {
        span: Span,
        source: ExprRef,
        each: Vec<Traverser>,
    },

    Call {
        span: Span,
        name: Span,
        args: Vec<ExprRef>,
        expand_final: bool,
    },

    Tuple {
        span: Span,
        items: Vec<ExprRef>,
    },

    Object {
        span: Span,
        fields: Vec<(ExprRef, ExprRef)>,
    },

    Unary {
        span: Span,
        op: UnaryOp,
        expr: ExprRef,
    },

    ArithExpr {
        span: Span,
        op: ArithOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },

    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },

    LogicExpr {
        span: Span,
        op: LogicOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },

    Conditional {
        span: Span,
        cond: ExprRef,
        then: ExprRef,
        otherwise: ExprRef,
    },

    // `[for k, v in coll : value if cond]` or `{for k, v in coll : key => value... if cond}`
    For {
        span: Span,
        key_var: Option<Span>,
        value_var: Span,
        collection: ExprRef,
        key: Option<ExprRef>,
        value: ExprRef,
        condition: Option<ExprRef>,
        group: bool,
    },

    Parens {
        span: Span,
        expr: ExprRef,
    },
}

pub type ExprRef = Ref<Expr>;

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Literal { span, .. }
            | Template { span, .. }
            | ScopeTraversal { span, .. }
            | RelativeTraversal { span, .. }
            | Index { span, .. }
            | Splat { span, .. }
            | Call { span, .. }
            | Tuple { span, .. }
            | Object { span, .. }
            | Unary { span, .. }
            | ArithExpr { span, .. }
            | BoolExpr { span, .. }
            | LogicExpr { span, .. }
            | Conditional { span, .. }
            | For { span, .. }
            | Parens { span, .. } => span,
        }
    }

    /// Traversals of scope variables used by the expression, in source order.
    ///
    /// Names bound by an enclosing `for` expression are local to it and are
    /// not reported.
    pub fn variables(&self) -> Vec<Traversal> {
        let mut out = vec![];
        let mut bound = vec![];
        self.walk_variables(&mut bound, &mut out);
        out
    }

    fn walk_variables<'a>(&'a self, bound: &mut Vec<&'a str>, out: &mut Vec<Traversal>) {
        use Expr::*;
        match self {
            Literal { .. } => (),
            ScopeTraversal { traversal, .. } => match traversal.root_name() {
                Some(name) if bound.contains(&name) => (),
                _ => out.push(traversal.clone()),
            },
            Template { parts, .. } => {
                for p in parts {
                    p.walk_variables(bound, out);
                }
            }
            RelativeTraversal { source, .. } | Splat { source, .. } => {
                source.walk_variables(bound, out)
            }
            Index {
                collection, key, ..
            } => {
                collection.walk_variables(bound, out);
                key.walk_variables(bound, out);
            }
            Call { args, .. } => {
                for a in args {
                    a.walk_variables(bound, out);
                }
            }
            Tuple { items, .. } => {
                for i in items {
                    i.walk_variables(bound, out);
                }
            }
            Object { fields, .. } => {
                for (k, v) in fields {
                    k.walk_variables(bound, out);
                    v.walk_variables(bound, out);
                }
            }
            Unary { expr, .. } | Parens { expr, .. } => expr.walk_variables(bound, out),
            ArithExpr { lhs, rhs, .. } | BoolExpr { lhs, rhs, .. } | LogicExpr { lhs, rhs, .. } => {
                lhs.walk_variables(bound, out);
                rhs.walk_variables(bound, out);
            }
            Conditional {
                cond,
                then,
                otherwise,
                ..
            } => {
                cond.walk_variables(bound, out);
                then.walk_variables(bound, out);
                otherwise.walk_variables(bound, out);
            }
            For {
                key_var,
                value_var,
                collection,
                key,
                value,
                condition,
                ..
            } => {
                // The collection is evaluated in the enclosing scope.
                collection.walk_variables(bound, out);

                let mark = bound.len();
                if let Some(k) = key_var {
                    bound.push(k.text());
                }
                bound.push(value_var.text());
                if let Some(k) = key {
                    k.walk_variables(bound, out);
                }
                value.walk_variables(bound, out);
                if let Some(c) = condition {
                    c.walk_variables(bound, out);
                }
                bound.truncate(mark);
            }
        }
    }
}
