// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{ExprRef, Traversal};
use crate::lexer::Span;

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub span: Span,
    pub expr: ExprRef,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub type_name: String,
    pub labels: Vec<String>,
    pub span: Span,
    pub body: Body,
}

/// The contents of a configuration file or block.
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub attributes: IndexMap<String, Attribute>,
    pub blocks: Vec<Block>,
}

impl Body {
    /// A body holding exactly one attribute.
    pub fn single_attr(name: &str, expr: ExprRef) -> Body {
        let mut attributes = IndexMap::new();
        attributes.insert(
            name.to_string(),
            Attribute {
                name: name.to_string(),
                span: expr.span().clone(),
                expr,
            },
        );
        Body {
            attributes,
            blocks: vec![],
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn blocks_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Block> {
        self.blocks.iter().filter(move |b| b.type_name == type_name)
    }
}

/// Describes which parts of a body are decoded, and so which expressions
/// are analysed for references.
///
/// Only the shape matters here. Types and item counts are checked when the
/// body is decoded, which happens elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeSpec {
    Attr { name: String },
    Object(IndexMap<String, DecodeSpec>),
    Tuple(Vec<DecodeSpec>),
    // A single nested block.
    Block {
        type_name: String,
        nested: Box<DecodeSpec>,
    },
    // Any number of nested blocks of the same type.
    BlockList {
        type_name: String,
        nested: Box<DecodeSpec>,
    },
}

impl DecodeSpec {
    pub fn attr(name: &str) -> DecodeSpec {
        DecodeSpec::Attr {
            name: name.to_string(),
        }
    }

    /// Spec that decodes everything `body` contains, for bodies without a
    /// schema.
    pub fn from_body(body: &Body) -> DecodeSpec {
        let mut fields = IndexMap::new();
        for name in body.attributes.keys() {
            fields.insert(name.clone(), DecodeSpec::attr(name));
        }
        for block in &body.blocks {
            if fields.contains_key(&block.type_name) {
                continue;
            }
            let nested = Self::merged_blocks(body, &block.type_name);
            fields.insert(
                block.type_name.clone(),
                DecodeSpec::BlockList {
                    type_name: block.type_name.clone(),
                    nested: Box::new(nested),
                },
            );
        }
        DecodeSpec::Object(fields)
    }

    // Union of the specs of every block of one type.
    fn merged_blocks(body: &Body, type_name: &str) -> DecodeSpec {
        let mut merged = DecodeSpec::Object(IndexMap::new());
        for block in body.blocks_of_type(type_name) {
            merged.merge(Self::from_body(&block.body));
        }
        merged
    }

    // Fold `other` into `self`. Fields present on both sides are merged
    // at every depth, so sibling blocks contribute all of their contents.
    fn merge(&mut self, other: DecodeSpec) {
        match (self, other) {
            (DecodeSpec::Object(fields), DecodeSpec::Object(more)) => {
                for (name, spec) in more {
                    match fields.get_mut(&name) {
                        Some(existing) => existing.merge(spec),
                        None => {
                            fields.insert(name, spec);
                        }
                    }
                }
            }
            (
                DecodeSpec::BlockList { nested, .. } | DecodeSpec::Block { nested, .. },
                DecodeSpec::BlockList { nested: more, .. } | DecodeSpec::Block { nested: more, .. },
            ) => nested.merge(*more),
            // An attribute and a block of the same name cannot both occur.
            _ => (),
        }
    }

    /// Traversals used by the parts of `body` this spec decodes.
    ///
    /// Attributes and blocks it does not mention are ignored, as are
    /// mentioned ones the body does not have.
    pub fn variables(&self, body: &Body) -> Vec<Traversal> {
        let mut out = vec![];
        self.collect_variables(body, &mut out);
        out
    }

    fn collect_variables(&self, body: &Body, out: &mut Vec<Traversal>) {
        match self {
            DecodeSpec::Attr { name, .. } => {
                if let Some(attr) = body.attr(name) {
                    out.extend(attr.expr.variables());
                }
            }
            DecodeSpec::Object(fields) => {
                for spec in fields.values() {
                    spec.collect_variables(body, out);
                }
            }
            DecodeSpec::Tuple(items) => {
                for spec in items {
                    spec.collect_variables(body, out);
                }
            }
            DecodeSpec::Block {
                type_name, nested, ..
            } => {
                if let Some(block) = body.blocks_of_type(type_name).next() {
                    nested.collect_variables(&block.body, out);
                }
            }
            DecodeSpec::BlockList {
                type_name, nested, ..
            } => {
                for block in body.blocks_of_type(type_name) {
                    nested.collect_variables(&block.body, out);
                }
            }
        }
    }
}
