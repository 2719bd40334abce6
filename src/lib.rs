// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

#[cfg(feature = "arc")]
pub(crate) use std::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub(crate) use std::rc::Rc;

mod ast;
mod classifier;
mod config;
mod context;
mod decoder;
mod diagnostics;
mod didyoumean;
mod eval;
mod graph;
mod interpolater;
mod lexer;
mod number;
mod parser;
mod provider;
mod reference;
mod schema;
mod state;
mod typing;
mod value;


pub use ast::{Expr, ExprRef, Ref, Traversal, Traverser};
pub use classifier::detect_references;
pub use config::{
    LocalConfig, Module, ModulePath, OutputConfig, ProviderConfig, ResourceConfig,
    VariableConfig,
};
pub use context::{
    build_schemas, find_needed_provider_schemas, provider_schema_key, provider_supports_schema,
    Context, ContextOpts,
};
pub use decoder::{Attribute, Block, Body, DecodeSpec};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use didyoumean::name_suggestion;
pub use eval::{BuiltinEvalContext, EvalContext, EvalError, EvalInterpolate};
pub use graph::{AttachSchema, AttachSchemaTransformer, Graph, GraphTransformer, Vertex};
pub use interpolater::{
    ContextMeta, Environment, InterpolationScope, Interpolater, ResourceContext, Walk,
};
pub use lexer::{Lexer, Pos, Source, SourceRange, Span, Token, TokenKind};
pub use number::Number;
pub use parser::Parser;
pub use provider::{
    DataSource, FixedResolver, ProviderError, ProviderFactory, ResourceProvider,
    ResourceProviderResolver, ResourceType,
};
pub use reference::{CountAttr, PathAttr, Reference, ReferenceKind, ResourceAddr, ResourceMode};
pub use schema::{
    AttributeSchema, BlockSchema, NestedBlock, NestingMode, ProviderSchema,
    ProviderSchemaRequest, Schemas,
};
pub use state::{InstanceState, ModuleState, ResourceState, State, StateReader, StateStore};
pub use state::{VariableStore, VariableValues};
pub use typing::Type;
pub use value::Value;
