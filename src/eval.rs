// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::classifier::detect_references;
use crate::config::ResourceConfig;
use crate::decoder::{Body, DecodeSpec};
use crate::diagnostics::Diagnostics;
use crate::graph::{AttachSchema, Vertex};
use crate::interpolater::{Environment, InterpolationScope, Interpolater};
use crate::schema::Schemas;
use crate::*;

use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{0}")]
    Diagnostics(Diagnostics),
    // Stop evaluating this node without reporting an error.
    #[error("early exit")]
    EarlyExit,
}

/// What evaluation nodes can ask of the run they are part of.
pub trait EvalContext {
    /// The environment needed to evaluate the parts of `body` selected by
    /// `spec`.
    fn interpolate(
        &self,
        body: &Body,
        spec: &DecodeSpec,
        scope: &InterpolationScope,
    ) -> (Environment, Diagnostics);
}

pub struct BuiltinEvalContext {
    pub interpolater: Interpolater,
}

impl BuiltinEvalContext {
    pub fn new(interpolater: Interpolater) -> Self {
        Self { interpolater }
    }
}

impl EvalContext for BuiltinEvalContext {
    fn interpolate(
        &self,
        body: &Body,
        spec: &DecodeSpec,
        scope: &InterpolationScope,
    ) -> (Environment, Diagnostics) {
        let (refs, mut diags) = detect_references(body, spec);
        let (env, value_diags) = self.interpolater.values(scope, &refs);
        diags.append(value_diags);
        (env, diags)
    }
}

/// Interpolates a configuration body and stores the resulting environment.
pub struct EvalInterpolate {
    pub body: Body,
    // Decode spec. Derived from the resource schema once attached; without
    // one the whole body is analysed.
    pub spec: Option<DecodeSpec>,
    pub scope: InterpolationScope,
    pub resource: Option<ResourceConfig>,
    pub continue_on_err: bool,
    pub output: Option<Environment>,
}

impl EvalInterpolate {
    pub fn new(body: Body, scope: InterpolationScope) -> Self {
        Self {
            body,
            spec: None,
            scope,
            resource: None,
            continue_on_err: false,
            output: None,
        }
    }

    /// Run the node. On success the environment is stored in `output` and
    /// any warnings are returned.
    pub fn eval(&mut self, ctx: &dyn EvalContext) -> Result<Diagnostics, EvalError> {
        let spec = match &self.spec {
            Some(spec) => spec.clone(),
            None => DecodeSpec::from_body(&self.body),
        };

        let (env, diags) = ctx.interpolate(&self.body, &spec, &self.scope);
        if diags.has_errors() {
            debug!("{} failed with {} diagnostics", self.name(), diags.len());
            if self.continue_on_err {
                return Err(EvalError::EarlyExit);
            }
            return Err(EvalError::Diagnostics(diags));
        }

        self.output = Some(env);
        Ok(diags)
    }
}

impl AttachSchema for EvalInterpolate {
    fn attach_schema(&mut self, schemas: Rc<Schemas>) {
        let Some(resource) = &self.resource else {
            return;
        };
        let schema = schemas.resource_type(
            &resource.provider_full_name(),
            resource.mode,
            &resource.type_name,
        );
        if let Some(schema) = schema {
            self.spec = Some(schema.decoder_spec());
        }
    }
}

impl Vertex for EvalInterpolate {
    fn name(&self) -> String {
        match &self.resource {
            Some(r) => format!("EvalInterpolate({})", r.addr()),
            None => "EvalInterpolate".to_string(),
        }
    }

    fn as_attach_schema(&mut self) -> Option<&mut dyn AttachSchema> {
        Some(self)
    }
}
