// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::config::Module;
use crate::interpolater::{ContextMeta, Interpolater, Walk};
use crate::provider::{ResourceProvider, ResourceProviderResolver};
use crate::reference::ResourceMode;
use crate::schema::{ProviderSchema, ProviderSchemaRequest, Schemas};
use crate::state::{State, StateStore, VariableStore};
use crate::value::Value;
use crate::*;

use std::collections::BTreeMap;

use log::{trace, warn};

// Instance id given to providers started only to fetch schemas.
const SCHEMA_FETCH_UID: &str = "<schemafetch>";

/// Everything needed to set up a [`Context`].
pub struct ContextOpts {
    pub module: Module,
    pub state: State,
    // Values of the root module's input variables.
    pub variables: BTreeMap<String, Value>,
    pub provider_resolver: Box<dyn ResourceProviderResolver>,
    pub meta: ContextMeta,
}

/// A single planning or apply run over a configuration.
pub struct Context {
    module: Rc<Module>,
    state: Rc<StateStore>,
    variables: Rc<VariableStore>,
    provider_resolver: Box<dyn ResourceProviderResolver>,
    meta: ContextMeta,
    schemas_cache: Option<Rc<Schemas>>,
}

impl Context {
    pub fn new(opts: ContextOpts) -> Self {
        Self {
            module: Rc::new(opts.module),
            state: Rc::new(StateStore::new(opts.state)),
            variables: Rc::new(VariableStore::from_root(opts.variables)),
            provider_resolver: opts.provider_resolver,
            meta: opts.meta,
            schemas_cache: None,
        }
    }

    pub fn module(&self) -> &Rc<Module> {
        &self.module
    }

    pub fn state(&self) -> &Rc<StateStore> {
        &self.state
    }

    pub fn variables(&self) -> &Rc<VariableStore> {
        &self.variables
    }

    /// Schemas for everything the configuration uses.
    ///
    /// Providers are started and asked for schemas on the first call only.
    /// Later calls return the same repository. Taking `&mut self` keeps this
    /// from running concurrently with graph walks sharing the context.
    pub fn schemas(&mut self) -> Rc<Schemas> {
        if let Some(schemas) = &self.schemas_cache {
            return schemas.clone();
        }

        let schemas = Rc::new(build_schemas(&self.module, self.provider_resolver.as_ref()));
        self.schemas_cache = Some(schemas.clone());
        schemas
    }

    /// An interpolater for `operation` that sees this context's
    /// configuration, state, variables and schemas.
    pub fn interpolater(&mut self, operation: Walk) -> Interpolater {
        let schemas = self.schemas();
        Interpolater::new(
            operation,
            self.meta.clone(),
            self.module.clone(),
            self.state.clone(),
            self.variables.clone(),
        )
        .with_schemas(schemas)
    }
}

/// Providers, resource types and data sources used anywhere in the module
/// tree.
///
/// Names are taken as written, so the result may include providers or
/// types that do not exist.
pub fn find_needed_provider_schemas(module: &Module) -> BTreeMap<String, ProviderSchemaRequest> {
    let mut needed: BTreeMap<String, ProviderSchemaRequest> = BTreeMap::new();

    for m in module.descendants() {
        for provider in &m.providers {
            needed.entry(provider.name.clone()).or_default();
        }

        for resource in &m.resources {
            let full_name = resource.provider_full_name();
            let req = needed
                .entry(provider_schema_key(&full_name).to_string())
                .or_default();
            match resource.mode {
                ResourceMode::Managed => req.resource_types.insert(resource.type_name.clone()),
                ResourceMode::Data => req.data_sources.insert(resource.type_name.clone()),
            };
        }
    }

    needed
}

/// Start each provider the module tree needs and collect its schema.
///
/// A provider that cannot be started, predates schema support or fails to
/// report its schema keeps an empty entry. Later checks report the missing
/// schema where it matters. Every started provider is closed.
pub fn build_schemas(module: &Module, resolver: &dyn ResourceProviderResolver) -> Schemas {
    let mut providers = BTreeMap::new();

    for (name, req) in find_needed_provider_schemas(module) {
        providers.insert(name.clone(), Rc::new(fetch_schema(&name, &req, resolver)));
    }

    Schemas { providers }
}

fn fetch_schema(
    name: &str,
    req: &ProviderSchemaRequest,
    resolver: &dyn ResourceProviderResolver,
) -> ProviderSchema {
    trace!("fetching schema for provider {name:?}");
    let provider = match resolver.resource_provider(name, SCHEMA_FETCH_UID) {
        Ok(p) => p,
        Err(e) => {
            warn!("provider {name:?} failed to start up: {e}");
            return ProviderSchema::default();
        }
    };

    let schema = if !provider_supports_schema(provider.as_ref()) {
        warn!("provider {name:?} does not support schema");
        ProviderSchema::default()
    } else {
        match provider.get_schema(req) {
            Ok(schema) => {
                trace!("successfully fetched schema for provider {name:?}");
                schema
            }
            Err(e) => {
                warn!("failed to load schema for provider {name:?}: {e}");
                ProviderSchema::default()
            }
        }
    };

    trace!("closing provider {name:?} after schema fetch");
    provider.close();
    schema
}

/// Whether a provider can describe its types with schemas.
///
/// Providers advertise support on their first resource type, or on their
/// first data source when they have no resource types.
pub fn provider_supports_schema(provider: &dyn ResourceProvider) -> bool {
    if let Some(r) = provider.resources().first() {
        return r.schema_available;
    }
    if let Some(d) = provider.data_sources().first() {
        return d.schema_available;
    }
    false
}

/// Key of a provider in [`Schemas`]: its name without any alias.
/// All aliases of a provider share one schema.
pub fn provider_schema_key(name: &str) -> &str {
    match name.split_once('.') {
        Some((key, _)) => key,
        None => name,
    }
}
