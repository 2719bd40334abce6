// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::schema::{ProviderSchema, ProviderSchemaRequest};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider {0:?} is not available")]
    Unavailable(String),
    #[error("provider {name:?} failed to start: {reason}")]
    Startup { name: String, reason: String },
    #[error("provider {name:?} failed to report its schema: {reason}")]
    Schema { name: String, reason: String },
}

/// A resource type offered by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,
    // Whether the provider can describe this type with a schema.
    #[serde(default)]
    pub schema_available: bool,
}

/// A data source offered by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    #[serde(default)]
    pub schema_available: bool,
}

pub trait ResourceProvider {
    fn resources(&self) -> Vec<ResourceType>;

    fn data_sources(&self) -> Vec<DataSource>;

    fn get_schema(&self, req: &ProviderSchemaRequest) -> Result<ProviderSchema, ProviderError>;

    /// Release the provider. Called once it is no longer needed.
    fn close(&self) {}
}

/// Starts provider instances by name.
pub trait ResourceProviderResolver {
    fn resource_provider(
        &self,
        name: &str,
        uid: &str,
    ) -> Result<Box<dyn ResourceProvider>, ProviderError>;
}

pub type ProviderFactory =
    Box<dyn Fn() -> Result<Box<dyn ResourceProvider>, ProviderError> + Send + Sync>;

/// Resolver over a fixed set of provider factories.
#[derive(Default)]
pub struct FixedResolver {
    factories: BTreeMap<String, ProviderFactory>,
}

impl FixedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, factory: ProviderFactory) -> Self {
        self.factories.insert(name.to_string(), factory);
        self
    }
}

impl ResourceProviderResolver for FixedResolver {
    fn resource_provider(
        &self,
        name: &str,
        _uid: &str,
    ) -> Result<Box<dyn ResourceProvider>, ProviderError> {
        match self.factories.get(name) {
            Some(factory) => factory(),
            None => Err(ProviderError::Unavailable(name.to_string())),
        }
    }
}
