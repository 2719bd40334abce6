// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::provider_schema_key;
use crate::decoder::DecodeSpec;
use crate::reference::ResourceMode;
use crate::typing::Type;
use crate::*;

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub computed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    Single,
    List,
    Set,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedBlock {
    pub block: BlockSchema,
    pub nesting: NestingMode,
    #[serde(default)]
    pub min_items: u64,
    #[serde(default)]
    pub max_items: u64,
}

/// Schema of a configuration block: its attributes and nested block types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSchema {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSchema>,
    #[serde(default)]
    pub block_types: BTreeMap<String, NestedBlock>,
}

impl BlockSchema {
    /// The object type of a value conforming to this schema.
    pub fn implied_type(&self) -> Type {
        let mut fields = BTreeMap::new();
        for (name, attr) in &self.attributes {
            fields.insert(name.clone(), attr.ty.clone());
        }
        for (name, nested) in &self.block_types {
            let block_ty = nested.block.implied_type();
            let ty = match nested.nesting {
                NestingMode::Single => block_ty,
                NestingMode::List => Type::list(block_ty),
                NestingMode::Set => Type::Set {
                    item_type: Box::new(block_ty),
                },
                NestingMode::Map => Type::Map {
                    item_type: Box::new(block_ty),
                },
            };
            fields.insert(name.clone(), ty);
        }
        Type::object(fields)
    }

    /// Decode spec selecting every attribute and nested block of the schema.
    pub fn decoder_spec(&self) -> DecodeSpec {
        let mut fields = IndexMap::new();
        for name in self.attributes.keys() {
            fields.insert(name.clone(), DecodeSpec::attr(name));
        }
        for (name, nested) in &self.block_types {
            let inner = Box::new(nested.block.decoder_spec());
            let spec = match nested.nesting {
                NestingMode::Single => DecodeSpec::Block {
                    type_name: name.clone(),
                    nested: inner,
                },
                NestingMode::List | NestingMode::Set | NestingMode::Map => DecodeSpec::BlockList {
                    type_name: name.clone(),
                    nested: inner,
                },
            };
            fields.insert(name.clone(), spec);
        }
        DecodeSpec::Object(fields)
    }
}

/// Schemas reported by one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<BlockSchema>,
    #[serde(default)]
    pub resource_types: BTreeMap<String, BlockSchema>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, BlockSchema>,
}

/// The resource types and data sources a provider is asked to describe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSchemaRequest {
    pub resource_types: BTreeSet<String>,
    pub data_sources: BTreeSet<String>,
}

/// Schemas of every provider used by a configuration, keyed by provider
/// name without alias.
///
/// A provider that failed to report its schema has an empty entry. A
/// provider missing entirely was never needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schemas {
    pub providers: BTreeMap<String, Rc<ProviderSchema>>,
}

impl Schemas {
    /// Schema of a provider, given its name with or without an alias.
    pub fn provider(&self, name: &str) -> Option<&ProviderSchema> {
        self.providers
            .get(provider_schema_key(name))
            .map(|p| p.as_ref())
    }

    pub fn resource_type(
        &self,
        provider: &str,
        mode: ResourceMode,
        type_name: &str,
    ) -> Option<&BlockSchema> {
        let p = self.provider(provider)?;
        match mode {
            ResourceMode::Managed => p.resource_types.get(type_name),
            ResourceMode::Data => p.data_sources.get(type_name),
        }
    }
}
