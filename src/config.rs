// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::reference::{ResourceAddr, ResourceMode};
use crate::value::Value;

use core::fmt;
use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Names of child modules leading from the root module to a module.
///
/// The root module itself has the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    pub fn root() -> Self {
        Self(vec![])
    }

    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut names = self.0.clone();
        names.push(name.to_string());
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (idx, name) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "module.{name}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub name: String,
}

fn managed() -> ResourceMode {
    ResourceMode::Managed
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default = "managed")]
    pub mode: ResourceMode,
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    // Explicit provider, possibly with an alias such as `aws.west`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl ResourceConfig {
    pub fn addr(&self) -> ResourceAddr {
        ResourceAddr::new(self.mode, &self.type_name, &self.name)
    }

    /// Provider that manages the resource, with its alias if one is set.
    ///
    /// Without an explicit provider this is the prefix of the type name up
    /// to the first underscore.
    pub fn provider_full_name(&self) -> String {
        if let Some(p) = &self.provider {
            return p.clone();
        }
        match self.type_name.split_once('_') {
            Some((prefix, _)) => prefix.to_string(),
            None => self.type_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ProviderConfig {
    pub fn full_name(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{}.{alias}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A module's configuration along with its descendants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    // Directory the module was loaded from.
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
    #[serde(default)]
    pub locals: Vec<LocalConfig>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub children: BTreeMap<String, Module>,
}

impl Module {
    pub fn from_json_str(json: &str) -> Result<Module> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Module> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// The descendant at `path`, relative to this module.
    pub fn child(&self, path: &ModulePath) -> Option<&Module> {
        let mut module = self;
        for name in path.names() {
            module = module.children.get(name)?;
        }
        Some(module)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableConfig> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn local(&self, name: &str) -> Option<&LocalConfig> {
        self.locals.iter().find(|l| l.name == name)
    }

    pub fn resource(&self, addr: &ResourceAddr) -> Option<&ResourceConfig> {
        self.resources
            .iter()
            .find(|r| r.mode == addr.mode && r.type_name == addr.type_name && r.name == addr.name)
    }

    /// This module followed by all of its descendants, depth first.
    pub fn descendants(&self) -> Vec<&Module> {
        let mut out = vec![self];
        for child in self.children.values() {
            out.extend(child.descendants());
        }
        out
    }
}
