// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::config::ModulePath;
use crate::reference::ResourceAddr;
use crate::value::Value;

use std::collections::BTreeMap;

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

/// Known instances of a resource, keyed by count index. A resource without
/// `count` has the single instance 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(default)]
    pub instances: BTreeMap<u64, InstanceState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    #[serde(default)]
    pub path: ModulePath,
    #[serde(default)]
    pub locals: BTreeMap<String, Value>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
    // Keyed by resource address, e.g. `aws_instance.web` or `data.aws_ami.base`.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

/// Snapshot of the values known so far in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub modules: Vec<ModuleState>,
}

impl State {
    pub fn from_json_str(json: &str) -> Result<State> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<State> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn module(&self, path: &ModulePath) -> Option<&ModuleState> {
        self.modules.iter().find(|m| &m.path == path)
    }

    /// The state of the module at `path`, created empty when absent.
    pub fn module_mut(&mut self, path: &ModulePath) -> &mut ModuleState {
        let idx = match self.modules.iter().position(|m| &m.path == path) {
            Some(idx) => idx,
            None => {
                self.modules.push(ModuleState {
                    path: path.clone(),
                    ..Default::default()
                });
                self.modules.len() - 1
            }
        };
        &mut self.modules[idx]
    }
}

/// Read access to the state that is shared with concurrently running nodes.
pub trait StateReader: Send + Sync {
    fn local_value(&self, path: &ModulePath, name: &str) -> Option<Value>;

    fn output_value(&self, path: &ModulePath, name: &str) -> Option<Value>;

    /// Instances of a resource recorded so far, keyed by count index.
    fn resource_instances(&self, path: &ModulePath, addr: &ResourceAddr) -> ResourceState;
}

/// State guarded by a reader-writer lock. Each read holds the lock only for
/// the duration of a single lookup.
#[derive(Debug, Default)]
pub struct StateStore {
    state: RwLock<State>,
}

impl StateStore {
    pub fn new(state: State) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn snapshot(&self) -> State {
        self.state.read().clone()
    }

    pub fn update<F: FnOnce(&mut State)>(&self, f: F) {
        f(&mut self.state.write())
    }
}

impl StateReader for StateStore {
    fn local_value(&self, path: &ModulePath, name: &str) -> Option<Value> {
        let state = self.state.read();
        state.module(path)?.locals.get(name).cloned()
    }

    fn output_value(&self, path: &ModulePath, name: &str) -> Option<Value> {
        let state = self.state.read();
        state.module(path)?.outputs.get(name).cloned()
    }

    fn resource_instances(&self, path: &ModulePath, addr: &ResourceAddr) -> ResourceState {
        let state = self.state.read();
        state
            .module(path)
            .and_then(|m| m.resources.get(&addr.key()))
            .cloned()
            .unwrap_or_default()
    }
}

/// Values supplied for input variables.
pub trait VariableValues: Send + Sync {
    fn value(&self, path: &ModulePath, name: &str) -> Option<Value>;
}

#[derive(Debug, Default)]
pub struct VariableStore {
    values: RwLock<BTreeMap<ModulePath, BTreeMap<String, Value>>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding values for variables of the root module.
    pub fn from_root(values: BTreeMap<String, Value>) -> Self {
        let mut modules = BTreeMap::new();
        modules.insert(ModulePath::root(), values);
        Self {
            values: RwLock::new(modules),
        }
    }

    pub fn set(&self, path: &ModulePath, name: &str, value: Value) {
        self.values
            .write()
            .entry(path.clone())
            .or_default()
            .insert(name.to_string(), value);
    }
}

impl VariableValues for VariableStore {
    fn value(&self, path: &ModulePath, name: &str) -> Option<Value> {
        self.values.read().get(path)?.get(name).cloned()
    }
}
