// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::config::{Module, ModulePath, ResourceConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::didyoumean::name_suggestion;
use crate::lexer::SourceRange;
use crate::reference::{Reference, ReferenceKind, ResourceAddr, ResourceMode};
use crate::schema::Schemas;
use crate::state::{InstanceState, ResourceState, StateReader, VariableValues};
use crate::typing::Type;
use crate::value::Value;
use crate::*;

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};

/// The kind of graph walk an interpolation happens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Walk {
    Validate,
    Plan,
    Apply,
    Refresh,
    Destroy,
}

/// Metadata about the run as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMeta {
    pub workspace: String,
}

impl Default for ContextMeta {
    fn default() -> Self {
        Self {
            workspace: "default".to_string(),
        }
    }
}

/// The resource instance whose configuration is being interpolated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceContext {
    #[serde(default)]
    pub count_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<ResourceAddr>,
    // Value of `self` supplied by the caller, e.g. for provisioners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_value: Option<Value>,
}

/// Where an expression is evaluated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterpolationScope {
    #[serde(default)]
    pub path: ModulePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceContext>,
}

/// Values for the top-level names an expression may use, keyed by
/// namespace.
pub type Environment = BTreeMap<String, Value>;

type Bucket = BTreeMap<Rc<str>, Value>;

/// Builds the values referenced by expressions from configuration, state,
/// input variables and schemas.
pub struct Interpolater {
    pub operation: Walk,
    pub meta: ContextMeta,
    pub module: Rc<Module>,
    pub state: Rc<dyn StateReader>,
    pub variables: Rc<dyn VariableValues>,
    pub schemas: Option<Rc<Schemas>>,
    working_dir: fn() -> io::Result<PathBuf>,
}

impl Interpolater {
    pub fn new(
        operation: Walk,
        meta: ContextMeta,
        module: Rc<Module>,
        state: Rc<dyn StateReader>,
        variables: Rc<dyn VariableValues>,
    ) -> Self {
        Self {
            operation,
            meta,
            module,
            state,
            variables,
            schemas: None,
            working_dir: std::env::current_dir,
        }
    }

    pub fn with_schemas(mut self, schemas: Rc<Schemas>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn with_working_dir(mut self, working_dir: fn() -> io::Result<PathBuf>) -> Self {
        self.working_dir = working_dir;
        self
    }

    /// Resolve each distinct reference once and assemble the environment.
    ///
    /// A namespace is present only when some reference needs it. Problems
    /// with individual references are reported as diagnostics and their
    /// values replaced with unknowns, so the pass always completes.
    pub fn values(
        &self,
        scope: &InterpolationScope,
        refs: &[Reference],
    ) -> (Environment, Diagnostics) {
        debug!("resolving {} references in {}", refs.len(), scope.path);

        let mut diags = Diagnostics::new();
        let mut result = Environment::new();

        let mut variables = Bucket::new();
        let mut locals = Bucket::new();
        let mut modules = Bucket::new();
        let mut data_resources: BTreeMap<String, Bucket> = BTreeMap::new();
        let mut managed_resources: BTreeMap<String, Bucket> = BTreeMap::new();

        for r in refs {
            match &r.kind {
                ReferenceKind::Count(_) => {
                    if !result.contains_key("count") {
                        let (v, d) = self.count_value(r, scope);
                        result.insert("count".to_string(), v);
                        diags.append(d);
                    }
                }
                ReferenceKind::Path(_) => {
                    if !result.contains_key("path") {
                        let (v, d) = self.path_value(r, scope);
                        result.insert("path".to_string(), v);
                        diags.append(d);
                    }
                }
                ReferenceKind::SelfRef => {
                    if !result.contains_key("self") {
                        let (v, d) = self.self_value(r, scope);
                        result.insert("self".to_string(), v);
                        diags.append(d);
                    }
                }
                ReferenceKind::Terraform { .. } => {
                    if !result.contains_key("terraform") {
                        result.insert("terraform".to_string(), self.terraform_value());
                    }
                }
                ReferenceKind::UserVariable { name } => {
                    if !variables.contains_key(name.as_str()) {
                        let (v, d) = self.user_var_value(name, &r.range, scope);
                        variables.insert(name.as_str().into(), v);
                        diags.append(d);
                    }
                }
                ReferenceKind::Local { name } => {
                    if !locals.contains_key(name.as_str()) {
                        let (v, d) = self.local_value(name, &r.range, scope);
                        locals.insert(name.as_str().into(), v);
                        diags.append(d);
                    }
                }
                ReferenceKind::Module { name } => {
                    if !modules.contains_key(name.as_str()) {
                        let (v, d) = self.module_value(name, &r.range, scope);
                        modules.insert(name.as_str().into(), v);
                        diags.append(d);
                    }
                }
                ReferenceKind::Resource {
                    mode,
                    type_name,
                    name,
                } => {
                    let by_type = match mode {
                        ResourceMode::Data => &mut data_resources,
                        ResourceMode::Managed => &mut managed_resources,
                    };
                    let bucket = by_type.entry(type_name.clone()).or_default();
                    if !bucket.contains_key(name.as_str()) {
                        let addr = ResourceAddr::new(*mode, type_name, name);
                        let (v, d) = self.resource_value(&addr, &r.range, scope);
                        bucket.insert(name.as_str().into(), v);
                        diags.append(d);
                    }
                }
            }
        }

        if !variables.is_empty() {
            result.insert("var".to_string(), Value::from(variables));
        }
        if !locals.is_empty() {
            result.insert("local".to_string(), Value::from(locals));
        }
        if !modules.is_empty() {
            result.insert("module".to_string(), Value::from(modules));
        }
        if !data_resources.is_empty() {
            // Data resources are nested one level deeper, by type.
            let by_type: Bucket = data_resources
                .into_iter()
                .map(|(type_name, resources)| (type_name.as_str().into(), Value::from(resources)))
                .collect();
            result.insert("data".to_string(), Value::from(by_type));
        }
        for (type_name, resources) in managed_resources {
            result.insert(type_name, Value::from(resources));
        }

        (result, diags)
    }

    fn current_module(
        &self,
        scope: &InterpolationScope,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Option<&Module> {
        let module = self.module.child(&scope.path);
        if module.is_none() {
            diags.push(Diagnostic::bug(
                "Unable to find current module",
                format!("The module {} is not present in the configuration.", scope.path),
                Some(range.clone()),
            ));
        }
        module
    }

    fn count_value(&self, r: &Reference, scope: &InterpolationScope) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let index = match &scope.resource {
            Some(rc) => Value::from(rc.count_index),
            None => {
                diags.push(Diagnostic::error(
                    DiagnosticKind::Resolution,
                    "Invalid use of \"count\"",
                    "Attributes of \"count\" can be used only within a \"resource\" or \"data\" block."
                        .to_string(),
                    Some(r.range.clone()),
                ));
                Value::Unknown(Type::Number)
            }
        };

        (object([("index", index)]), diags)
    }

    fn path_value(&self, r: &Reference, scope: &InterpolationScope) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();

        let cwd = match (self.working_dir)() {
            Ok(dir) => dir.to_string_lossy().to_string(),
            Err(e) => {
                diags.push(Diagnostic::error(
                    DiagnosticKind::Environment,
                    "Unable to get current working directory",
                    format!("Failed to determine working directory for path.cwd: {e}."),
                    Some(r.range.clone()),
                ));
                String::new()
            }
        };

        let module_dir = match self.module.child(&scope.path) {
            Some(m) => m.dir.clone(),
            None => {
                diags.push(Diagnostic::bug(
                    "Unable to get path for current module",
                    "The path for the current module is not available.".to_string(),
                    Some(r.range.clone()),
                ));
                String::new()
            }
        };

        let value = object([
            ("cwd", Value::from(cwd)),
            ("module", Value::from(module_dir)),
            ("root", Value::from(self.module.dir.as_str())),
        ]);
        (value, diags)
    }

    fn self_value(&self, r: &Reference, scope: &InterpolationScope) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();

        let resource = match &scope.resource {
            Some(rc) => rc,
            None => {
                diags.push(Self::invalid_self(&r.range));
                return (Value::dynamic(), diags);
            }
        };

        if let Some(v) = &resource.self_value {
            return (v.clone(), diags);
        }

        let Some(addr) = &resource.addr else {
            diags.push(Self::invalid_self(&r.range));
            return (Value::dynamic(), diags);
        };

        let Some((_, ty)) = self.resource_type(addr, &r.range, scope, &mut diags) else {
            return (Value::dynamic(), diags);
        };

        if self.operation == Walk::Validate {
            return (Value::Unknown(ty), diags);
        }

        let state = self.state.resource_instances(&scope.path, addr);
        let v = match state.instances.get(&resource.count_index) {
            Some(instance) => self.instance_value(instance, addr, &ty, &r.range, &mut diags),
            None => Value::Unknown(ty),
        };
        (v, diags)
    }

    fn invalid_self(range: &SourceRange) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::Resolution,
            "Invalid \"self\" reference",
            "The \"self\" object can be used only within a resource block.".to_string(),
            Some(range.clone()),
        )
    }

    fn terraform_value(&self) -> Value {
        object([("workspace", Value::from(self.meta.workspace.as_str()))])
    }

    fn user_var_value(
        &self,
        name: &str,
        range: &SourceRange,
        scope: &InterpolationScope,
    ) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let Some(module) = self.current_module(scope, range, &mut diags) else {
            return (Value::dynamic(), diags);
        };

        let Some(config) = module.variable(name) else {
            let suggestion = suggest(name, module.variables.iter().map(|v| v.name.as_str()));
            diags.push(Diagnostic::error(
                DiagnosticKind::Resolution,
                "Reference to undefined variable",
                format!("This module declares no variable named {name:?}.{suggestion}"),
                Some(range.clone()),
            ));
            return (Value::dynamic(), diags);
        };

        // Variables are typed by the values given for them, which are not
        // known while validating.
        if self.operation == Walk::Validate {
            return (Value::dynamic(), diags);
        }

        if let Some(v) = self.variables.value(&scope.path, name) {
            return (v, diags);
        }

        match &config.default {
            Some(v) => (v.clone(), diags),
            None => (Value::dynamic(), diags),
        }
    }

    fn local_value(
        &self,
        name: &str,
        range: &SourceRange,
        scope: &InterpolationScope,
    ) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let Some(module) = self.current_module(scope, range, &mut diags) else {
            return (Value::dynamic(), diags);
        };

        if module.local(name).is_none() {
            let suggestion = suggest(name, module.locals.iter().map(|l| l.name.as_str()));
            diags.push(Diagnostic::error(
                DiagnosticKind::Resolution,
                "Reference to undefined local value",
                format!("This module defines no local value named {name:?}.{suggestion}"),
                Some(range.clone()),
            ));
            return (Value::dynamic(), diags);
        }

        // Not computed yet.
        match self.state.local_value(&scope.path, name) {
            Some(v) => (v, diags),
            None => (Value::dynamic(), diags),
        }
    }

    fn module_value(
        &self,
        name: &str,
        range: &SourceRange,
        scope: &InterpolationScope,
    ) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let Some(module) = self.current_module(scope, range, &mut diags) else {
            return (Value::dynamic(), diags);
        };

        let Some(child) = module.children.get(name) else {
            let suggestion = suggest(name, module.children.keys().map(String::as_str));
            diags.push(Diagnostic::error(
                DiagnosticKind::Resolution,
                "Reference to undeclared module",
                format!(
                    "No module call named {name:?} is declared in {}.{suggestion}",
                    describe_module(&scope.path)
                ),
                Some(range.clone()),
            ));
            return (Value::dynamic(), diags);
        };

        let child_path = scope.path.child(name);
        let mut outputs = Bucket::new();
        for output in &child.outputs {
            let v = match self.operation {
                Walk::Validate => Value::dynamic(),
                _ => self
                    .state
                    .output_value(&child_path, &output.name)
                    .unwrap_or_else(Value::dynamic),
            };
            outputs.insert(output.name.as_str().into(), v);
        }
        (Value::from(outputs), diags)
    }

    fn resource_value(
        &self,
        addr: &ResourceAddr,
        range: &SourceRange,
        scope: &InterpolationScope,
    ) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let Some((config, ty)) = self.resource_type(addr, range, scope, &mut diags) else {
            return (Value::dynamic(), diags);
        };

        if self.operation == Walk::Validate {
            let ty = match config.count {
                Some(_) => Type::list(ty),
                None => ty,
            };
            return (Value::Unknown(ty), diags);
        }

        let mut state = self.state.resource_instances(&scope.path, addr);
        let value = match config.count {
            None => match state.instances.remove(&0) {
                Some(instance) => self.instance_value(&instance, addr, &ty, range, &mut diags),
                None => Value::Unknown(ty),
            },
            Some(count) => self.counted_value(count, state, addr, &ty, range, &mut diags),
        };
        (value, diags)
    }

    // The list value of a counted resource: one element per index below
    // `count`. Only instances present in state are conformed. The remaining
    // indexes share a single unknown, so their cost is one reference count
    // each. State instances at or past `count` are ignored.
    fn counted_value(
        &self,
        count: u64,
        state: ResourceState,
        addr: &ResourceAddr,
        ty: &Type,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        let missing = Value::Unknown(ty.clone());
        let mut present = state.instances.range(..count).peekable();
        let mut items = Vec::new();
        for idx in 0..count {
            match present.next_if(|(i, _)| **i == idx) {
                Some((_, instance)) => {
                    items.push(self.instance_value(instance, addr, ty, range, diags))
                }
                None => items.push(missing.clone()),
            }
        }
        Value::from(items)
    }

    // Configuration and object type of a declared resource. Reports why
    // when either is unavailable.
    fn resource_type(
        &self,
        addr: &ResourceAddr,
        range: &SourceRange,
        scope: &InterpolationScope,
        diags: &mut Diagnostics,
    ) -> Option<(&ResourceConfig, Type)> {
        let module = self.current_module(scope, range, diags)?;

        let Some(config) = module.resource(addr) else {
            let candidates = module
                .resources
                .iter()
                .filter(|r| r.mode == addr.mode && r.type_name == addr.type_name)
                .map(|r| r.name.as_str());
            let suggestion = suggest(&addr.name, candidates);
            let what = match addr.mode {
                ResourceMode::Managed => "managed resource",
                ResourceMode::Data => "data resource",
            };
            diags.push(Diagnostic::error(
                DiagnosticKind::Resolution,
                "Reference to undeclared resource",
                format!(
                    "A {what} {:?} {:?} has not been declared in {}.{suggestion}",
                    addr.type_name,
                    addr.name,
                    describe_module(&scope.path)
                ),
                Some(range.clone()),
            ));
            return None;
        };

        let schema = self.schemas.as_ref().and_then(|s| {
            s.resource_type(&config.provider_full_name(), addr.mode, &addr.type_name)
        });
        let Some(schema) = schema else {
            diags.push(Diagnostic::warning(
                DiagnosticKind::Unsupported,
                "Resource type schema unavailable",
                format!(
                    "No schema is available for {:?}, so the value of {addr} is not yet known.",
                    addr.type_name
                ),
                Some(range.clone()),
            ));
            return None;
        };

        Some((config, schema.implied_type()))
    }

    // One instance read from state and conformed to `ty`. Attributes that do
    // not conform are reported and left unknown.
    fn instance_value(
        &self,
        instance: &InstanceState,
        addr: &ResourceAddr,
        ty: &Type,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        let Type::Object { fields } = ty else {
            return Value::Unknown(ty.clone());
        };

        let mut attrs = Bucket::new();
        for (name, field_ty) in fields.iter() {
            let v = match instance.attributes.get(name) {
                Some(v) => match field_ty.conform(v) {
                    Ok(v) => v,
                    Err(e) => {
                        diags.push(Diagnostic::error(
                            DiagnosticKind::Resolution,
                            "Incorrect attribute value type",
                            format!("Attribute {name:?} of {addr} in state is invalid: {e}."),
                            Some(range.clone()),
                        ));
                        Value::Unknown(field_ty.clone())
                    }
                },
                None => Value::Null,
            };
            attrs.insert(name.as_str().into(), v);
        }
        Value::from(attrs)
    }
}

fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    let map: Bucket = fields.into_iter().map(|(k, v)| (Rc::from(k), v)).collect();
    Value::from(map)
}

fn suggest<'a, I: IntoIterator<Item = &'a str>>(given: &str, candidates: I) -> String {
    match name_suggestion(given, candidates) {
        Some(s) => format!(" Did you mean {s:?}?"),
        None => String::new(),
    }
}

fn describe_module(path: &ModulePath) -> String {
    if path.is_root() {
        "the root module".to_string()
    } else {
        path.to_string()
    }
}
