// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::SourceRange;

use core::cmp;
use core::fmt;
use core::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountAttr {
    Index,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathAttr {
    Cwd,
    Module,
    Root,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    Managed,
    Data,
}

/// What a reference names. Each variant owns one namespace of the scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    Count(CountAttr),
    Path(PathAttr),
    SelfRef,
    Terraform {
        field: String,
    },
    UserVariable {
        name: String,
    },
    Local {
        name: String,
    },
    Module {
        name: String,
    },
    Resource {
        mode: ResourceMode,
        type_name: String,
        name: String,
    },
}

impl ReferenceKind {
    /// Name under which values for this kind are placed in an environment.
    pub fn namespace(&self) -> &str {
        match self {
            ReferenceKind::Count(_) => "count",
            ReferenceKind::Path(_) => "path",
            ReferenceKind::SelfRef => "self",
            ReferenceKind::Terraform { .. } => "terraform",
            ReferenceKind::UserVariable { .. } => "var",
            ReferenceKind::Local { .. } => "local",
            ReferenceKind::Module { .. } => "module",
            ReferenceKind::Resource {
                mode: ResourceMode::Data,
                ..
            } => "data",
            ReferenceKind::Resource { type_name, .. } => type_name,
        }
    }
}

/// A classified reference to a named object in scope.
///
/// Two references are equal when they have the same kind and key, wherever
/// they appear in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub key: String,
    pub range: SourceRange,
}

impl Reference {
    pub fn new(kind: ReferenceKind, range: SourceRange) -> Self {
        let key = match &kind {
            ReferenceKind::Count(attr) => format!("count.{}", Self::count_attr_name(attr)),
            ReferenceKind::Path(attr) => format!("path.{}", Self::path_attr_name(attr)),
            ReferenceKind::SelfRef => "self".to_string(),
            ReferenceKind::Terraform { field } => format!("terraform.{field}"),
            ReferenceKind::UserVariable { name } => format!("var.{name}"),
            ReferenceKind::Local { name } => format!("local.{name}"),
            ReferenceKind::Module { name } => format!("module.{name}"),
            ReferenceKind::Resource {
                mode,
                type_name,
                name,
            } => ResourceAddr::new(*mode, type_name, name).key(),
        };
        Self { kind, key, range }
    }

    // Invalid selectors keep their key from the written attribute instead.
    pub(crate) fn with_key(kind: ReferenceKind, key: String, range: SourceRange) -> Self {
        Self { kind, key, range }
    }

    fn count_attr_name(attr: &CountAttr) -> &'static str {
        match attr {
            CountAttr::Index => "index",
            CountAttr::Invalid => "invalid",
        }
    }

    fn path_attr_name(attr: &PathAttr) -> &'static str {
        match attr {
            PathAttr::Cwd => "cwd",
            PathAttr::Module => "module",
            PathAttr::Root => "root",
            PathAttr::Invalid => "invalid",
        }
    }

    pub fn namespace(&self) -> &str {
        self.kind.namespace()
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.key == other.key
    }
}

impl Eq for Reference {}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reference {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        (&self.kind, &self.key).cmp(&(&other.kind, &other.key))
    }
}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Address of a resource within a module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceAddr {
    pub mode: ResourceMode,
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

impl ResourceAddr {
    pub fn new(mode: ResourceMode, type_name: &str, name: &str) -> Self {
        Self {
            mode,
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    /// `type.name` for managed resources and `data.type.name` for data
    /// sources.
    pub fn key(&self) -> String {
        match self.mode {
            ResourceMode::Managed => format!("{}.{}", self.type_name, self.name),
            ResourceMode::Data => format!("data.{}.{}", self.type_name, self.name),
        }
    }
}

impl fmt::Display for ResourceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
