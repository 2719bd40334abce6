// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Traversal, Traverser};
use crate::decoder::{Body, DecodeSpec};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::lexer::SourceRange;
use crate::reference::*;

use std::collections::BTreeMap;

use lazy_static::lazy_static;

lazy_static! {
    static ref COUNT_ATTRS: BTreeMap<&'static str, CountAttr> =
        [("index", CountAttr::Index)].into_iter().collect();
    static ref PATH_ATTRS: BTreeMap<&'static str, PathAttr> = [
        ("cwd", PathAttr::Cwd),
        ("module", PathAttr::Module),
        ("root", PathAttr::Root),
    ]
    .into_iter()
    .collect();
}

/// Classify every reference used by the parts of `body` that `spec` decodes.
///
/// References are returned in source order. Duplicates are kept. Diagnostics
/// from all traversals are accumulated; a traversal that cannot be
/// classified contributes only diagnostics.
pub fn detect_references(body: &Body, spec: &DecodeSpec) -> (Vec<Reference>, Diagnostics) {
    let mut refs = vec![];
    let mut diags = Diagnostics::new();

    for traversal in spec.variables(body) {
        if traversal.is_empty() {
            continue;
        }

        let (r, d) = Reference::from_traversal(&traversal);
        diags.append(d);
        if let Some(r) = r {
            refs.push(r);
        }
    }

    log::trace!("detected {} references", refs.len());
    (refs, diags)
}

fn missing_attr(ns: &str, detail: &str, range: &SourceRange) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::Grammar,
        &format!("Missing \"{ns}\" attribute"),
        format!("The name \"{ns}\" does not have a direct value; access an attribute of this object, {detail}."),
        Some(range.clone()),
    )
}

fn invalid_attr(ns: &str, detail: String, range: &SourceRange) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::Grammar,
        &format!("Invalid \"{ns}\" attribute"),
        detail,
        Some(range.clone()),
    )
}

impl Reference {
    /// Classify a single traversal.
    ///
    /// Only the root name and the attribute steps directly following it are
    /// considered. The first index step ends the path; it is applied later
    /// to the value placed in scope.
    pub fn from_traversal(traversal: &Traversal) -> (Option<Reference>, Diagnostics) {
        let mut diags = Diagnostics::new();

        let (root, root_span) = match traversal.steps.first() {
            Some(Traverser::Root { name, span }) => (name.as_str(), span),
            Some(step) => {
                diags.push(Diagnostic::bug(
                    "Invalid reference",
                    "A reference must begin with a name in scope.".to_string(),
                    Some(step.span().range()),
                ));
                return (None, diags);
            }
            None => return (None, diags),
        };

        let mut names = vec![root];
        let mut end_span = root_span;
        for step in &traversal.steps[1..] {
            match step {
                Traverser::Attr { name, span } => {
                    names.push(name.as_str());
                    end_span = span;
                }
                _ => break,
            }
        }

        // The range covers every name collected, even when only a prefix of
        // them identifies the referenced object.
        let rng = root_span.join(end_span).range();

        match root {
            "count" => Self::count(&names, rng, diags),
            "path" => Self::path(&names, rng, diags),
            "self" => (Some(Reference::new(ReferenceKind::SelfRef, rng)), diags),
            "terraform" => Self::terraform(&names, rng, diags),
            "var" => Self::named(&names, rng, diags),
            "local" => Self::named(&names, rng, diags),
            "module" => Self::named(&names, rng, diags),
            _ => Self::resource(&names, rng, diags),
        }
    }

    fn count(
        names: &[&str],
        rng: SourceRange,
        mut diags: Diagnostics,
    ) -> (Option<Reference>, Diagnostics) {
        // Extra names are fine; they fail later when applied to the number.
        let Some(attr_name) = names.get(1) else {
            diags.push(missing_attr("count", "such as count.index", &rng));
            return (None, diags);
        };

        let attr = match COUNT_ATTRS.get(*attr_name) {
            Some(attr) => *attr,
            None => {
                diags.push(invalid_attr(
                    "count",
                    format!("The name \"count\" does not have an attribute named {attr_name:?}. The only available attribute is \"index\"."),
                    &rng,
                ));
                CountAttr::Invalid
            }
        };

        let key = format!("count.{attr_name}");
        (
            Some(Reference::with_key(ReferenceKind::Count(attr), key, rng)),
            diags,
        )
    }

    fn path(
        names: &[&str],
        rng: SourceRange,
        mut diags: Diagnostics,
    ) -> (Option<Reference>, Diagnostics) {
        let Some(attr_name) = names.get(1) else {
            diags.push(missing_attr("path", "such as path.module", &rng));
            return (None, diags);
        };

        let attr = match PATH_ATTRS.get(*attr_name) {
            Some(attr) => *attr,
            None => {
                diags.push(invalid_attr(
                    "path",
                    format!("The name \"path\" does not have an attribute named {attr_name:?}."),
                    &rng,
                ));
                PathAttr::Invalid
            }
        };

        let key = format!("path.{attr_name}");
        (
            Some(Reference::with_key(ReferenceKind::Path(attr), key, rng)),
            diags,
        )
    }

    fn terraform(
        names: &[&str],
        rng: SourceRange,
        mut diags: Diagnostics,
    ) -> (Option<Reference>, Diagnostics) {
        let Some(field) = names.get(1) else {
            diags.push(missing_attr("terraform", "such as terraform.workspace", &rng));
            return (None, diags);
        };

        if *field != "workspace" {
            diags.push(invalid_attr(
                "terraform",
                format!("The name \"terraform\" does not have an attribute named {field:?}. The only available attribute is \"workspace\"."),
                &rng,
            ));
        }

        let kind = ReferenceKind::Terraform {
            field: field.to_string(),
        };
        (Some(Reference::new(kind, rng)), diags)
    }

    // var, local and module: the second name is the object's name.
    fn named(
        names: &[&str],
        rng: SourceRange,
        mut diags: Diagnostics,
    ) -> (Option<Reference>, Diagnostics) {
        let ns = names[0];
        let Some(name) = names.get(1) else {
            let detail = match ns {
                "var" => "named after one of the variables in this module",
                "local" => "named after one of the local values in this module",
                _ => "named after one of the child modules of this module",
            };
            diags.push(missing_attr(ns, detail, &rng));
            return (None, diags);
        };

        let name = name.to_string();
        let kind = match ns {
            "var" => ReferenceKind::UserVariable { name },
            "local" => ReferenceKind::Local { name },
            _ => ReferenceKind::Module { name },
        };
        (Some(Reference::new(kind, rng)), diags)
    }

    fn resource(
        names: &[&str],
        rng: SourceRange,
        mut diags: Diagnostics,
    ) -> (Option<Reference>, Diagnostics) {
        let (mode, parts) = match names[0] {
            "data" => (ResourceMode::Data, &names[1..]),
            _ => (ResourceMode::Managed, names),
        };

        if parts.is_empty() {
            diags.push(missing_attr(
                "data",
                "named after one of the data sources used in this module",
                &rng,
            ));
            return (None, diags);
        }
        if parts.len() < 2 {
            diags.push(Diagnostic::error(
                DiagnosticKind::Grammar,
                "Incomplete resource access",
                "Access of a resource or data source must include both a type and a name."
                    .to_string(),
                Some(rng),
            ));
            return (None, diags);
        }

        let kind = ReferenceKind::Resource {
            mode,
            type_name: parts[0].to_string(),
            name: parts[1].to_string(),
        };
        (Some(Reference::new(kind, rng)), diags)
    }
}
