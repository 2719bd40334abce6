// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::config::ModulePath;
use crate::schema::Schemas;
use crate::*;

use anyhow::Result;
use log::{trace, warn};

/// Implemented by vertices that need schemas, typically to know which parts
/// of their configuration to analyse for references.
///
/// The repository is shared and must not be modified. Implementations keep
/// whichever part of it they need.
pub trait AttachSchema {
    fn attach_schema(&mut self, schemas: Rc<Schemas>);
}

pub trait Vertex {
    fn name(&self) -> String;

    /// The vertex as an [`AttachSchema`] when it wants schemas.
    fn as_attach_schema(&mut self) -> Option<&mut dyn AttachSchema> {
        None
    }
}

/// The vertices of a module's graph.
#[derive(Default)]
pub struct Graph {
    pub path: ModulePath,
    vertices: Vec<Box<dyn Vertex>>,
}

impl Graph {
    pub fn new(path: ModulePath) -> Self {
        Self {
            path,
            vertices: vec![],
        }
    }

    pub fn add(&mut self, v: Box<dyn Vertex>) {
        self.vertices.push(v);
    }

    pub fn vertices(&self) -> &[Box<dyn Vertex>] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Box<dyn Vertex>] {
        &mut self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

pub trait GraphTransformer {
    fn transform(&self, g: &mut Graph) -> Result<()>;
}

/// Offers the schema repository to every vertex that implements
/// [`AttachSchema`].
///
/// Must run before any step that analyses vertex configuration for
/// references.
pub struct AttachSchemaTransformer {
    pub schemas: Option<Rc<Schemas>>,
}

impl GraphTransformer for AttachSchemaTransformer {
    fn transform(&self, g: &mut Graph) -> Result<()> {
        let Some(schemas) = &self.schemas else {
            warn!("AttachSchemaTransformer run without a schema repository");
            return Ok(());
        };

        trace!("AttachSchemaTransformer starting");
        for v in g.vertices_mut() {
            let name = v.name();
            if let Some(a) = v.as_attach_schema() {
                trace!("offering schemas to {name}");
                a.attach_schema(schemas.clone());
            }
        }
        trace!("AttachSchemaTransformer complete");

        Ok(())
    }
}
