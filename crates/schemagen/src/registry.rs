//! Per-entity template trees.
//!
//! Every entity in a run owns an [`EntityTemplate`]: a private template tree
//! holding the sub-templates associated with it, the contexts queued for
//! each kind, and the buffer that collects its output in aggregate mode.
//!
//! [`EntityRegistry`] hands out these records by name. Records are created
//! on first use, keep their identity for the rest of the run and iterate in
//! the order they were created.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;

use minijinja::{Environment, Value};
use serde::Serialize;
use tracing::debug;

use schemagen_render::{RenderError, TemplateKind, TemplateSet};

/// A sub-template freshly associated with an entity.
///
/// Borrowed from the entity's tree, so it always renders with the tree's
/// current definition of its kind.
pub struct SubTemplate<'a> {
    kind: TemplateKind,
    tree: &'a Environment<'static>,
}

impl SubTemplate<'_> {
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Name of the child in the entity's tree.
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Renders the sub-template on its own against `ctx`.
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, RenderError> {
        let name = self.name();
        let tmpl = self
            .tree
            .get_template(name)
            .map_err(|e| RenderError::render(name, e))?;
        let out = tmpl.render(ctx).map_err(|e| RenderError::render(name, e))?;
        Ok(out)
    }
}

/// Serializable snapshot of an entity, as seen by its primary template.
///
/// `templates` lists associated kinds in association order and `dots` maps
/// each kind to its queued contexts. The primary kind itself is left out so
/// the primary template cannot iterate over itself.
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    pub name: String,
    pub templates: Vec<String>,
    pub dots: BTreeMap<String, Vec<Value>>,
    pub buffer: String,
}

/// The template tree and render state of one entity.
pub struct EntityTemplate {
    name: String,
    templates: Arc<TemplateSet>,
    tree: Environment<'static>,
    kinds: Vec<TemplateKind>,
    dots: HashMap<TemplateKind, Vec<Value>>,
    buffer: String,
}

impl EntityTemplate {
    fn new(name: &str, templates: Arc<TemplateSet>) -> Self {
        let tree = templates.helpers().environment();
        Self {
            name: name.to_string(),
            templates,
            tree,
            kinds: Vec::new(),
            dots: HashMap::new(),
            buffer: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kinds associated so far, in first-association order.
    pub fn kinds(&self) -> &[TemplateKind] {
        &self.kinds
    }

    /// Contexts queued for `kind`, oldest first.
    pub fn contexts(&self, kind: TemplateKind) -> &[Value] {
        self.dots.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Output accumulated by [`render_into_buffer`](Self::render_into_buffer).
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Parses the template for `kind` into this entity's tree and queues `ctx`.
    ///
    /// The body is resolved through the run's template source on every call,
    /// so re-associating a kind replaces its definition in the tree. Every
    /// call queues another context, even for a kind seen before.
    ///
    /// # Errors
    ///
    /// Resolution failures, and parse failures of the body. On a parse
    /// failure the tree keeps its previous definition of `kind` and no
    /// context is queued.
    pub fn associate<S: Serialize>(
        &mut self,
        kind: TemplateKind,
        ctx: S,
    ) -> Result<SubTemplate<'_>, RenderError> {
        let file_name = self.templates.naming().template_name(kind);
        let body = self.templates.source().resolve(&file_name)?;
        self.tree
            .add_template_owned(kind.as_str(), body)
            .map_err(|e| RenderError::compile(&file_name, e))?;

        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self.dots
            .entry(kind)
            .or_default()
            .push(Value::from_serialize(&ctx));
        debug!(entity = %self.name, kind = %kind, template = %file_name, "associated template");

        Ok(SubTemplate {
            kind,
            tree: &self.tree,
        })
    }

    /// Renders the tree's definition of `kind` against `ctx` into `w`.
    pub fn render_to<W: Write>(
        &self,
        kind: TemplateKind,
        ctx: &Value,
        w: W,
    ) -> Result<(), RenderError> {
        let name = kind.as_str();
        let tmpl = self
            .tree
            .get_template(name)
            .map_err(|e| RenderError::render(name, e))?;
        tmpl.render_captured_to(ctx, w)
            .map_err(|e| RenderError::render(name, e))?;
        Ok(())
    }

    /// Renders `kind` and appends the output to the entity's buffer.
    pub fn render_into_buffer(&mut self, kind: TemplateKind, ctx: &Value) -> Result<(), RenderError> {
        let mut out = Vec::new();
        self.render_to(kind, ctx, &mut out)?;
        self.buffer.push_str(&String::from_utf8_lossy(&out));
        Ok(())
    }

    pub fn view(&self) -> EntityView {
        let templates: Vec<String> = self
            .kinds
            .iter()
            .filter(|kind| **kind != TemplateKind::Table)
            .map(|kind| kind.as_str().to_string())
            .collect();
        let dots = self
            .dots
            .iter()
            .filter(|(kind, _)| **kind != TemplateKind::Table)
            .map(|(kind, ctxs)| (kind.as_str().to_string(), ctxs.clone()))
            .collect();

        EntityView {
            name: self.name.clone(),
            templates,
            dots,
            buffer: self.buffer.clone(),
        }
    }
}

impl std::fmt::Debug for EntityTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTemplate")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .field("buffer_len", &self.buffer.len())
            .finish()
    }
}

/// Name-indexed collection of entity records for one run.
#[derive(Debug)]
pub struct EntityRegistry {
    templates: Arc<TemplateSet>,
    records: Vec<EntityTemplate>,
    positions: HashMap<String, usize>,
}

impl EntityRegistry {
    pub fn new(templates: Arc<TemplateSet>) -> Self {
        Self {
            templates,
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn template_set(&self) -> &Arc<TemplateSet> {
        &self.templates
    }

    /// Returns the record for `name`, creating an empty one on first use.
    pub fn get_or_create(&mut self, name: &str) -> &mut EntityTemplate {
        let index = match self.positions.get(name) {
            Some(&index) => index,
            None => {
                let index = self.records.len();
                self.records
                    .push(EntityTemplate::new(name, Arc::clone(&self.templates)));
                self.positions.insert(name.to_string(), index);
                debug!(entity = name, "created entity record");
                index
            }
        };
        &mut self.records[index]
    }

    pub fn get(&self, name: &str) -> Option<&EntityTemplate> {
        self.positions.get(name).map(|&index| &self.records[index])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EntityTemplate> {
        match self.positions.get(name) {
            Some(&index) => Some(&mut self.records[index]),
            None => None,
        }
    }

    /// Entity names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(EntityTemplate::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityTemplate> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityTemplate> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
