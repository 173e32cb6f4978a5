//! # Schemagen - Template-driven code generation
//!
//! `schemagen` renders source files for schema entities (tables, views,
//! enums, queries) from a set of named templates. Template lookup and
//! caching live in [`schemagen_render`], running the post-write formatter
//! in [`schemagen_pipe`]; this crate ties them to a run:
//!
//! - [`config`]: user settings and their resolution against the filesystem
//! - [`registry`]: one template tree per entity, in creation order
//! - [`entity`]: loading entity descriptions and associating their fragments
//! - [`emit`]: rendering every entity and writing the results
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use schemagen::{load_entities, register_entities, EntityRegistry, Emitter, GenConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = GenConfig::from_yaml_file(Path::new("schemagen.yaml"))?
//!     .resolve(&std::env::current_dir()?)?;
//!
//! let mut registry = EntityRegistry::new(Arc::new(config.template_set()));
//! register_entities(&mut registry, &load_entities(Path::new("entities.yaml"))?)?;
//!
//! let report = Emitter::new(config).run(&mut registry)?;
//! println!("wrote {} files", report.written.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod emit;
pub mod entity;
pub mod registry;

pub use config::{ConfigError, GenConfig, RunConfig, DEFAULT_LOADER, DEFAULT_SUFFIX};
pub use emit::{open_target, CancelFlag, EmitError, EmitReport, Emitter};
pub use entity::{load_entities, register_entities, EntityDescription, EntityError, Fragment};
pub use registry::{EntityRegistry, EntityTemplate, EntityView, SubTemplate};

pub use schemagen_pipe::{CommandFormatter, FormatError, Formatter};
pub use schemagen_render::{
    GeneratedBuffer, Helpers, RenderError, TemplateKind, TemplateNaming, TemplateSet,
    TemplateSource,
};
