//! Writing generated output to disk.
//!
//! [`Emitter::run`] walks the registry in creation order:
//!
//! 1. the shared boilerplate is rendered once (unless skipped);
//! 2. every entity's primary template is associated and rendered against
//!    the entity's own view;
//! 3. in per-entity mode each entity is written to its own file, in
//!    single-file mode the outputs are buffered and written through the
//!    aggregate template at the end.
//!
//! Each written file is handed to the formatter. A formatter failure aborts
//! the run. An existing per-entity target without `overwrite` or `append`
//! is skipped with a warning and the run continues; the aggregate file is
//! one indivisible output, so an existing aggregate target is an error.
//!
//! In per-entity mode every target path is computed before anything is
//! written, and two outputs mapping to the same file fail the run.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use minijinja::Value;
use serde::Serialize;
use tracing::{debug, info, warn};

use schemagen_pipe::{FormatError, Formatter};
use schemagen_render::{GeneratedBuffer, RenderError, TemplateKind, TemplateSet};

use crate::config::RunConfig;
use crate::registry::{EntityRegistry, EntityTemplate, EntityView};

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("entity \"{entity}\": {source}")]
    Entity {
        entity: String,
        #[source]
        source: RenderError,
    },
    #[error("boilerplate: {0}")]
    Boilerplate(#[source] RenderError),
    #[error("aggregate output {}: {source}", .path.display())]
    Aggregate {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("\"{first}\" and \"{second}\" would both be written to {}", .path.display())]
    PathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("run cancelled after {completed} of {total} entities")]
    Cancelled { completed: usize, total: usize },
}

/// Shared flag for stopping a run between entities.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Files touched by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub written: Vec<PathBuf>,
    /// Existing targets left alone because neither overwrite nor append was set.
    pub skipped: Vec<PathBuf>,
    pub formatted: Vec<PathBuf>,
}

#[derive(Serialize)]
struct BoilerplateContext<'a> {
    config: &'a RunConfig,
}

#[derive(Serialize)]
struct AggregateContext<'a> {
    config: &'a RunConfig,
    generated: &'a [GeneratedBuffer],
    entities: Vec<EntityView>,
}

/// Drives output for one run.
pub struct Emitter {
    config: RunConfig,
    formatter: Option<Box<dyn Formatter>>,
    cancel: Option<CancelFlag>,
}

impl Emitter {
    /// Creates an emitter using the formatter described by `config`.
    pub fn new(config: RunConfig) -> Self {
        let formatter = config
            .formatter()
            .map(|formatter| Box::new(formatter) as Box<dyn Formatter>);
        Self {
            config,
            formatter,
            cancel: None,
        }
    }

    /// Replaces the configured formatter. Ignored when `skip_format` is set.
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    pub fn without_formatter(mut self) -> Self {
        self.formatter = None;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Renders and writes every entity in `registry`.
    ///
    /// # Errors
    ///
    /// Stops at the first render, write or format failure. Files written
    /// before the failure are left in place.
    pub fn run(&self, registry: &mut EntityRegistry) -> Result<EmitReport, EmitError> {
        let templates = Arc::clone(registry.template_set());
        let mut report = EmitReport::default();

        if !self.config.single_file {
            self.check_targets(registry)?;
        }
        let generated = self.boilerplate(&templates)?;
        if !self.config.single_file {
            for buffer in &generated {
                self.write_generated(buffer, &mut report)?;
            }
        }

        let total = registry.len();
        for (completed, entity) in registry.iter_mut().enumerate() {
            if self.cancelled() {
                warn!(completed, total, "run cancelled");
                return Err(EmitError::Cancelled { completed, total });
            }
            self.emit_entity(entity, &mut report)?;
        }

        if self.config.single_file {
            self.emit_aggregate(&templates, registry, &generated, &mut report)?;
        }

        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            formatted = report.formatted.len(),
            "generation finished"
        );
        Ok(report)
    }

    /// Fails if two per-entity outputs, the boilerplate included, share a
    /// target path.
    fn check_targets(&self, registry: &EntityRegistry) -> Result<(), EmitError> {
        let boilerplate: Option<&str> =
            (!self.config.skip_boilerplate).then_some(TemplateKind::Boilerplate.as_str());
        let mut targets: HashMap<PathBuf, &str> = HashMap::new();
        for name in boilerplate.into_iter().chain(registry.names()) {
            let path = self.config.entity_path(name);
            if let Some(first) = targets.insert(path.clone(), name) {
                return Err(EmitError::PathCollision {
                    path,
                    first: first.to_string(),
                    second: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    fn boilerplate(&self, templates: &TemplateSet) -> Result<Vec<GeneratedBuffer>, EmitError> {
        if self.config.skip_boilerplate {
            return Ok(Vec::new());
        }
        let ctx = BoilerplateContext {
            config: &self.config,
        };
        let buffer = templates
            .execute_kind(TemplateKind::Boilerplate, TemplateKind::Boilerplate.as_str(), "", ctx)
            .map_err(EmitError::Boilerplate)?;
        Ok(vec![buffer])
    }

    fn write_generated(
        &self,
        buffer: &GeneratedBuffer,
        report: &mut EmitReport,
    ) -> Result<(), EmitError> {
        let path = self.config.entity_path(&buffer.name);
        let Some(file) = self.open(&path, report)? else {
            return Ok(());
        };
        write_all(file, &path, buffer.content.as_bytes())?;
        self.finish_file(path, report)
    }

    fn emit_entity(
        &self,
        entity: &mut EntityTemplate,
        report: &mut EmitReport,
    ) -> Result<(), EmitError> {
        let name = entity.name().to_string();
        let entity_error = |source| EmitError::Entity {
            entity: name.clone(),
            source,
        };

        let view = Value::from_serialize(entity.view());
        entity
            .associate(TemplateKind::Table, view.clone())
            .map_err(entity_error)?;

        if self.config.single_file {
            entity
                .render_into_buffer(TemplateKind::Table, &view)
                .map_err(entity_error)?;
            debug!(entity = %name, "buffered entity output");
            return Ok(());
        }

        let path = self.config.entity_path(&name);
        let Some(file) = self.open(&path, report)? else {
            return Ok(());
        };
        let mut w = BufWriter::new(file);
        entity
            .render_to(TemplateKind::Table, &view, &mut w)
            .map_err(entity_error)?;
        w.flush().map_err(|source| EmitError::Write {
            path: path.clone(),
            source,
        })?;
        drop(w);

        info!(entity = %name, path = %path.display(), "wrote entity");
        self.finish_file(path, report)
    }

    fn emit_aggregate(
        &self,
        templates: &TemplateSet,
        registry: &EntityRegistry,
        generated: &[GeneratedBuffer],
        report: &mut EmitReport,
    ) -> Result<(), EmitError> {
        let ctx = AggregateContext {
            config: &self.config,
            generated,
            entities: registry.iter().map(EntityTemplate::view).collect(),
        };
        let name = templates.naming().template_name(TemplateKind::SingleFile);
        let path = self.config.aggregate_path();

        let file = open_target(&path, self.config.overwrite, self.config.append).map_err(
            |source| EmitError::Write {
                path: path.clone(),
                source,
            },
        )?;
        let mut w = BufWriter::new(file);
        templates
            .execute(&name, &mut w, &ctx)
            .map_err(|source| EmitError::Aggregate {
                path: path.clone(),
                source,
            })?;
        w.flush().map_err(|source| EmitError::Write {
            path: path.clone(),
            source,
        })?;
        drop(w);

        info!(path = %path.display(), entities = registry.len(), "wrote aggregate output");
        self.finish_file(path, report)
    }

    /// Opens `path` for writing, or records it as skipped if it exists and
    /// may not be touched.
    fn open(&self, path: &Path, report: &mut EmitReport) -> Result<Option<File>, EmitError> {
        match open_target(path, self.config.overwrite, self.config.append) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(path = %path.display(), "file exists, not overwriting");
                report.skipped.push(path.to_path_buf());
                Ok(None)
            }
            Err(source) => Err(EmitError::Write {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn finish_file(&self, path: PathBuf, report: &mut EmitReport) -> Result<(), EmitError> {
        report.written.push(path.clone());
        if self.config.skip_format {
            return Ok(());
        }
        if let Some(formatter) = &self.formatter {
            formatter.format(&path)?;
            report.formatted.push(path);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("config", &self.config)
            .field("formatter", &self.formatter.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Opens an output file.
///
/// - a directory at `path` is an error;
/// - an existing file is appended to when `append` is set;
/// - otherwise the file is created, truncating an existing one only when
///   `overwrite` is set. Without `overwrite` an existing file fails with
///   [`io::ErrorKind::AlreadyExists`].
pub fn open_target(path: &Path, overwrite: bool, append: bool) -> io::Result<File> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            return Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            )))
        }
        Ok(_) if append => return OpenOptions::new().append(true).open(path),
        _ => {}
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(path)
}

fn write_all(file: File, path: &Path, content: &[u8]) -> Result<(), EmitError> {
    let mut w = BufWriter::new(file);
    w.write_all(content)
        .and_then(|()| w.flush())
        .map_err(|source| EmitError::Write {
            path: path.to_path_buf(),
            source,
        })
}
