//! Template source resolution.
//!
//! [`TemplateSource`] maps a template file name to its body. Two locations are
//! consulted, in order:
//!
//! 1. The override directory, if configured. A file named exactly like the
//!    template wins unconditionally; nothing is merged with the bundled body.
//! 2. The bundled set compiled into the binary (see [`crate::bundled`]).
//!
//! The override directory is checked again on every call so edits made while
//! a long-lived process runs are picked up by the next compilation.
//!
//! ```rust,ignore
//! let source = TemplateSource::new(Some("./templates".into()));
//! let body = source.resolve("postgres.type.go.tpl")?;
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bundled::BUNDLED_TEMPLATES;

/// Error returned when a template body cannot be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The name exists neither in the override directory nor in the bundle.
    NotFound {
        /// The name that was requested
        name: String,
    },

    /// An override file exists but could not be read.
    Read {
        /// The name that was requested
        name: String,
        /// Path of the override file
        path: PathBuf,
        /// Error message
        message: String,
    },
}

impl ResolveError {
    /// Returns the template name that failed to resolve.
    pub fn name(&self) -> &str {
        match self {
            ResolveError::NotFound { name } | ResolveError::Read { name, .. } => name,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound { name } => write!(f, "Template not found: \"{}\"", name),
            ResolveError::Read {
                name,
                path,
                message,
            } => write!(
                f,
                "Failed to read template \"{}\" from {}: {}",
                name,
                path.display(),
                message
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Resolves template names against an override directory and a bundled set.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    override_dir: Option<PathBuf>,
    bundled: HashMap<String, Cow<'static, str>>,
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TemplateSource {
    /// Creates a source backed by the built-in bundle and an optional
    /// override directory.
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        let bundled = BUNDLED_TEMPLATES
            .iter()
            .map(|(name, body)| (name.to_string(), Cow::Borrowed(*body)))
            .collect();
        Self {
            override_dir,
            bundled,
        }
    }

    /// Creates a source with no bundled templates at all.
    ///
    /// Useful when every template comes from [`with_bundled_entry`](Self::with_bundled_entry)
    /// or the override directory.
    pub fn empty(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            bundled: HashMap::new(),
        }
    }

    /// Adds or replaces a bundled entry.
    pub fn with_bundled_entry(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.bundled.insert(name.into(), Cow::Owned(body.into()));
        self
    }

    pub fn override_dir(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    /// Returns the body of the template called `name`.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NotFound`] if neither location has the name, and
    /// [`ResolveError::Read`] if the override file exists but is unreadable.
    pub fn resolve(&self, name: &str) -> Result<String, ResolveError> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(name);
            if path.is_file() {
                debug!(template = name, path = %path.display(), "using override template");
                return std::fs::read_to_string(&path).map_err(|e| ResolveError::Read {
                    name: name.to_string(),
                    path,
                    message: e.to_string(),
                });
            }
        }

        self.bundled
            .get(name)
            .map(|body| body.to_string())
            .ok_or_else(|| ResolveError::NotFound {
                name: name.to_string(),
            })
    }

    /// Returns true if `name` resolves from either location.
    pub fn contains(&self, name: &str) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|dir| dir.join(name).is_file())
            || self.bundled.contains_key(name)
    }

    /// Returns the bundled template names, sorted.
    pub fn bundled_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bundled.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
