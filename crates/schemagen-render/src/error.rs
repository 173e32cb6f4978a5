//! Error types for template resolution, compilation and rendering.
//!
//! [`RenderError`] is the single error type returned by the template cache and
//! by entity sub-templates. It keeps the offending template name next to the
//! underlying engine message so a failed run can be diagnosed from its output
//! alone.

use std::fmt;

use crate::source::ResolveError;

/// Error type for template operations.
#[derive(Debug)]
pub enum RenderError {
    /// The template name exists neither in the override directory nor in the
    /// bundled set.
    Resolve(ResolveError),

    /// The template body failed to parse.
    Compile {
        /// Name of the template that failed to parse
        name: String,
        /// Engine message, including the source location when available
        message: String,
    },

    /// The template parsed but failed during execution (missing field,
    /// unknown sub-template, failed write).
    Render {
        /// Name of the template being executed
        name: String,
        /// Engine message
        message: String,
    },

    /// I/O error while writing rendered output.
    Io(std::io::Error),
}

impl RenderError {
    /// Wraps an engine parse error for the template `name`.
    pub fn compile(name: &str, err: minijinja::Error) -> Self {
        RenderError::Compile {
            name: name.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Wraps an engine execution error for the template `name`.
    pub fn render(name: &str, err: minijinja::Error) -> Self {
        RenderError::Render {
            name: name.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Returns the template name this error refers to.
    pub fn template_name(&self) -> Option<&str> {
        match self {
            RenderError::Resolve(err) => Some(err.name()),
            RenderError::Compile { name, .. } | RenderError::Render { name, .. } => Some(name),
            RenderError::Io(_) => None,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Resolve(err) => write!(f, "{}", err),
            RenderError::Compile { name, message } => {
                write!(f, "failed to compile template \"{}\": {}", name, message)
            }
            RenderError::Render { name, message } => {
                write!(f, "failed to render template \"{}\": {}", name, message)
            }
            RenderError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resolve(err) => Some(err),
            RenderError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResolveError> for RenderError {
    fn from(err: ResolveError) -> Self {
        RenderError::Resolve(err)
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err)
    }
}
