//! # Schemagen Render - Template resolution and caching
//!
//! `schemagen-render` is the template layer of the `schemagen` code generator.
//! It turns a logical template kind into a file name, finds the body for that
//! name, compiles it with a fixed helper table and caches the result for the
//! rest of the run.
//!
//! ## Core Concepts
//!
//! - [`TemplateKind`] and [`TemplateNaming`]: `<dialect>.<kind>.<ext>.tpl`
//!   file names, with dialect aliases applied
//! - [`TemplateSource`]: override directory first, bundled templates second
//! - [`Helpers`]: filters, functions and globals available to templates
//! - [`TemplateSet`]: compile-once cache keyed by template name
//!
//! ## Quick Start
//!
//! ```rust
//! use schemagen_render::{Helpers, TemplateKind, TemplateNaming, TemplateSet, TemplateSource};
//!
//! let naming = TemplateNaming::new("postgres", "go");
//! let helpers = Helpers::new("models", naming.clone(), false);
//! let source = TemplateSource::empty(None)
//!     .with_bundled_entry("postgres.type.go.tpl", "type {{ name | pascal_case }} struct{}");
//! let templates = TemplateSet::new(source, naming, helpers);
//!
//! let name = templates.naming().template_name(TemplateKind::Type);
//! let out = templates
//!     .execute_to_string(&name, minijinja::context! { name => "user_account" })
//!     .unwrap();
//! assert_eq!(out, "type UserAccount struct{}");
//! ```

pub mod bundled;
mod cache;
mod error;
pub mod helpers;
pub mod name;
pub mod source;
mod util;

pub use cache::{GeneratedBuffer, TemplateSet};
pub use error::RenderError;
pub use helpers::Helpers;
pub use name::{
    dialect_qualifier, PlaceholderStyle, TemplateKind, TemplateNaming, UnknownKind,
    DEFAULT_TEMPLATE_EXT, DIALECT_ALIASES,
};
pub use source::{ResolveError, TemplateSource};
pub use util::{camel_case, go_quote, pascal_case, plural, snake_case};

// Re-exported so callers can build contexts without a direct dependency.
pub use minijinja::Value;
