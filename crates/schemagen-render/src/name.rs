//! Template naming.
//!
//! A template file name is built from a [`TemplateKind`] and the run's loader
//! qualifier:
//!
//! | Kind | File name |
//! |------|-----------|
//! | generic (`xo_db`, `xo_table`, `xo_single_file`) | `<kind>.<ext>.tpl` |
//! | everything else | `<qualifier>.<kind>.<ext>.tpl` |
//!
//! The qualifier is the loader identifier after [`DIALECT_ALIASES`] has been
//! applied, so `ora` and `oci8` both resolve `oracle.type.go.tpl`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default output language extension embedded in template file names.
pub const DEFAULT_TEMPLATE_EXT: &str = "go";

/// Loader identifiers that share another dialect's templates.
///
/// Each entry is `(loader, qualifier)`. Loaders not listed here use their
/// own identifier as the qualifier.
pub const DIALECT_ALIASES: &[(&str, &str)] = &[("ora", "oracle"), ("oci8", "oracle")];

/// Category of a template fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Shared database boilerplate, rendered once per run.
    #[serde(rename = "xo_db")]
    Boilerplate,
    Enum,
    Proc,
    Type,
    #[serde(rename = "foreignkey")]
    ForeignKey,
    Index,
    #[serde(rename = "querytype")]
    QueryType,
    Query,
    /// Per-entity primary template, rendered against the entity itself.
    #[serde(rename = "xo_table")]
    Table,
    /// Aggregate template used in single-file mode.
    #[serde(rename = "xo_single_file")]
    SingleFile,
}

impl TemplateKind {
    pub const ALL: &'static [TemplateKind] = &[
        TemplateKind::Boilerplate,
        TemplateKind::Enum,
        TemplateKind::Proc,
        TemplateKind::Type,
        TemplateKind::ForeignKey,
        TemplateKind::Index,
        TemplateKind::QueryType,
        TemplateKind::Query,
        TemplateKind::Table,
        TemplateKind::SingleFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Boilerplate => "xo_db",
            TemplateKind::Enum => "enum",
            TemplateKind::Proc => "proc",
            TemplateKind::Type => "type",
            TemplateKind::ForeignKey => "foreignkey",
            TemplateKind::Index => "index",
            TemplateKind::QueryType => "querytype",
            TemplateKind::Query => "query",
            TemplateKind::Table => "xo_table",
            TemplateKind::SingleFile => "xo_single_file",
        }
    }

    /// Returns true for kinds whose template is shared by every dialect.
    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            TemplateKind::Boilerplate | TemplateKind::Table | TemplateKind::SingleFile
        )
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown template kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown template kind \"{}\"", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for TemplateKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Maps a loader identifier to the qualifier used in template file names.
pub fn dialect_qualifier(loader: &str) -> &str {
    DIALECT_ALIASES
        .iter()
        .find(|(from, _)| *from == loader)
        .map(|(_, to)| *to)
        .unwrap_or(loader)
}

/// Bind-parameter syntax of a dialect, used by the `placeholder` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    Dollar,
    /// `?` for every parameter
    Question,
    /// `:1`, `:2`, ...
    Colon,
    /// `@p1`, `@p2`, ...
    AtP,
}

impl PlaceholderStyle {
    pub fn for_qualifier(qualifier: &str) -> Self {
        match qualifier {
            "postgres" => PlaceholderStyle::Dollar,
            "oracle" => PlaceholderStyle::Colon,
            "mssql" => PlaceholderStyle::AtP,
            _ => PlaceholderStyle::Question,
        }
    }

    /// Formats the placeholder for the 1-based parameter `index`.
    pub fn format(&self, index: usize) -> String {
        match self {
            PlaceholderStyle::Dollar => format!("${}", index),
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Colon => format!(":{}", index),
            PlaceholderStyle::AtP => format!("@p{}", index),
        }
    }
}

/// Naming rules for one run: loader qualifier plus output extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNaming {
    qualifier: String,
    ext: String,
}

impl TemplateNaming {
    /// Creates naming rules for `loader`, applying [`DIALECT_ALIASES`].
    pub fn new(loader: &str, ext: impl Into<String>) -> Self {
        Self {
            qualifier: dialect_qualifier(loader).to_string(),
            ext: ext.into(),
        }
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::for_qualifier(&self.qualifier)
    }

    /// Builds the file name the resolver looks up for `kind`.
    pub fn template_name(&self, kind: TemplateKind) -> String {
        if kind.is_generic() {
            format!("{}.{}.tpl", kind, self.ext)
        } else {
            format!("{}.{}.{}.tpl", self.qualifier, kind, self.ext)
        }
    }
}
