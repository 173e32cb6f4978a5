//! Run configuration.
//!
//! [`GenConfig`] is what the user writes: a YAML file and/or command-line
//! flags. [`GenConfig::resolve`] checks it against the filesystem and
//! produces the [`RunConfig`] a run actually uses, with every path made
//! absolute and every default filled in.
//!
//! Output location rules:
//!
//! | `out` | `single_file` | Result |
//! |-------|---------------|--------|
//! | unset | any | current directory |
//! | existing directory | any | that directory |
//! | existing file or missing path | true | parent directory, file name taken from `out` |
//! | existing file or missing path | false | error |

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use schemagen_pipe::{CommandFormatter, DEFAULT_FORMATTER};
use schemagen_render::{
    snake_case, Helpers, TemplateNaming, TemplateSet, TemplateSource, DEFAULT_TEMPLATE_EXT,
};

/// Suffix appended to per-entity output files.
pub const DEFAULT_SUFFIX: &str = ".xo.go";

/// Loader used when none is configured.
pub const DEFAULT_LOADER: &str = "postgres";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{} must be a directory unless single-file output is enabled", .0.display())]
    OutNotDirectory(PathBuf),
    #[error("template path {} does not exist", .0.display())]
    TemplatePathMissing(PathBuf),
    #[error("template path {} is not a directory", .0.display())]
    TemplatePathNotDirectory(PathBuf),
    #[error("cannot derive a package name from {}", .0.display())]
    NoPackage(PathBuf),
    #[error("could not inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// User-facing generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenConfig {
    /// Output directory, or output file in single-file mode.
    pub out: Option<PathBuf>,
    pub single_file: bool,
    /// Name of the aggregate file in single-file mode.
    pub filename: Option<String>,
    pub suffix: String,
    /// Package name; defaults to the output directory's name.
    pub package: Option<String>,
    pub overwrite: bool,
    pub append: bool,
    /// Directory whose files override bundled templates.
    pub template_path: Option<PathBuf>,
    pub loader_type: String,
    pub template_ext: String,
    pub skip_format: bool,
    pub formatter: String,
    pub formatter_timeout_secs: Option<u64>,
    pub skip_boilerplate: bool,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            out: None,
            single_file: false,
            filename: None,
            suffix: DEFAULT_SUFFIX.to_string(),
            package: None,
            overwrite: false,
            append: false,
            template_path: None,
            loader_type: DEFAULT_LOADER.to_string(),
            template_ext: DEFAULT_TEMPLATE_EXT.to_string(),
            skip_format: false,
            formatter: DEFAULT_FORMATTER.to_string(),
            formatter_timeout_secs: None,
            skip_boilerplate: false,
        }
    }
}

impl GenConfig {
    pub fn from_yaml_str(path: &Path, content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(path, &content)
    }

    /// Validates the settings against the filesystem, relative to `cwd`.
    pub fn resolve(&self, cwd: &Path) -> Result<RunConfig, ConfigError> {
        let (out_dir, out_file) = match &self.out {
            None => (cwd.to_path_buf(), None),
            Some(out) => {
                let out = absolute(cwd, out);
                match fs::metadata(&out) {
                    Ok(meta) if meta.is_dir() => (out, None),
                    Ok(_) if !self.single_file => return Err(ConfigError::OutNotDirectory(out)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound && !self.single_file => {
                        return Err(ConfigError::OutNotDirectory(out))
                    }
                    Err(e) if e.kind() != io::ErrorKind::NotFound => {
                        return Err(ConfigError::Io { path: out, source: e })
                    }
                    _ => split_file(cwd, &out),
                }
            }
        };

        let template_path = match &self.template_path {
            None => None,
            Some(dir) => {
                let dir = absolute(cwd, dir);
                match fs::metadata(&dir) {
                    Ok(meta) if meta.is_dir() => Some(dir),
                    Ok(_) => return Err(ConfigError::TemplatePathNotDirectory(dir)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        return Err(ConfigError::TemplatePathMissing(dir))
                    }
                    Err(e) => return Err(ConfigError::Io { path: dir, source: e }),
                }
            }
        };

        let package = match &self.package {
            Some(package) => package.clone(),
            None => out_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| ConfigError::NoPackage(out_dir.clone()))?,
        };

        let filename = out_file
            .or_else(|| self.filename.clone())
            .unwrap_or_else(|| format!("{}{}", package, self.suffix));

        Ok(RunConfig {
            out_dir,
            filename,
            package,
            suffix: self.suffix.clone(),
            single_file: self.single_file,
            overwrite: self.overwrite,
            append: self.append,
            template_path,
            loader_type: self.loader_type.clone(),
            template_ext: self.template_ext.clone(),
            skip_format: self.skip_format,
            formatter: self.formatter.clone(),
            formatter_timeout: self.formatter_timeout_secs.map(Duration::from_secs),
            skip_boilerplate: self.skip_boilerplate,
        })
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn split_file(cwd: &Path, out: &Path) -> (PathBuf, Option<String>) {
    let dir = match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => cwd.to_path_buf(),
    };
    let file = out
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    (dir, file)
}

/// Fully resolved settings for one run.
///
/// Serialized into the context of the boilerplate and aggregate templates
/// as `config`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub out_dir: PathBuf,
    pub filename: String,
    pub package: String,
    pub suffix: String,
    pub single_file: bool,
    pub overwrite: bool,
    pub append: bool,
    pub template_path: Option<PathBuf>,
    pub loader_type: String,
    pub template_ext: String,
    pub skip_format: bool,
    pub formatter: String,
    pub formatter_timeout: Option<Duration>,
    pub skip_boilerplate: bool,
}

impl RunConfig {
    /// `<out_dir>/<snake_case(name)><suffix>`
    pub fn entity_path(&self, name: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}{}", snake_case(name), self.suffix))
    }

    pub fn aggregate_path(&self) -> PathBuf {
        self.out_dir.join(&self.filename)
    }

    pub fn naming(&self) -> TemplateNaming {
        TemplateNaming::new(&self.loader_type, self.template_ext.clone())
    }

    /// Builds the run's template set from bundled templates and the
    /// override directory.
    pub fn template_set(&self) -> TemplateSet {
        let naming = self.naming();
        let helpers = Helpers::new(self.package.clone(), naming.clone(), self.single_file);
        TemplateSet::new(
            TemplateSource::new(self.template_path.clone()),
            naming,
            helpers,
        )
    }

    /// The configured formatter, or `None` when formatting is skipped.
    pub fn formatter(&self) -> Option<CommandFormatter> {
        if self.skip_format {
            return None;
        }
        let formatter = CommandFormatter::new(self.formatter.clone());
        Some(match self.formatter_timeout {
            Some(timeout) => formatter.with_timeout(timeout),
            None => formatter,
        })
    }
}
