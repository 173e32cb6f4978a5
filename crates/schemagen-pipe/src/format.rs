use crate::shell::{run_on_file, ShellError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Formatter used when none is configured.
pub const DEFAULT_FORMATTER: &str = "goimports -w";

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("could not run formatter `{command}` on {}: {source}", .path.display())]
    Spawn {
        command: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("formatter `{command}` timed out after {timeout:?} on {}", .path.display())]
    Timeout {
        command: String,
        path: PathBuf,
        timeout: Duration,
    },
    #[error("formatter `{command}` failed on {} ({status}):\n{output}", .path.display())]
    Failed {
        command: String,
        path: PathBuf,
        status: String,
        /// Combined stdout and stderr of the formatter, verbatim
        output: String,
    },
}

/// Formats a generated file in place.
pub trait Formatter: Send + Sync {
    fn format(&self, path: &Path) -> Result<(), FormatError>;
}

/// Runs a shell command with the file path as its last argument.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    command: String,
    timeout: Option<Duration>,
}

impl CommandFormatter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Default for CommandFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_FORMATTER)
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, path: &Path) -> Result<(), FormatError> {
        debug!(command = %self.command, path = %path.display(), "formatting");
        match run_on_file(&self.command, path, self.timeout) {
            Ok(_) => Ok(()),
            Err(ShellError::Io(source)) => Err(FormatError::Spawn {
                command: self.command.clone(),
                path: path.to_path_buf(),
                source,
            }),
            Err(ShellError::Timeout(command, timeout)) => Err(FormatError::Timeout {
                command,
                path: path.to_path_buf(),
                timeout,
            }),
            Err(ShellError::CommandFailed {
                command,
                status,
                output,
            }) => Err(FormatError::Failed {
                command,
                path: path.to_path_buf(),
                status: status.to_string(),
                output,
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_successful_formatter() {
        let file = NamedTempFile::new().unwrap();
        let formatter = CommandFormatter::new("true");
        assert!(formatter.format(file.path()).is_ok());
    }

    #[test]
    fn test_formatter_rewrites_file_in_place() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "b\na\n").unwrap();
        let formatter = CommandFormatter::new("sort -o \"$1\"");

        formatter.format(file.path()).unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_failure_surfaces_output_verbatim() {
        let file = NamedTempFile::new().unwrap();
        let formatter = CommandFormatter::new("echo 'main.go:3: expected declaration' >&2; false");

        let err = formatter.format(file.path()).unwrap_err();
        match &err {
            FormatError::Failed { output, path, .. } => {
                assert_eq!(output, "main.go:3: expected declaration\n");
                assert_eq!(path, file.path());
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(err.to_string().contains("expected declaration"));
    }

    #[test]
    fn test_timeout_maps_to_format_error() {
        let file = NamedTempFile::new().unwrap();
        let formatter =
            CommandFormatter::new("sleep 2 #").with_timeout(Duration::from_millis(100));
        assert!(matches!(
            formatter.format(file.path()),
            Err(FormatError::Timeout { .. })
        ));
    }

    #[test]
    fn test_default_command() {
        assert_eq!(CommandFormatter::default().command(), DEFAULT_FORMATTER);
    }
}
