pub mod format;
pub mod shell;

pub use format::{CommandFormatter, FormatError, Formatter, DEFAULT_FORMATTER};
pub use shell::{run_on_file, CommandOutput, ShellError};
