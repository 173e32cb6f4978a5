use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Command `{0}` timed out after {1:?}")]
    Timeout(String, Duration),
    #[error("Command `{command}` failed with {status}: {output}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

/// Combined result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// stdout followed by stderr, decoded lossily
    pub output: String,
}

/// Execute a shell command with `path` appended as its final argument.
///
/// The path is passed as a positional parameter rather than spliced into the
/// command string, so it needs no quoting. stdout and stderr are drained on
/// background threads and returned together.
///
/// # Arguments
///
/// * `command_str` - The shell command to execute, e.g. `goimports -w`
/// * `path` - File the command operates on
/// * `timeout` - Optional timeout; if exceeded, the process is killed
pub fn run_on_file(
    command_str: &str,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<CommandOutput, ShellError> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_str).arg(path);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c")
            .arg(format!("{} \"$1\"", command_str))
            .arg("schemagen-format")
            .arg(path);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait(&mut child, timeout)? {
        Some(status) => status,
        None => {
            child.kill()?;
            child.wait()?;
            return Err(ShellError::Timeout(
                command_str.to_string(),
                timeout.unwrap_or_default(),
            ));
        }
    };

    let mut output = stdout.join().unwrap_or_default();
    output.push_str(&stderr.join().unwrap_or_default());

    if !status.success() {
        return Err(ShellError::CommandFailed {
            command: command_str.to_string(),
            status,
            output,
        });
    }

    Ok(CommandOutput { status, output })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<Option<ExitStatus>> {
    match timeout {
        Some(duration) => child.wait_timeout(duration),
        None => child.wait().map(Some),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
