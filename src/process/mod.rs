//! External command execution with per-invocation timeouts.
//!
//! Every pipeline step shells out to the blockchain CLI through a
//! [`CommandRunner`]. A non-zero exit status is data, not an error: the runner
//! only fails when the executable cannot be launched or when it outlives the
//! invocation's timeout. Deciding whether the captured output means success
//! is the job of [`crate::classify`].

use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use shell_escape::unix::escape;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Immutable description of one external process invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    program: String,
    args: Vec<OsString>,
    working_dir: Option<Utf8PathBuf>,
    timeout: Duration,
}

impl CommandInvocation {
    /// Starts an invocation of `program` that must finish within `timeout`.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout,
        }
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<OsString>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Appends several arguments in order.
    #[must_use]
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Runs the process from `dir` instead of the current directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory override, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.working_dir.as_deref()
    }

    /// Maximum wall-clock time the process may run.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` when any argument equals `needle`.
    #[must_use]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|arg| arg.to_string_lossy() == needle)
    }

    /// Returns the argument following `flag`, if present.
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<String> {
        self.args
            .iter()
            .skip_while(|arg| arg.to_string_lossy() != flag)
            .nth(1)
            .map(|arg| arg.to_string_lossy().into_owned())
    }

    /// Renders a shell-escaped command line for logs and assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut rendered = escape(self.program.as_str().into()).into_owned();
        for arg in &self.args {
            rendered.push(' ');
            let lossy = arg.to_string_lossy();
            rendered.push_str(escape(lossy).as_ref());
        }
        rendered
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_string())
    }
}

/// Result of running an external command to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process; `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Builds an output value from its parts.
    #[must_use]
    pub fn new(code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Human readable exit status, `unknown` when the process had no code.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Errors raised by the runner itself, as opposed to the command it ran.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProcessError {
    /// Raised when the executable cannot be started at all.
    #[error("failed to launch {program}: {message}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the process does not finish before its deadline.
    #[error("{program} did not finish within {}s", timeout.as_secs())]
    Timeout {
        /// Program that was killed.
        program: String,
        /// Deadline that was exceeded.
        timeout: Duration,
    },
    /// Raised when collecting the process output fails after launch.
    #[error("failed to collect output from {program}: {message}")]
    Io {
        /// Program whose pipes could not be drained.
        program: String,
        /// Operating system error string.
        message: String,
    },
}

/// Future returned by [`CommandRunner::run`].
pub type RunnerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, ProcessError>> + Send + 'a>>;

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation, capturing stdout, stderr, and the exit code.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Launch`] when the program cannot be started and
    /// [`ProcessError::Timeout`] when it exceeds the invocation's timeout.
    fn run<'a>(&'a self, invocation: &'a CommandInvocation) -> RunnerFuture<'a>;
}

/// Real command runner that spawns host processes via Tokio.
///
/// Both pipes are drained concurrently while waiting, and the child is
/// killed when the wait is abandoned (timeout or a dropped future).
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run<'a>(&'a self, invocation: &'a CommandInvocation) -> RunnerFuture<'a> {
        Box::pin(run_process(invocation))
    }
}

async fn run_process(invocation: &CommandInvocation) -> Result<CommandOutput, ProcessError> {
    let program = invocation.program();
    let mut command = Command::new(program);
    command
        .args(invocation.arguments())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = invocation.working_dir() {
        command.current_dir(dir);
    }

    debug!(command = %invocation, timeout_secs = invocation.timeout().as_secs(), "spawning");
    let child = command.spawn().map_err(|err| ProcessError::Launch {
        program: program.to_owned(),
        message: err.to_string(),
    })?;

    let output = tokio::time::timeout(invocation.timeout(), child.wait_with_output())
        .await
        .map_err(|_elapsed| ProcessError::Timeout {
            program: program.to_owned(),
            timeout: invocation.timeout(),
        })?
        .map_err(|err| ProcessError::Io {
            program: program.to_owned(),
            message: err.to_string(),
        })?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
