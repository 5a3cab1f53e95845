//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::io;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{Mutex, MutexGuard};

use crate::credential::KeyFileSystem;
use crate::process::{CommandInvocation, CommandOutput, CommandRunner, ProcessError, RunnerFuture};

/// Private key text served by [`MemoryKeyFiles::default`].
pub const FAKE_PRIVATE_KEY: &str = "0xfeedfacecafebeef";

fn lock<T>(mutex: &StdMutex<T>) -> StdMutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One queued reaction of [`ScriptedRunner`].
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    /// The process ran and produced this output.
    Output(CommandOutput),
    /// The runner failed with this error.
    Error(ProcessError),
    /// The process never finishes; only a timeout or drop ends the wait.
    Hang,
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
/// Clones share the same queue and invocation log.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<StdMutex<VecDeque<ScriptedResponse>>>,
    invocations: Arc<StdMutex<Vec<CommandInvocation>>>,
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Returns the invocations whose arguments contain `subcommand`.
    #[must_use]
    pub fn invocations_with(&self, subcommand: &str) -> Vec<CommandInvocation> {
        self.invocations()
            .into_iter()
            .filter(|invocation| invocation.has_arg(subcommand))
            .collect()
    }

    /// Number of responses not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.responses).len()
    }

    fn push(&self, response: ScriptedResponse) {
        lock(&self.responses).push_back(response);
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.push(ScriptedResponse::Output(CommandOutput::new(
            code, stdout, stderr,
        )));
    }

    /// Pushes a clean exit with `stdout`.
    pub fn push_success(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a runner error.
    pub fn push_error(&self, error: ProcessError) {
        self.push(ScriptedResponse::Error(error));
    }

    /// Pushes a launch failure for `program`.
    pub fn push_launch_failure(&self, program: &str) {
        self.push_error(ProcessError::Launch {
            program: program.to_owned(),
            message: String::from("No such file or directory (os error 2)"),
        });
    }

    /// Pushes a process that never exits.
    pub fn push_hang(&self) {
        self.push(ScriptedResponse::Hang);
    }

    /// Pushes successful keygen and lookup outputs resolving to `0x<hex>`.
    pub fn push_generated_account(&self, hex: &str) {
        self.push_success("{\n  \"Result\": \"Keys written\"\n}");
        self.push_success(format!("{{\n  \"Result\": \"{hex}\"\n}}"));
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, invocation: &'a CommandInvocation) -> RunnerFuture<'a> {
        lock(&self.invocations).push(invocation.clone());
        let next = lock(&self.responses).pop_front();
        Box::pin(async move {
            match next {
                Some(ScriptedResponse::Output(output)) => Ok(output),
                Some(ScriptedResponse::Error(error)) => Err(error),
                Some(ScriptedResponse::Hang) => std::future::pending().await,
                None => Err(ProcessError::Launch {
                    program: invocation.program().to_owned(),
                    message: String::from("no scripted response available"),
                }),
            }
        })
    }
}

/// In-memory key file store that records removals.
///
/// Clones share the same removal log.
#[derive(Clone, Debug)]
pub struct MemoryKeyFiles {
    private_key: String,
    removed: Arc<StdMutex<Vec<Utf8PathBuf>>>,
    fail_removals: bool,
}

impl Default for MemoryKeyFiles {
    fn default() -> Self {
        Self::with_private_key(format!("{FAKE_PRIVATE_KEY}\n"))
    }
}

impl MemoryKeyFiles {
    /// Serves `contents` for every key read.
    #[must_use]
    pub fn with_private_key(contents: impl Into<String>) -> Self {
        Self {
            private_key: contents.into(),
            removed: Arc::default(),
            fail_removals: false,
        }
    }

    /// Makes every removal fail with a permission error after recording it.
    #[must_use]
    pub const fn failing_removals(mut self) -> Self {
        self.fail_removals = true;
        self
    }

    /// Paths passed to `remove_file`, in call order.
    #[must_use]
    pub fn removed(&self) -> Vec<Utf8PathBuf> {
        lock(&self.removed).clone()
    }

    /// Number of times `path` was removed.
    #[must_use]
    pub fn removal_count(&self, path: &Utf8Path) -> usize {
        lock(&self.removed)
            .iter()
            .filter(|removed| removed.as_path() == path)
            .count()
    }
}

impl KeyFileSystem for MemoryKeyFiles {
    fn read_to_string(&self, _path: &Utf8Path) -> io::Result<String> {
        Ok(self.private_key.clone())
    }

    fn remove_file(&self, path: &Utf8Path) -> io::Result<()> {
        lock(&self.removed).push(path.to_path_buf());
        if self.fail_removals {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated permission error",
            ));
        }
        Ok(())
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
