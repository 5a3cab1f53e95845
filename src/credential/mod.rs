//! Generated account credentials and the lifetime of their key files.
//!
//! A credential is created by asking the CLI to write a keypair to two
//! sibling files named from a fresh UUID, then looking up the account address
//! for the public key. The files are the authoritative secret; the
//! [`AccountCredential`] value is only a handle to them.
//!
//! Key files are owned by a [`KeyFileGuard`] from the moment their paths are
//! chosen. The guard erases them exactly once: explicitly through
//! [`CredentialGuard::release`], or from `Drop` when the owning future fails,
//! panics, or is cancelled. [`CredentialGuard::persist`] hands the files over
//! to a long-lived owner instead.

use std::io;
use std::sync::LazyLock;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::{Classification, MatchedRule, Outcome, RuleBook, StepKind};
use crate::process::{CommandInvocation, CommandOutput, CommandRunner, ProcessError};
use crate::tool::AptosCli;

mod error;
mod files;

pub use error::{CleanupError, CleanupFailure, CredentialError, FundingError};
pub use files::{HostKeyFiles, KeyFileSystem};

/// Prefix of every generated key file name.
pub const KEY_FILE_PREFIX: &str = "movedeploy-";

/// Default pause after a funding attempt so the ledger can catch up.
pub const DEFAULT_FUND_SETTLE: Duration = Duration::from_secs(2);

#[expect(
    clippy::expect_used,
    reason = "the pattern is a compile-time constant covered by unit tests"
)]
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""Result"\s*:\s*"(?:0x)?([0-9a-fA-F]+)""#).expect("address pattern is valid")
});

/// Paths of one private/public key file pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPaths {
    private_key: Utf8PathBuf,
    public_key: Utf8PathBuf,
}

impl KeyPaths {
    /// Derives the pair for `token` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Utf8Path, token: &str) -> Self {
        let private_key = dir.join(format!("{KEY_FILE_PREFIX}{token}.key"));
        let public_key = Utf8PathBuf::from(format!("{private_key}.pub"));
        Self {
            private_key,
            public_key,
        }
    }

    /// Derives a pair in `dir` that no concurrent attempt will collide with.
    #[must_use]
    pub fn allocate(dir: &Utf8Path) -> Self {
        Self::in_dir(dir, &Uuid::new_v4().simple().to_string())
    }

    /// Private key file path.
    #[must_use]
    pub fn private_key(&self) -> &Utf8Path {
        &self.private_key
    }

    /// Public key file path.
    #[must_use]
    pub fn public_key(&self) -> &Utf8Path {
        &self.public_key
    }
}

/// Handle to a generated account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountCredential {
    /// Account address, `0x`-prefixed.
    pub address: String,
    keys: KeyPaths,
}

impl AccountCredential {
    /// Creates a handle for `address` backed by `keys`.
    #[must_use]
    pub fn new(address: impl Into<String>, keys: KeyPaths) -> Self {
        Self {
            address: address.into(),
            keys,
        }
    }

    /// Backing key files.
    #[must_use]
    pub const fn keys(&self) -> &KeyPaths {
        &self.keys
    }

    /// Private key file path.
    #[must_use]
    pub fn private_key_path(&self) -> &Utf8Path {
        self.keys.private_key()
    }

    /// Public key file path.
    #[must_use]
    pub fn public_key_path(&self) -> &Utf8Path {
        self.keys.public_key()
    }
}

/// Where key files go and how long to wait after funding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialSettings {
    /// Directory that receives generated key files.
    pub key_dir: Utf8PathBuf,
    /// Pause after each funding attempt.
    pub fund_settle: Duration,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            key_dir: Utf8PathBuf::from("."),
            fund_settle: DEFAULT_FUND_SETTLE,
        }
    }
}

/// Erases a key file pair exactly once.
#[derive(Debug)]
pub struct KeyFileGuard<'a, F: KeyFileSystem> {
    files: &'a F,
    keys: KeyPaths,
    armed: bool,
}

impl<'a, F: KeyFileSystem> KeyFileGuard<'a, F> {
    /// Takes ownership of the files at `keys`, whether or not they exist yet.
    #[must_use]
    pub const fn new(files: &'a F, keys: KeyPaths) -> Self {
        Self {
            files,
            keys,
            armed: true,
        }
    }

    /// Guarded paths.
    #[must_use]
    pub const fn keys(&self) -> &KeyPaths {
        &self.keys
    }

    /// Erases the files now.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError`] listing files that could not be removed.
    pub fn release(mut self) -> Result<(), CleanupError> {
        self.armed = false;
        destroy_key_files(self.files, &self.keys)
    }

    /// Gives up ownership without erasing anything.
    #[must_use]
    pub fn disarm(mut self) -> KeyPaths {
        self.armed = false;
        self.keys.clone()
    }
}

impl<F: KeyFileSystem> Drop for KeyFileGuard<'_, F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        match destroy_key_files(self.files, &self.keys) {
            Ok(()) => debug!(key = %self.keys.private_key, "key files erased on drop"),
            Err(err) => warn!(error = %err, "key file cleanup failed on drop"),
        }
    }
}

/// A generated credential whose key files are erased unless persisted.
#[derive(Debug)]
pub struct CredentialGuard<'a, F: KeyFileSystem> {
    credential: AccountCredential,
    keys: KeyFileGuard<'a, F>,
}

impl<F: KeyFileSystem> CredentialGuard<'_, F> {
    /// The guarded credential.
    #[must_use]
    pub const fn credential(&self) -> &AccountCredential {
        &self.credential
    }

    /// Erases the key files now.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError`] listing files that could not be removed.
    pub fn release(self) -> Result<(), CleanupError> {
        self.keys.release()
    }

    /// Keeps the key files on disk and returns the bare handle.
    ///
    /// The caller becomes responsible for calling
    /// [`CredentialManager::destroy`].
    #[must_use]
    pub fn persist(self) -> AccountCredential {
        let _keys = self.keys.disarm();
        self.credential
    }
}

/// Generates, funds, reads, and destroys account credentials.
#[derive(Debug)]
pub struct CredentialManager<R: CommandRunner, F: KeyFileSystem> {
    cli: AptosCli,
    rules: RuleBook,
    settings: CredentialSettings,
    runner: R,
    files: F,
}

impl<R: CommandRunner, F: KeyFileSystem> CredentialManager<R, F> {
    /// Creates a manager with default settings and classifier rules.
    #[must_use]
    pub fn new(cli: AptosCli, runner: R, files: F) -> Self {
        Self {
            cli,
            rules: RuleBook::default(),
            settings: CredentialSettings::default(),
            runner,
            files,
        }
    }

    /// Overrides the key directory and funding settle delay.
    #[must_use]
    pub fn with_settings(mut self, settings: CredentialSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Overrides the classifier rules.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleBook) -> Self {
        self.rules = rules;
        self
    }

    /// CLI argument builder shared with the orchestrator.
    #[must_use]
    pub const fn cli(&self) -> &AptosCli {
        &self.cli
    }

    /// Classifier rules shared with the orchestrator.
    #[must_use]
    pub const fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Command runner shared with the orchestrator.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &CredentialSettings {
        &self.settings
    }

    /// Runs `invocation` for `step` and classifies its output.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the process cannot launch or times out.
    pub async fn run_step(
        &self,
        step: StepKind,
        invocation: &CommandInvocation,
    ) -> Result<(CommandOutput, Classification), ProcessError> {
        info!(%step, program = invocation.program(), "running step");
        let output = self.runner.run(invocation).await?;
        let classification = self.rules.classify(&output, step);
        debug!(
            %step,
            code = ?output.code,
            rule = ?classification.rule,
            success = classification.outcome.is_success(),
            "step classified"
        );
        if classification.rule == MatchedRule::OptimisticDefault && !output.is_success() {
            warn!(%step, status = %output.status_text(), "treating unmarked non-zero exit as success");
        }
        Ok((output, classification))
    }

    /// Generates a keypair and resolves its account address.
    ///
    /// Key files are erased before returning an error.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when keygen or lookup fails, or when the
    /// lookup output does not contain an address.
    pub async fn generate(&self) -> Result<CredentialGuard<'_, F>, CredentialError> {
        let keys = KeyFileGuard::new(&self.files, KeyPaths::allocate(&self.settings.key_dir));
        match self.create_account(keys.keys()).await {
            Ok(address) => {
                info!(%address, "generated account");
                let credential = AccountCredential::new(address, keys.keys().clone());
                Ok(CredentialGuard { credential, keys })
            }
            Err(err) => {
                if let Err(cleanup) = keys.release() {
                    warn!(error = %cleanup, "key file cleanup failed after generation error");
                }
                Err(err)
            }
        }
    }

    async fn create_account(&self, keys: &KeyPaths) -> Result<String, CredentialError> {
        let keygen = self.cli.keygen(keys.private_key());
        let (_, generated) = self
            .run_step(StepKind::Keygen, &keygen)
            .await
            .map_err(|source| CredentialError::Process {
                step: StepKind::Keygen,
                source,
            })?;
        if let Outcome::Failure { reason } = generated.outcome {
            return Err(CredentialError::Keygen { reason });
        }

        let lookup = self.cli.lookup_address(keys.public_key());
        let (output, looked_up) = self
            .run_step(StepKind::AddressLookup, &lookup)
            .await
            .map_err(|source| CredentialError::Process {
                step: StepKind::AddressLookup,
                source,
            })?;
        if let Outcome::Failure { reason } = looked_up.outcome {
            return Err(CredentialError::AddressLookup { reason });
        }

        parse_address(&output.stdout)
    }

    /// Requests faucet funds for `address`, then waits the settle delay.
    ///
    /// Funding is best-effort: callers log a rejection and carry on, but a
    /// timeout aborts the deployment.
    ///
    /// # Errors
    ///
    /// Returns [`FundingError`] when the faucet command cannot run or its
    /// output classifies as a failure.
    pub async fn fund(&self, address: &str) -> Result<String, FundingError> {
        let invocation = self.cli.fund(address);
        let result = self.run_step(StepKind::Fund, &invocation).await;
        if !self.settings.fund_settle.is_zero() {
            tokio::time::sleep(self.settings.fund_settle).await;
        }
        let (_, classification) = result.map_err(FundingError::Process)?;
        match classification.outcome {
            Outcome::Success { payload } => Ok(payload),
            Outcome::Failure { reason } => Err(FundingError::Rejected { reason }),
        }
    }

    /// Reads the private key back from disk, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::ReadKey`] when the file cannot be read.
    pub fn read_private_key(&self, credential: &AccountCredential) -> Result<String, CredentialError> {
        let path = credential.private_key_path();
        self.files
            .read_to_string(path)
            .map(|contents| contents.trim().to_owned())
            .map_err(|err| CredentialError::ReadKey {
                path: path.to_path_buf(),
                message: err.to_string(),
            })
    }

    /// Erases a persisted credential's key files.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError`] listing files that could not be removed.
    pub fn destroy(&self, credential: &AccountCredential) -> Result<(), CleanupError> {
        destroy_key_files(&self.files, credential.keys())
    }
}

/// Extracts the `0x`-prefixed address from lookup output.
///
/// # Errors
///
/// Returns [`CredentialError::AddressParse`] when the output has no
/// `"Result": "<hex>"` field.
pub fn parse_address(output: &str) -> Result<String, CredentialError> {
    ADDRESS_PATTERN
        .captures(output)
        .and_then(|captures| captures.get(1))
        .map(|hex| format!("0x{}", hex.as_str()))
        .ok_or_else(|| CredentialError::AddressParse {
            output: output.to_owned(),
        })
}

fn destroy_key_files<F: KeyFileSystem + ?Sized>(
    files: &F,
    keys: &KeyPaths,
) -> Result<(), CleanupError> {
    let mut failures = Vec::new();
    for path in [keys.private_key(), keys.public_key()] {
        match files.remove_file(path) {
            Ok(()) => debug!(%path, "removed key file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(%path, "key file was never written");
            }
            Err(err) => failures.push(CleanupFailure {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CleanupError { failures })
    }
}
