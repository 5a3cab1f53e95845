//! Error types for credential generation, funding, and cleanup.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::classify::StepKind;
use crate::process::ProcessError;

/// Errors that abort credential generation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CredentialError {
    /// Raised when the tool's keygen output classifies as a failure.
    #[error("key generation failed: {reason}")]
    Keygen {
        /// Classifier reason text.
        reason: String,
    },
    /// Raised when the tool's address lookup output classifies as a failure.
    #[error("address lookup failed: {reason}")]
    AddressLookup {
        /// Classifier reason text.
        reason: String,
    },
    /// Raised when lookup output lacks the quoted hex address.
    #[error("failed to parse address from lookup output: {output}")]
    AddressParse {
        /// Raw lookup output.
        output: String,
    },
    /// Raised when the private key file cannot be read back.
    #[error("failed to read private key {path}: {message}")]
    ReadKey {
        /// Path of the private key file.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a step's process could not run to completion.
    #[error("{step} step could not run: {source}")]
    Process {
        /// Step that was running.
        step: StepKind,
        /// Underlying runner error.
        #[source]
        source: ProcessError,
    },
}

/// Non-fatal funding failure; logged and swallowed by the orchestrator.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FundingError {
    /// Raised when the faucet command could not run to completion.
    #[error("faucet command could not run: {0}")]
    Process(#[source] ProcessError),
    /// Raised when the faucet output classifies as a failure.
    #[error("faucet rejected funding: {reason}")]
    Rejected {
        /// Classifier reason text.
        reason: String,
    },
}

/// A key file that could not be removed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CleanupFailure {
    /// File that remains on disk.
    pub path: Utf8PathBuf,
    /// Operating system error string.
    pub message: String,
}

/// Non-fatal cleanup failure; logged, never escalated.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to remove key files: {}", render_failures(.failures))]
pub struct CleanupError {
    /// Every file that could not be removed.
    pub failures: Vec<CleanupFailure>,
}

fn render_failures(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{} ({})", failure.path, failure.message))
        .collect::<Vec<_>>()
        .join(", ")
}
