//! Error taxonomy for deployments and compile checks.

use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::classify::StepKind;
use crate::credential::CredentialError;
use crate::process::ProcessError;

/// Coarse category of a [`DeployError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The tool could not be started or its output could not be collected.
    LaunchFailed,
    /// A step outlived its deadline.
    TimeoutExceeded,
    /// An address or key could not be extracted.
    ParseError,
    /// The classifier judged the tool's own output a failure.
    ClassifiedFailure,
    /// The request itself was unusable.
    InvalidInput,
}

/// Fatal deployment failures. Every variant aborts the remaining steps.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DeployError {
    /// Raised when keypair generation is classified as a failure.
    #[error("key generation failed: {reason}")]
    KeygenFailed {
        /// Classifier reason text.
        reason: String,
    },
    /// Raised when address lookup is classified as a failure.
    #[error("address lookup failed: {reason}")]
    AddressLookupFailed {
        /// Classifier reason text.
        reason: String,
    },
    /// Raised when lookup output carries no recognisable address.
    #[error("failed to parse address from lookup output: {output}")]
    ParseError {
        /// Raw lookup output.
        output: String,
    },
    /// Raised when publication is classified as a failure.
    #[error("publish failed: {reason}")]
    PublishFailed {
        /// Classifier reason text, usually the tool's stderr.
        reason: String,
    },
    /// Raised when a compile check is classified as a failure.
    #[error("compilation failed: {reason}")]
    CompileFailed {
        /// Classifier reason text.
        reason: String,
    },
    /// Raised when the tool cannot be launched for a step.
    #[error("{step} step could not run: {source}")]
    LaunchFailed {
        /// Step that was starting.
        step: StepKind,
        /// Underlying runner error.
        #[source]
        source: ProcessError,
    },
    /// Raised when a step exceeds its deadline.
    #[error("{step} step timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Step that was killed.
        step: StepKind,
        /// Deadline that was exceeded.
        timeout: Duration,
    },
    /// Raised when generated key material cannot be read back.
    #[error(transparent)]
    Credential(CredentialError),
    /// Raised when the package directory cannot be opened.
    #[error("package directory {path} is not usable: {message}")]
    InvalidPackage {
        /// Requested package directory.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
}

impl DeployError {
    /// Maps a runner failure during `step` onto the taxonomy.
    #[must_use]
    pub fn from_process(step: StepKind, source: ProcessError) -> Self {
        match source {
            ProcessError::Timeout { timeout, .. } => Self::Timeout { step, timeout },
            other => Self::LaunchFailed {
                step,
                source: other,
            },
        }
    }

    /// Category used by callers that only care about the failure class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::KeygenFailed { .. }
            | Self::AddressLookupFailed { .. }
            | Self::PublishFailed { .. }
            | Self::CompileFailed { .. } => ErrorKind::ClassifiedFailure,
            Self::ParseError { .. } | Self::Credential(_) => ErrorKind::ParseError,
            Self::LaunchFailed { .. } => ErrorKind::LaunchFailed,
            Self::Timeout { .. } => ErrorKind::TimeoutExceeded,
            Self::InvalidPackage { .. } => ErrorKind::InvalidInput,
        }
    }
}

impl From<CredentialError> for DeployError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Keygen { reason } => Self::KeygenFailed { reason },
            CredentialError::AddressLookup { reason } => Self::AddressLookupFailed { reason },
            CredentialError::AddressParse { output } => Self::ParseError { output },
            CredentialError::Process { step, source } => Self::from_process(step, source),
            read @ CredentialError::ReadKey { .. } => Self::Credential(read),
        }
    }
}
