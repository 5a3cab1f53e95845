//! Deployment orchestration.
//!
//! One pipeline serves both credential strategies: acquire a credential,
//! fund it (best effort, though a funding timeout is fatal), publish the
//! package, and assemble a [`DeploymentRecord`]. With [`CredentialStrategy::PerCall`] the key files
//! are erased before [`DeployOrchestrator::deploy`] returns, whatever the
//! outcome. With [`CredentialStrategy::Standing`] they live until
//! [`DeployOrchestrator::shutdown`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::{info, warn};

use crate::classify::{Outcome, StepKind};
use crate::credential::{AccountCredential, CredentialManager, FundingError, KeyFileSystem};
use crate::process::{CommandRunner, ProcessError};

mod error;
mod response;
mod standing;

pub use error::{DeployError, ErrorKind};
pub use response::{AccountView, CompileResponse, DEPLOYED_MESSAGE, DeployResponse};
pub use standing::StandingAccount;

/// Default block explorer.
pub const DEFAULT_EXPLORER_BASE_URL: &str = "https://explorer.aptoslabs.com";

/// Default network name used in explorer links.
pub const DEFAULT_NETWORK: &str = "devnet";

/// How deployments obtain their signing account.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CredentialStrategy {
    /// Fresh keypair per deployment, erased when the deployment ends.
    #[default]
    PerCall,
    /// One account reused by every deployment until shutdown.
    Standing,
}

impl CredentialStrategy {
    /// Name accepted by [`FromStr`] and configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerCall => "per-call",
            Self::Standing => "standing",
        }
    }
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a strategy name is not recognised.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown credential strategy '{0}'; expected 'per-call' or 'standing'")]
pub struct UnknownStrategy(pub String);

impl FromStr for CredentialStrategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "per-call" => Ok(Self::PerCall),
            "standing" => Ok(Self::Standing),
            other => Err(UnknownStrategy(other.to_owned())),
        }
    }
}

/// Builds explorer links for deployed accounts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Explorer {
    base_url: String,
    network: String,
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new(DEFAULT_EXPLORER_BASE_URL, DEFAULT_NETWORK)
    }
}

impl Explorer {
    /// Creates a link builder for `network` on the explorer at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            network: network.into(),
        }
    }

    /// Page for `address`.
    #[must_use]
    pub fn account_url(&self, address: &str) -> String {
        format!(
            "{}/account/{address}?network={}",
            self.base_url.trim_end_matches('/'),
            self.network
        )
    }
}

/// Result of a successful deployment.
#[derive(Clone, Eq, PartialEq)]
pub struct DeploymentRecord {
    /// Deploying account address.
    pub address: String,
    /// Private key read back from the key file, trimmed.
    pub private_key: String,
    /// Raw publish output.
    pub deploy_output: String,
    /// Explorer page for the account.
    pub explorer_url: String,
}

impl fmt::Debug for DeploymentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentRecord")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("deploy_output", &self.deploy_output)
            .field("explorer_url", &self.explorer_url)
            .finish()
    }
}

/// Drives credential acquisition, funding, and publication.
#[derive(Debug)]
pub struct DeployOrchestrator<R: CommandRunner, F: KeyFileSystem> {
    credentials: CredentialManager<R, F>,
    explorer: Explorer,
    strategy: CredentialStrategy,
    standing: Arc<StandingAccount>,
}

impl<R: CommandRunner, F: KeyFileSystem> DeployOrchestrator<R, F> {
    /// Creates a per-call orchestrator.
    #[must_use]
    pub fn new(credentials: CredentialManager<R, F>, explorer: Explorer) -> Self {
        Self {
            credentials,
            explorer,
            strategy: CredentialStrategy::default(),
            standing: Arc::default(),
        }
    }

    /// Selects the credential strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: CredentialStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Shares `standing` with other orchestrators.
    #[must_use]
    pub fn with_standing_account(mut self, standing: Arc<StandingAccount>) -> Self {
        self.standing = standing;
        self
    }

    /// Active credential strategy.
    #[must_use]
    pub const fn strategy(&self) -> CredentialStrategy {
        self.strategy
    }

    /// Standing account slot, used when the strategy is
    /// [`CredentialStrategy::Standing`].
    #[must_use]
    pub const fn standing_account(&self) -> &Arc<StandingAccount> {
        &self.standing
    }

    /// Credential manager driving the tool.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialManager<R, F> {
        &self.credentials
    }

    /// Deploys the Move package in `package_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError`] when the package directory is unusable, when a
    /// credential cannot be produced, or when publication fails or times out.
    /// Funding failures are logged and never returned.
    pub async fn deploy(&self, package_dir: &Utf8Path) -> Result<DeploymentRecord, DeployError> {
        ensure_package(package_dir)?;
        info!(package = %package_dir, strategy = %self.strategy, "starting deployment");

        match self.strategy {
            CredentialStrategy::PerCall => {
                let guard = self.credentials.generate().await?;
                let result = self.deploy_with(guard.credential(), package_dir).await;
                if let Err(err) = guard.release() {
                    warn!(error = %err, "key file cleanup failed after deployment");
                }
                result
            }
            CredentialStrategy::Standing => {
                let credential = self.standing.get_or_init(&self.credentials).await?;
                self.deploy_with(&credential, package_dir).await
            }
        }
    }

    async fn deploy_with(
        &self,
        credential: &AccountCredential,
        package_dir: &Utf8Path,
    ) -> Result<DeploymentRecord, DeployError> {
        let address = credential.address.as_str();
        match self.credentials.fund(address).await {
            Ok(_) => {}
            Err(FundingError::Process(source @ ProcessError::Timeout { .. })) => {
                warn!(%address, "funding timed out; abandoning deployment");
                return Err(DeployError::from_process(StepKind::Fund, source));
            }
            Err(err) => {
                warn!(%address, error = %err, "funding failed; continuing to publish");
            }
        }

        let invocation = self
            .credentials
            .cli()
            .publish(package_dir, credential.private_key_path());
        let (_, classification) = self
            .credentials
            .run_step(StepKind::Publish, &invocation)
            .await
            .map_err(|source| DeployError::from_process(StepKind::Publish, source))?;
        let deploy_output = match classification.outcome {
            Outcome::Success { payload } => payload,
            Outcome::Failure { reason } => {
                warn!(%address, "publish classified as failure");
                return Err(DeployError::PublishFailed { reason });
            }
        };

        let private_key = self.credentials.read_private_key(credential)?;
        info!(%address, "deployment succeeded");
        Ok(DeploymentRecord {
            address: address.to_owned(),
            private_key,
            deploy_output,
            explorer_url: self.explorer.account_url(address),
        })
    }

    /// Compiles the package without a credential or any ledger change.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::CompileFailed`] when compiler output classifies
    /// as a failure, or a launch/timeout error from the runner.
    pub async fn compile_check(&self, package_dir: &Utf8Path) -> Result<String, DeployError> {
        ensure_package(package_dir)?;
        let invocation = self.credentials.cli().compile(package_dir);
        let (_, classification) = self
            .credentials
            .run_step(StepKind::Compile, &invocation)
            .await
            .map_err(|source| DeployError::from_process(StepKind::Compile, source))?;
        match classification.outcome {
            Outcome::Success { payload } => Ok(payload),
            Outcome::Failure { reason } => Err(DeployError::CompileFailed { reason }),
        }
    }

    /// Erases the standing account's key files, if any. Best effort.
    pub async fn shutdown(&self) {
        match self.standing.shutdown(&self.credentials).await {
            Ok(true) => info!("standing account shut down"),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "standing account cleanup failed"),
        }
    }
}

fn ensure_package(package_dir: &Utf8Path) -> Result<(), DeployError> {
    Dir::open_ambient_dir(package_dir, ambient_authority())
        .map(drop)
        .map_err(|err| DeployError::InvalidPackage {
            path: package_dir.to_path_buf(),
            message: err.to_string(),
        })
}
