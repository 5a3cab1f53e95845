//! Shared fixtures for deployment scenarios.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use movedeploy::test_support::{MemoryKeyFiles, ScriptedRunner};
use movedeploy::{
    AptosCli, CredentialManager, CredentialSettings, CredentialStrategy, DeployError,
    DeployOrchestrator, DeploymentRecord, Explorer, StandingAccount,
};
use rstest::fixture;
use tempfile::TempDir;

use crate::test_constants::{ACCOUNT_HEX, SUCCESSFUL_PUBLISH};

pub type Orchestrator = DeployOrchestrator<ScriptedRunner, MemoryKeyFiles>;

pub type DeployResult = Result<DeploymentRecord, DeployError>;

/// Scripted tool, in-memory key store, and the results of each deployment.
///
/// The standing account slot outlives individual orchestrators, so a
/// scenario can build one per step and still share a single account.
pub struct DeployContext {
    pub runner: ScriptedRunner,
    pub files: MemoryKeyFiles,
    strategy: Cell<CredentialStrategy>,
    standing: Arc<StandingAccount>,
    results: RefCell<Vec<DeployResult>>,
    package: TempDir,
}

impl DeployContext {
    pub fn new(strategy: CredentialStrategy) -> Self {
        Self {
            runner: ScriptedRunner::new(),
            files: MemoryKeyFiles::default(),
            strategy: Cell::new(strategy),
            standing: Arc::new(StandingAccount::new()),
            results: RefCell::new(Vec::new()),
            package: TempDir::new()
                .unwrap_or_else(|err| panic!("create package directory: {err}")),
        }
    }

    pub fn use_strategy(&self, strategy: CredentialStrategy) {
        self.strategy.set(strategy);
    }

    pub fn orchestrator(&self) -> Orchestrator {
        let manager = CredentialManager::new(
            AptosCli::default(),
            self.runner.clone(),
            self.files.clone(),
        )
        .with_settings(CredentialSettings {
            key_dir: Utf8PathBuf::from("/tmp/movedeploy-keys"),
            fund_settle: Duration::ZERO,
        });
        DeployOrchestrator::new(manager, Explorer::default())
            .with_strategy(self.strategy.get())
            .with_standing_account(Arc::clone(&self.standing))
    }

    pub fn package_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.package.path().to_path_buf())
            .unwrap_or_else(|path| panic!("package directory is not UTF-8: {}", path.display()))
    }

    pub fn record(&self, result: DeployResult) {
        self.results.borrow_mut().push(result);
    }

    pub fn results(&self) -> Vec<DeployResult> {
        self.results.borrow().clone()
    }

    /// Queues keygen, lookup, funding, and publish outputs for a clean run.
    pub fn script_happy_path(&self) {
        self.runner.push_generated_account(ACCOUNT_HEX);
        self.script_fund_and_publish();
    }

    pub fn script_fund_and_publish(&self) {
        self.runner.push_success("{\"Result\": \"funded\"}");
        self.runner.push_success(SUCCESSFUL_PUBLISH);
    }

    /// Key file pairs named by every keygen invocation so far.
    pub fn generated_keys(&self) -> Vec<(Utf8PathBuf, Utf8PathBuf)> {
        self.runner
            .invocations_with("generate")
            .iter()
            .map(|invocation| {
                let private = invocation
                    .flag_value("--output-file")
                    .unwrap_or_else(|| panic!("keygen should name its output file"));
                let public = format!("{private}.pub");
                (Utf8PathBuf::from(private), Utf8PathBuf::from(public))
            })
            .collect()
    }

    /// Asserts every generated key file was removed exactly once.
    pub fn assert_keys_erased_once(&self) {
        let keys = self.generated_keys();
        assert!(!keys.is_empty(), "no keys were generated");
        for (private, public) in &keys {
            assert_eq!(self.files.removal_count(private), 1, "{private}");
            assert_eq!(self.files.removal_count(public), 1, "{public}");
        }
        assert_eq!(self.files.removed().len(), keys.len() * 2);
    }

    /// Subcommand of each invocation, in order.
    pub fn subcommands(&self) -> Vec<String> {
        self.runner
            .invocations()
            .iter()
            .filter_map(|invocation| {
                invocation
                    .arguments()
                    .get(1)
                    .map(|arg| arg.to_string_lossy().into_owned())
            })
            .collect()
    }
}

#[fixture]
pub fn deploy_context() -> DeployContext {
    DeployContext::new(CredentialStrategy::PerCall)
}

#[fixture]
pub fn standing() -> DeployContext {
    DeployContext::new(CredentialStrategy::Standing)
}
