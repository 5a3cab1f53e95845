//! Core library for the `movedeploy` Move package deployment tool.
//!
//! The crate drives the `aptos` command-line tool through a short, strictly
//! ordered pipeline (generate a throwaway account → resolve its address →
//! fund it → publish) and guarantees that generated key files never outlive
//! the deployment that created them. Tool output is classified by ordered
//! heuristics because the tool's exit codes cannot be trusted.

pub mod classify;
pub mod config;
pub mod credential;
pub mod deploy;
pub mod process;
pub mod test_support;
pub mod tool;

pub use classify::{
    Classification, ClassifierRules, MatchedRule, Outcome, RuleBook, StepKind, classify,
    classify_detailed,
};
pub use config::{ConfigError, DeployConfig};
pub use credential::{
    AccountCredential, CleanupError, CredentialError, CredentialGuard, CredentialManager,
    CredentialSettings, FundingError, HostKeyFiles, KeyFileGuard, KeyFileSystem, KeyPaths,
};
pub use deploy::{
    CompileResponse, CredentialStrategy, DeployError, DeployOrchestrator, DeployResponse,
    DeploymentRecord, ErrorKind, Explorer, StandingAccount,
};
pub use process::{
    CommandInvocation, CommandOutput, CommandRunner, ProcessCommandRunner, ProcessError,
};
pub use tool::{AptosCli, StepTimeouts};
