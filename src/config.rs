//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::credential::CredentialSettings;
use crate::deploy::{
    CredentialStrategy, DEFAULT_EXPLORER_BASE_URL, DEFAULT_NETWORK, Explorer,
};
use crate::tool::{AptosCli, DEFAULT_APTOS_BIN, DEFAULT_NODE_URL, StepTimeouts};

/// Deployment settings derived from defaults, configuration files,
/// and environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "MOVEDEPLOY",
    discovery(
        app_name = "movedeploy",
        env_var = "MOVEDEPLOY_CONFIG_PATH",
        config_file_name = "movedeploy.toml",
        dotfile_name = ".movedeploy.toml",
        project_file_name = "movedeploy.toml"
    )
)]
pub struct DeployConfig {
    /// `aptos` executable name or path.
    #[ortho_config(default = DEFAULT_APTOS_BIN.to_owned())]
    pub aptos_bin: String,
    /// Full node REST endpoint.
    #[ortho_config(default = DEFAULT_NODE_URL.to_owned())]
    pub node_url: String,
    /// Faucet endpoint; the tool derives one from the node when unset.
    pub faucet_url: Option<String>,
    /// Network name used in explorer links.
    #[ortho_config(default = DEFAULT_NETWORK.to_owned())]
    pub network: String,
    /// Block explorer base URL.
    #[ortho_config(default = DEFAULT_EXPLORER_BASE_URL.to_owned())]
    pub explorer_base_url: String,
    /// Directory that receives generated key files.
    #[ortho_config(default = ".".to_owned())]
    pub key_dir: String,
    /// Move package deployed when no directory is given on the command line.
    #[ortho_config(default = "Volume".to_owned())]
    pub package_dir: String,
    /// `per-call` or `standing`.
    #[ortho_config(default = "per-call".to_owned())]
    pub credential_strategy: String,
    /// Keygen deadline in seconds.
    #[ortho_config(default = 30)]
    pub keygen_timeout_secs: u64,
    /// Address lookup deadline in seconds.
    #[ortho_config(default = 30)]
    pub lookup_timeout_secs: u64,
    /// Funding deadline in seconds.
    #[ortho_config(default = 60)]
    pub fund_timeout_secs: u64,
    /// Publish deadline in seconds.
    #[ortho_config(default = 120)]
    pub publish_timeout_secs: u64,
    /// Compile deadline in seconds.
    #[ortho_config(default = 120)]
    pub compile_timeout_secs: u64,
    /// Pause after each funding attempt, in milliseconds.
    #[ortho_config(default = 2000)]
    pub fund_settle_millis: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or add {} to movedeploy.toml",
            self.env_var, self.toml_key
        )
    }
}

impl DeployConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("movedeploy")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    fn require_timeout(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidTimeout(format!(
                "{} must be at least one second: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and configuration key that fix the problem.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for blank values,
    /// [`ConfigError::InvalidTimeout`] for zero deadlines, and
    /// [`ConfigError::UnknownStrategy`] for an unrecognised strategy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (
                &self.aptos_bin,
                FieldMetadata::new("aptos executable", "MOVEDEPLOY_APTOS_BIN", "aptos_bin"),
            ),
            (
                &self.node_url,
                FieldMetadata::new("node URL", "MOVEDEPLOY_NODE_URL", "node_url"),
            ),
            (
                &self.network,
                FieldMetadata::new("network name", "MOVEDEPLOY_NETWORK", "network"),
            ),
            (
                &self.explorer_base_url,
                FieldMetadata::new(
                    "explorer base URL",
                    "MOVEDEPLOY_EXPLORER_BASE_URL",
                    "explorer_base_url",
                ),
            ),
            (
                &self.key_dir,
                FieldMetadata::new("key directory", "MOVEDEPLOY_KEY_DIR", "key_dir"),
            ),
            (
                &self.package_dir,
                FieldMetadata::new("package directory", "MOVEDEPLOY_PACKAGE_DIR", "package_dir"),
            ),
        ];
        for (value, metadata) in &required {
            Self::require_field(value, metadata)?;
        }

        let timeouts = [
            (
                self.keygen_timeout_secs,
                FieldMetadata::new(
                    "keygen timeout",
                    "MOVEDEPLOY_KEYGEN_TIMEOUT_SECS",
                    "keygen_timeout_secs",
                ),
            ),
            (
                self.lookup_timeout_secs,
                FieldMetadata::new(
                    "address lookup timeout",
                    "MOVEDEPLOY_LOOKUP_TIMEOUT_SECS",
                    "lookup_timeout_secs",
                ),
            ),
            (
                self.fund_timeout_secs,
                FieldMetadata::new(
                    "funding timeout",
                    "MOVEDEPLOY_FUND_TIMEOUT_SECS",
                    "fund_timeout_secs",
                ),
            ),
            (
                self.publish_timeout_secs,
                FieldMetadata::new(
                    "publish timeout",
                    "MOVEDEPLOY_PUBLISH_TIMEOUT_SECS",
                    "publish_timeout_secs",
                ),
            ),
            (
                self.compile_timeout_secs,
                FieldMetadata::new(
                    "compile timeout",
                    "MOVEDEPLOY_COMPILE_TIMEOUT_SECS",
                    "compile_timeout_secs",
                ),
            ),
        ];
        for (value, metadata) in &timeouts {
            Self::require_timeout(*value, metadata)?;
        }

        self.strategy().map(drop)
    }

    /// Parsed credential strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStrategy`] when the name is not
    /// `per-call` or `standing`.
    pub fn strategy(&self) -> Result<CredentialStrategy, ConfigError> {
        self.credential_strategy.parse().map_err(|err| {
            ConfigError::UnknownStrategy(format!(
                "{err}: set MOVEDEPLOY_CREDENTIAL_STRATEGY or add credential_strategy to movedeploy.toml"
            ))
        })
    }

    /// Per-step process deadlines.
    #[must_use]
    pub const fn step_timeouts(&self) -> StepTimeouts {
        StepTimeouts {
            keygen: Duration::from_secs(self.keygen_timeout_secs),
            address_lookup: Duration::from_secs(self.lookup_timeout_secs),
            fund: Duration::from_secs(self.fund_timeout_secs),
            publish: Duration::from_secs(self.publish_timeout_secs),
            compile: Duration::from_secs(self.compile_timeout_secs),
        }
    }

    /// Argument builder for the configured tool and network.
    #[must_use]
    pub fn aptos_cli(&self) -> AptosCli {
        let faucet = self
            .faucet_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_owned);
        AptosCli::new(self.aptos_bin.trim(), self.node_url.trim())
            .with_faucet_url(faucet)
            .with_timeouts(self.step_timeouts())
    }

    /// Key directory and funding settle delay.
    #[must_use]
    pub fn credential_settings(&self) -> CredentialSettings {
        CredentialSettings {
            key_dir: Utf8PathBuf::from(self.key_dir.trim()),
            fund_settle: Duration::from_millis(self.fund_settle_millis),
        }
    }

    /// Explorer link builder.
    #[must_use]
    pub fn explorer(&self) -> Explorer {
        Explorer::new(self.explorer_base_url.trim(), self.network.trim())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a deadline of zero.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Indicates an unrecognised credential strategy.
    #[error("invalid credential strategy: {0}")]
    UnknownStrategy(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
