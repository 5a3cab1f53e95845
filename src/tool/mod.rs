//! Argument construction for the `aptos` command-line tool.
//!
//! Each pipeline step maps to one subcommand. Paths are passed as discrete
//! arguments, never through a shell, so package directories containing spaces
//! or quotes need no escaping.

use std::time::Duration;

use camino::Utf8Path;

use crate::classify::StepKind;
use crate::process::CommandInvocation;

/// Default `aptos` executable name.
pub const DEFAULT_APTOS_BIN: &str = "aptos";

/// Default full node used for lookups, funding, and publication.
pub const DEFAULT_NODE_URL: &str = "https://fullnode.devnet.aptoslabs.com";

/// Per-step process deadlines.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StepTimeouts {
    /// Deadline for key generation.
    pub keygen: Duration,
    /// Deadline for address lookup.
    pub address_lookup: Duration,
    /// Deadline for faucet funding.
    pub fund: Duration,
    /// Deadline for package publication.
    pub publish: Duration,
    /// Deadline for compile-only checks.
    pub compile: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            keygen: Duration::from_secs(30),
            address_lookup: Duration::from_secs(30),
            fund: Duration::from_secs(60),
            publish: Duration::from_secs(120),
            compile: Duration::from_secs(120),
        }
    }
}

impl StepTimeouts {
    /// Deadline that applies to `step`.
    #[must_use]
    pub const fn for_step(&self, step: StepKind) -> Duration {
        match step {
            StepKind::Keygen => self.keygen,
            StepKind::AddressLookup => self.address_lookup,
            StepKind::Fund => self.fund,
            StepKind::Publish => self.publish,
            StepKind::Compile => self.compile,
        }
    }

    /// Applies the same deadline to every step.
    #[must_use]
    pub const fn uniform(timeout: Duration) -> Self {
        Self {
            keygen: timeout,
            address_lookup: timeout,
            fund: timeout,
            publish: timeout,
            compile: timeout,
        }
    }
}

/// Builds [`CommandInvocation`]s for the `aptos` CLI.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AptosCli {
    bin: String,
    node_url: String,
    faucet_url: Option<String>,
    timeouts: StepTimeouts,
}

impl Default for AptosCli {
    fn default() -> Self {
        Self::new(DEFAULT_APTOS_BIN, DEFAULT_NODE_URL)
    }
}

impl AptosCli {
    /// Creates a builder targeting `node_url` with `bin` as the executable.
    #[must_use]
    pub fn new(bin: impl Into<String>, node_url: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            node_url: node_url.into(),
            faucet_url: None,
            timeouts: StepTimeouts::default(),
        }
    }

    /// Uses an explicit faucet endpoint when funding.
    #[must_use]
    pub fn with_faucet_url(mut self, faucet_url: Option<String>) -> Self {
        self.faucet_url = faucet_url;
        self
    }

    /// Overrides the per-step deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: StepTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Executable used for every step.
    #[must_use]
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Per-step deadlines.
    #[must_use]
    pub const fn timeouts(&self) -> &StepTimeouts {
        &self.timeouts
    }

    fn base(&self, step: StepKind) -> CommandInvocation {
        CommandInvocation::new(self.bin.clone(), self.timeouts.for_step(step))
    }

    /// `aptos key generate`; the tool also writes `<private_key>.pub`.
    #[must_use]
    pub fn keygen(&self, private_key: &Utf8Path) -> CommandInvocation {
        self.base(StepKind::Keygen)
            .args(["key", "generate", "--output-file"])
            .arg(private_key.as_str())
            .arg("--assume-yes")
    }

    /// `aptos account lookup-address` for a public key file.
    #[must_use]
    pub fn lookup_address(&self, public_key: &Utf8Path) -> CommandInvocation {
        self.base(StepKind::AddressLookup)
            .args(["account", "lookup-address", "--public-key-file"])
            .arg(public_key.as_str())
            .arg("--url")
            .arg(self.node_url.as_str())
    }

    /// `aptos account fund-with-faucet` for `address`.
    #[must_use]
    pub fn fund(&self, address: &str) -> CommandInvocation {
        let invocation = self
            .base(StepKind::Fund)
            .args(["account", "fund-with-faucet", "--account"])
            .arg(address)
            .arg("--url")
            .arg(self.node_url.as_str());
        match &self.faucet_url {
            Some(faucet) => invocation.arg("--faucet-url").arg(faucet.as_str()),
            None => invocation,
        }
    }

    /// `aptos move publish` signed with `private_key`.
    #[must_use]
    pub fn publish(&self, package_dir: &Utf8Path, private_key: &Utf8Path) -> CommandInvocation {
        self.base(StepKind::Publish)
            .args(["move", "publish", "--package-dir"])
            .arg(package_dir.as_str())
            .arg("--private-key-file")
            .arg(private_key.as_str())
            .arg("--url")
            .arg(self.node_url.as_str())
            .arg("--assume-yes")
    }

    /// `aptos move compile`; needs no credential.
    #[must_use]
    pub fn compile(&self, package_dir: &Utf8Path) -> CommandInvocation {
        self.base(StepKind::Compile)
            .args(["move", "compile", "--package-dir"])
            .arg(package_dir.as_str())
    }
}
