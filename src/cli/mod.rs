//! Command-line interface definitions for the `movedeploy` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `movedeploy` binary.
#[derive(Debug, Parser)]
#[command(
    name = "movedeploy",
    about = "Publish Move packages to Aptos with throwaway, self-cleaning accounts",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Generate an account, fund it, and publish a package.
    #[command(name = "deploy", about = "Generate an account, fund it, and publish a package")]
    Deploy(DeployCommand),
    /// Compile a package without publishing it.
    #[command(name = "compile-check", about = "Compile a package without publishing it")]
    CompileCheck(CompileCheckCommand),
}

/// Arguments for the `movedeploy deploy` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct DeployCommand {
    /// Move package directory. Defaults to the configured `package_dir`.
    #[arg(long, value_name = "DIR")]
    pub(crate) package_dir: Option<String>,
    /// Reuse one standing account for every deployment in this run.
    ///
    /// The account's key files are kept until the run ends and erased
    /// before exit, including on interrupt.
    #[arg(long)]
    pub(crate) standing: bool,
    /// Number of sequential deployments to perform.
    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub(crate) count: u32,
}

/// Arguments for the `movedeploy compile-check` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CompileCheckCommand {
    /// Move package directory. Defaults to the configured `package_dir`.
    #[arg(long, value_name = "DIR")]
    pub(crate) package_dir: Option<String>,
}
