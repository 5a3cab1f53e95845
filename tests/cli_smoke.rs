//! Behavioural smoke test for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("movedeploy");
    cmd.assert()
        .failure()
        .stdout("")
        .stderr(contains("Usage: movedeploy"));
}

#[test]
fn help_lists_both_subcommands() {
    let mut cmd = cargo_bin_cmd!("movedeploy");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("deploy").and(contains("compile-check")));
}

#[test]
fn count_must_be_positive() {
    let mut cmd = cargo_bin_cmd!("movedeploy");
    cmd.args(["deploy", "--count", "0"])
        .assert()
        .failure()
        .stderr(contains("--count"));
}
