//! BDD step definitions for `movedeploy deploy`.

use std::time::Duration;

use movedeploy::process::ProcessError;
use movedeploy::{CredentialStrategy, ErrorKind};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{DeployContext, DeployResult};
use crate::test_constants::{ACCOUNT_HEX, SUCCESSFUL_PUBLISH};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a per-call deployment service")]
fn per_call_service(deploy_context: &DeployContext) {
    deploy_context.use_strategy(CredentialStrategy::PerCall);
}

#[given("a standing deployment service")]
fn standing_service(deploy_context: &DeployContext) {
    deploy_context.use_strategy(CredentialStrategy::Standing);
}

#[given("key generation and address lookup succeed")]
fn account_generation_succeeds(deploy_context: &DeployContext) {
    deploy_context.runner.push_generated_account(ACCOUNT_HEX);
}

#[given("key generation succeeds")]
fn keygen_succeeds(deploy_context: &DeployContext) {
    deploy_context
        .runner
        .push_success("{\"Result\": \"Keys written\"}");
}

#[given("key generation fails with \"{stderr}\"")]
fn keygen_fails(deploy_context: &DeployContext, stderr: String) {
    deploy_context.runner.push_output(Some(1), "", stderr);
}

#[given("the address lookup prints \"{stdout}\"")]
fn lookup_prints(deploy_context: &DeployContext, stdout: String) {
    deploy_context.runner.push_success(stdout);
}

#[given("funding succeeds")]
fn funding_succeeds(deploy_context: &DeployContext) {
    deploy_context.runner.push_success("{\"Result\": \"funded\"}");
}

#[given("the faucet rejects funding with \"{stderr}\"")]
fn faucet_rejects(deploy_context: &DeployContext, stderr: String) {
    deploy_context.runner.push_output(Some(1), "", stderr);
}

#[given("funding times out after \"{seconds}\" seconds")]
fn funding_times_out(deploy_context: &DeployContext, seconds: u64) {
    push_timeout(deploy_context, seconds);
}

#[given("publishing succeeds")]
fn publishing_succeeds(deploy_context: &DeployContext) {
    deploy_context.runner.push_success(SUCCESSFUL_PUBLISH);
}

#[given("publishing exits with status \"{code}\" and stderr \"{stderr}\"")]
fn publishing_exits(deploy_context: &DeployContext, code: i32, stderr: String) {
    deploy_context.runner.push_output(Some(code), "", stderr);
}

#[given("publishing reports \"{stderr}\" on stderr")]
fn publishing_reports(deploy_context: &DeployContext, stderr: String) {
    deploy_context.runner.push_output(Some(0), "", stderr);
}

#[given("publishing times out after \"{seconds}\" seconds")]
fn publishing_times_out(deploy_context: &DeployContext, seconds: u64) {
    push_timeout(deploy_context, seconds);
}

#[given("the publish tool cannot be launched")]
fn publish_cannot_launch(deploy_context: &DeployContext) {
    deploy_context.runner.push_launch_failure("aptos");
}

fn push_timeout(deploy_context: &DeployContext, seconds: u64) {
    deploy_context.runner.push_error(ProcessError::Timeout {
        program: String::from("aptos"),
        timeout: Duration::from_secs(seconds),
    });
}

#[when("I deploy the package")]
fn deploy_package(deploy_context: &DeployContext) -> Result<(), StepError> {
    let runtime = Runtime::new()?;
    let orchestrator = deploy_context.orchestrator();
    let package_dir = deploy_context.package_dir();
    let result = runtime.block_on(async { orchestrator.deploy(&package_dir).await });
    deploy_context.record(result);
    Ok(())
}

#[when("the service shuts down twice")]
fn shut_down_twice(deploy_context: &DeployContext) -> Result<(), StepError> {
    let runtime = Runtime::new()?;
    let orchestrator = deploy_context.orchestrator();
    runtime.block_on(async {
        orchestrator.shutdown().await;
        orchestrator.shutdown().await;
    });
    Ok(())
}

#[then("the deployment succeeds for address \"{address}\"")]
fn deployment_succeeds(deploy_context: &DeployContext, address: String) -> Result<(), StepError> {
    match last_result(deploy_context)? {
        Ok(record) if record.address == address => Ok(()),
        Ok(record) => Err(StepError::Assertion(format!(
            "expected address {address}, got {}",
            record.address
        ))),
        Err(err) => Err(StepError::Assertion(format!(
            "expected success, got failure: {err}"
        ))),
    }
}

#[then("the explorer link points at the account")]
fn explorer_link(deploy_context: &DeployContext) -> Result<(), StepError> {
    let record = last_result(deploy_context)?
        .map_err(|err| StepError::Assertion(format!("expected success, got {err}")))?;
    let expected = format!(
        "https://explorer.aptoslabs.com/account/{}?network=devnet",
        record.address
    );
    if record.explorer_url == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected explorer link {expected}, got {}",
            record.explorer_url
        )))
    }
}

#[then("the deployment output is \"{output}\"")]
fn deployment_output(deploy_context: &DeployContext, output: String) -> Result<(), StepError> {
    let record = last_result(deploy_context)?
        .map_err(|err| StepError::Assertion(format!("expected success, got {err}")))?;
    if record.deploy_output == output {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected output {output:?}, got {:?}",
            record.deploy_output
        )))
    }
}

#[then("the deployment fails with kind \"{kind}\"")]
fn deployment_fails(deploy_context: &DeployContext, kind: String) -> Result<(), StepError> {
    expect_failure_kind(&last_result(deploy_context)?, &kind)
}

#[then("the first deployment fails with kind \"{kind}\"")]
fn first_deployment_fails(deploy_context: &DeployContext, kind: String) -> Result<(), StepError> {
    let first = deploy_context
        .results()
        .into_iter()
        .next()
        .ok_or_else(|| StepError::Assertion(String::from("no deployment has run")))?;
    expect_failure_kind(&first, &kind)
}

#[then("the failure reads \"{message}\"")]
fn failure_reads(deploy_context: &DeployContext, message: String) -> Result<(), StepError> {
    match last_result(deploy_context)? {
        Err(err) if err.to_string() == message => Ok(()),
        Err(err) => Err(StepError::Assertion(format!(
            "expected failure {message:?}, got {:?}",
            err.to_string()
        ))),
        Ok(record) => Err(StepError::Assertion(format!(
            "expected failure, got deployment from {}",
            record.address
        ))),
    }
}

#[then("every deployment used address \"{address}\"")]
fn every_deployment_used(deploy_context: &DeployContext, address: String) -> Result<(), StepError> {
    let results = deploy_context.results();
    if results.is_empty() {
        return Err(StepError::Assertion(String::from("no deployment has run")));
    }
    for result in results {
        let record =
            result.map_err(|err| StepError::Assertion(format!("deployment failed: {err}")))?;
        if record.address != address {
            return Err(StepError::Assertion(format!(
                "expected address {address}, got {}",
                record.address
            )));
        }
    }
    Ok(())
}

#[then("the tool ran \"{subcommands}\"")]
fn tool_ran(deploy_context: &DeployContext, subcommands: String) -> Result<(), StepError> {
    let actual = deploy_context.subcommands().join(", ");
    if actual == subcommands {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected subcommands {subcommands}, got {actual}"
        )))
    }
}

#[then("the number of generated accounts is \"{count}\"")]
fn generated_accounts(deploy_context: &DeployContext, count: usize) -> Result<(), StepError> {
    let generated = deploy_context.generated_keys().len();
    if generated == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} generated accounts, got {generated}"
        )))
    }
}

#[then("the number of erased key files is \"{count}\"")]
fn erased_key_files(deploy_context: &DeployContext, count: usize) -> Result<(), StepError> {
    let erased = deploy_context.files.removed().len();
    if erased == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} erased key files, got {erased}"
        )))
    }
}

#[then("no key file has been erased")]
fn nothing_erased(deploy_context: &DeployContext) -> Result<(), StepError> {
    erased_key_files(deploy_context, 0)
}

#[then("every generated key file was erased once")]
fn keys_erased_once(deploy_context: &DeployContext) {
    deploy_context.assert_keys_erased_once();
}

fn last_result(deploy_context: &DeployContext) -> Result<DeployResult, StepError> {
    deploy_context
        .results()
        .pop()
        .ok_or_else(|| StepError::Assertion(String::from("no deployment has run")))
}

fn expect_failure_kind(result: &DeployResult, kind: &str) -> Result<(), StepError> {
    let expected = parse_kind(kind)?;
    match result {
        Err(err) if err.kind() == expected => Ok(()),
        Err(err) => Err(StepError::Assertion(format!(
            "expected failure kind {expected:?}, got {:?} ({err})",
            err.kind()
        ))),
        Ok(record) => Err(StepError::Assertion(format!(
            "expected failure, got deployment from {}",
            record.address
        ))),
    }
}

fn parse_kind(kind: &str) -> Result<ErrorKind, StepError> {
    match kind {
        "launch-failed" => Ok(ErrorKind::LaunchFailed),
        "timeout" => Ok(ErrorKind::TimeoutExceeded),
        "parse-error" => Ok(ErrorKind::ParseError),
        "classified-failure" => Ok(ErrorKind::ClassifiedFailure),
        "invalid-input" => Ok(ErrorKind::InvalidInput),
        other => Err(StepError::Assertion(format!("unknown failure kind: {other}"))),
    }
}
