//! BDD scenarios for the deployment pipeline.

use rstest_bdd_macros::scenario;

use super::test_helpers::{DeployContext, deploy_context};

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Funding failure does not stop the deployment"
)]
fn scenario_funding_failure_swallowed(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Unmarked non-zero publish exit counts as success"
)]
fn scenario_optimistic_publish(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Unparseable address aborts before funding"
)]
fn scenario_unparseable_address(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Publish failure markers surface the tool's stderr"
)]
fn scenario_publish_failure_marker(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Publish timeout is fatal"
)]
fn scenario_publish_timeout(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Funding timeout is fatal"
)]
fn scenario_funding_timeout(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Missing publish tool is a launch failure"
)]
fn scenario_publish_launch_failure(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Key generation failure skips every later step"
)]
fn scenario_keygen_failure(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Standing account is reused until shutdown"
)]
fn scenario_standing_reuse(deploy_context: DeployContext) {
    drop(deploy_context);
}

#[scenario(
    path = "tests/features/deploy.feature",
    name = "Failed standing initialisation is retried"
)]
fn scenario_standing_retry(deploy_context: DeployContext) {
    drop(deploy_context);
}
