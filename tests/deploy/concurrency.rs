//! Cancellation and concurrent initialisation, which need async control the
//! feature file cannot express.

use std::time::Duration;

use movedeploy::test_support::FAKE_PRIVATE_KEY;
use rstest::rstest;

use super::test_helpers::{DeployContext, deploy_context, standing};
use crate::test_constants::{ACCOUNT_ADDRESS, ACCOUNT_HEX};

#[rstest]
#[tokio::test]
async fn abandoned_deployment_still_erases_key_files(deploy_context: DeployContext) {
    deploy_context.runner.push_generated_account(ACCOUNT_HEX);
    deploy_context.runner.push_success("{\"Result\": \"funded\"}");
    deploy_context.runner.push_hang();

    let orchestrator = deploy_context.orchestrator();
    let package_dir = deploy_context.package_dir();
    let outcome =
        tokio::time::timeout(Duration::from_millis(50), orchestrator.deploy(&package_dir)).await;

    assert!(outcome.is_err(), "deployment should have been abandoned");
    deploy_context.assert_keys_erased_once();
}

#[rstest]
#[tokio::test]
async fn concurrent_standing_initialisation_generates_one_account(standing: DeployContext) {
    standing.runner.push_generated_account(ACCOUNT_HEX);
    let orchestrator = standing.orchestrator();
    let account = orchestrator.standing_account();
    let manager = orchestrator.credentials();

    let (first_result, second_result) =
        tokio::join!(account.get_or_init(manager), account.get_or_init(manager));

    let first = first_result.expect("first initialiser");
    let second = second_result.expect("second initialiser");
    assert_eq!(first, second);
    assert_eq!(first.address, ACCOUNT_ADDRESS);
    assert_eq!(standing.generated_keys().len(), 1);
    assert!(standing.files.removed().is_empty());
}

#[rstest]
#[tokio::test]
async fn concurrent_standing_deployments_share_the_account(standing: DeployContext) {
    standing.script_happy_path();
    standing.script_fund_and_publish();
    let orchestrator = standing.orchestrator();
    let package_dir = standing.package_dir();

    let (first, second) = tokio::join!(
        orchestrator.deploy(&package_dir),
        orchestrator.deploy(&package_dir)
    );

    let first_record = first.expect("first deployment");
    let second_record = second.expect("second deployment");
    assert_eq!(first_record.address, second_record.address);
    assert_eq!(first_record.private_key, FAKE_PRIVATE_KEY);
    assert_eq!(second_record.private_key, FAKE_PRIVATE_KEY);
    assert_eq!(standing.generated_keys().len(), 1);
    assert!(standing.files.removed().is_empty());

    orchestrator.shutdown().await;
    standing.assert_keys_erased_once();
}
