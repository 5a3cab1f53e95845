//! JSON envelopes returned to callers.

use serde::Serialize;

use super::{DeployError, DeploymentRecord};

/// Message attached to every successful deployment.
pub const DEPLOYED_MESSAGE: &str = "Contract deployed successfully";

/// Public and private parts of the deploying account.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    /// Account address, `0x`-prefixed.
    pub address: String,
    /// Private key handed back to the caller.
    pub private_key: String,
}

/// Envelope for a deploy request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    /// Whether the deployment succeeded.
    pub success: bool,
    /// Fixed success message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Deploying account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountView>,
    /// Raw tool output from publication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_output: Option<String>,
    /// Explorer page for the account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<DeploymentRecord, DeployError>> for DeployResponse {
    fn from(result: &Result<DeploymentRecord, DeployError>) -> Self {
        match result {
            Ok(record) => Self {
                success: true,
                message: Some(DEPLOYED_MESSAGE.to_owned()),
                account: Some(AccountView {
                    address: record.address.clone(),
                    private_key: record.private_key.clone(),
                }),
                deployment_output: Some(record.deploy_output.clone()),
                explorer_url: Some(record.explorer_url.clone()),
                error: None,
            },
            Err(err) => Self {
                success: false,
                message: None,
                account: None,
                deployment_output: None,
                explorer_url: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Envelope for a compile check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    /// Whether the package compiled.
    pub success: bool,
    /// Compiler output on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<String, DeployError>> for CompileResponse {
    fn from(result: &Result<String, DeployError>) -> Self {
        match result {
            Ok(output) => Self {
                success: true,
                output: Some(output.clone()),
                error: None,
            },
            Err(err) => Self {
                success: false,
                output: None,
                error: Some(err.to_string()),
            },
        }
    }
}
