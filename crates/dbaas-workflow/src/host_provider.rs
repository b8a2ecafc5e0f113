//! Host provider integration.
//!
//! The host provider is the external API that owns VM lifecycle. Each action
//! is one `POST {endpoint}/{project}/{environment}/host/{action}` with body
//! `{"host_id": <identifier>}` and basic auth from the environment's
//! `HOST_PROVIDER` credential.
//!
//! [`HostProviderTransport`] sends exactly one request and returns the raw
//! response. [`Provider`] builds the request and turns the response into a
//! verdict: 200 is success, anything else is an error carrying the response.
//! Retries belong to the pipeline, never to this module.

use crate::credentials::CredentialResolver;
use crate::error::HostProviderError;
use async_trait::async_trait;
use dbaas_core::{Credential, CredentialType, Environment, Host, HostProviderConfig, Instance};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// VM lifecycle action, mapped to the last URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostAction {
    Start,
    Stop,
}

impl HostAction {
    pub fn path(&self) -> &'static str {
        match self {
            HostAction::Start => "start",
            HostAction::Stop => "stop",
        }
    }
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// One outbound provider call.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub url: String,
    pub body: serde_json::Value,
    user: String,
    password: String,
}

impl ProviderRequest {
    pub fn new(
        url: impl Into<String>,
        body: serde_json::Value,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            body,
            user: user.into(),
            password: password.into(),
        }
    }

    /// Basic auth pair `(user, password)`.
    pub fn auth(&self) -> (&str, &str) {
        (&self.user, &self.password)
    }
}

impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRequest")
            .field("url", &self.url)
            .field("body", &self.body)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Raw provider answer, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn action_status(&self) -> ActionStatus {
        ActionStatus::from_status(self.status)
    }
}

/// Classification of a provider status code.
///
/// Only 200 counts as success. Steps currently treat both error classes the
/// same way; the split is kept so callers can tell them apart in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Success,
    ClientError,
    ServerError,
}

impl ActionStatus {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => ActionStatus::Success,
            500..=599 => ActionStatus::ServerError,
            _ => ActionStatus::ClientError,
        }
    }
}

/// Sends one request to the host provider.
#[async_trait]
pub trait HostProviderTransport: Send + Sync {
    async fn post(&self, request: &ProviderRequest) -> Result<ProviderResponse, HostProviderError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HostProviderConfig) -> Result<Self, HostProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HostProviderTransport for ReqwestTransport {
    async fn post(&self, request: &ProviderRequest) -> Result<ProviderResponse, HostProviderError> {
        let (user, password) = request.auth();
        let response = self
            .client
            .post(&request.url)
            .basic_auth(user, Some(password))
            .json(&request.body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ProviderResponse { status, body })
    }
}

/// Host provider actions for one instance in one environment.
pub struct Provider {
    instance: Instance,
    environment: Environment,
    credentials: Arc<dyn CredentialResolver>,
    transport: Arc<dyn HostProviderTransport>,
}

impl Provider {
    pub fn new(
        instance: Instance,
        environment: Environment,
        credentials: Arc<dyn CredentialResolver>,
        transport: Arc<dyn HostProviderTransport>,
    ) -> Self {
        Self {
            instance,
            environment,
            credentials,
            transport,
        }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The host the instance runs on.
    pub fn host(&self) -> Result<&Host, HostProviderError> {
        self.instance
            .hostname
            .as_ref()
            .ok_or_else(|| HostProviderError::HostNotBound {
                instance: self.instance.name.clone(),
            })
    }

    async fn credential(&self) -> Result<Credential, HostProviderError> {
        self.credentials
            .get_credentials(CredentialType::HostProvider, &self.environment)
            .await
            .map_err(HostProviderError::CredentialLookup)?
            .ok_or_else(|| HostProviderError::CredentialNotFound {
                integration_type: CredentialType::HostProvider,
                environment: self.environment.name.clone(),
            })
    }

    /// Build the request for `action`. Credentials are resolved on every call.
    pub async fn build_request(
        &self,
        action: HostAction,
    ) -> Result<ProviderRequest, HostProviderError> {
        let host = self.host()?;
        let credential = self.credential().await?;

        let url = format!(
            "{}/{}/{}/host/{}",
            credential.endpoint.trim_end_matches('/'),
            credential.project,
            self.environment.name,
            action.path()
        );
        let body = serde_json::json!({ "host_id": host.identifier });

        Ok(ProviderRequest::new(
            url,
            body,
            credential.user,
            credential.password,
        ))
    }

    /// Send `action` and return the raw response, whatever its status.
    pub async fn request(&self, action: HostAction) -> Result<ProviderResponse, HostProviderError> {
        let request = self.build_request(action).await?;
        tracing::info!(
            action = %action,
            url = %request.url,
            instance = %self.instance.name,
            "Calling host provider"
        );

        let response = self.transport.post(&request).await?;
        tracing::debug!(action = %action, status = response.status, "Host provider answered");
        Ok(response)
    }

    /// Start the instance's VM. Returns `true` when the provider answers 200.
    pub async fn start(&self) -> Result<bool, HostProviderError> {
        let response = self.request(HostAction::Start).await?;
        match response.action_status() {
            ActionStatus::Success => Ok(true),
            ActionStatus::ClientError | ActionStatus::ServerError => {
                tracing::error!(status = response.status, body = %response.body, "Host start failed");
                Err(HostProviderError::StartVm {
                    host: self.host()?.hostname.clone(),
                    response,
                })
            }
        }
    }

    /// Stop the instance's VM. Returns `true` when the provider answers 200.
    pub async fn stop(&self) -> Result<bool, HostProviderError> {
        let response = self.request(HostAction::Stop).await?;
        match response.action_status() {
            ActionStatus::Success => Ok(true),
            ActionStatus::ClientError | ActionStatus::ServerError => {
                tracing::error!(status = response.status, body = %response.body, "Host stop failed");
                Err(HostProviderError::StopVm {
                    host: self.host()?.hostname.clone(),
                    response,
                })
            }
        }
    }
}
