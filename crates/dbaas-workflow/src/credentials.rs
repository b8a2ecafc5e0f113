//! Credential resolution.

use async_trait::async_trait;
use dbaas_core::{Credential, CredentialType, Environment};

/// Supplies integration credentials scoped to an environment.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// The credential of `integration_type` attached to `environment`, if any.
    async fn get_credentials(
        &self,
        integration_type: CredentialType,
        environment: &Environment,
    ) -> anyhow::Result<Option<Credential>>;
}

/// Credentials held in memory, typically loaded from the inventory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentials {
    credentials: Vec<Credential>,
}

impl InMemoryCredentials {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialResolver for InMemoryCredentials {
    async fn get_credentials(
        &self,
        integration_type: CredentialType,
        environment: &Environment,
    ) -> anyhow::Result<Option<Credential>> {
        Ok(self
            .credentials
            .iter()
            .find(|c| c.applies_to(integration_type, &environment.name))
            .cloned())
    }
}
