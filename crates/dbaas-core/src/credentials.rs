//! Integration credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of external integration a credential authenticates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    HostProvider,
    Cloudstack,
    Dns,
    Monitoring,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::HostProvider => "HOST_PROVIDER",
            CredentialType::Cloudstack => "CLOUDSTACK",
            CredentialType::Dns => "DNS",
            CredentialType::Monitoring => "MONITORING",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint and account for one integration, scoped to a set of environments.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub integration_type: CredentialType,
    pub endpoint: String,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub project: String,
    /// Names of the environments this credential applies to.
    #[serde(default)]
    pub environments: Vec<String>,
}

impl Credential {
    pub fn applies_to(&self, integration_type: CredentialType, environment: &str) -> bool {
        self.integration_type == integration_type
            && self.environments.iter().any(|e| e == environment)
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("integration_type", &self.integration_type)
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &"***")
            .field("project", &self.project)
            .field("environments", &self.environments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential {
            integration_type: CredentialType::HostProvider,
            endpoint: "fake_endpoint".to_string(),
            user: "fake_user".to_string(),
            password: "fake_password".to_string(),
            project: "fake_project".to_string(),
            environments: vec!["fake_env".to_string()],
        }
    }

    #[test]
    fn test_applies_to_matches_type_and_environment() {
        let c = credential();
        assert!(c.applies_to(CredentialType::HostProvider, "fake_env"));
        assert!(!c.applies_to(CredentialType::Dns, "fake_env"));
        assert!(!c.applies_to(CredentialType::HostProvider, "prod"));
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", credential());
        assert!(!rendered.contains("fake_password"));
        assert!(rendered.contains("fake_user"));
    }
}
