//! Physical layer model: what a database runs on and how it is offered.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type EngineId = i64;
pub type PlanId = i64;

/// A database technology, e.g. `mysql` or `redis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineType {
    pub name: String,
    /// Whether engines of this type keep their data set in memory.
    #[serde(default)]
    pub is_in_memory: bool,
}

/// A concrete, versioned engine offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engine {
    pub id: EngineId,
    pub engine_type: String,
    pub version: String,
}

impl Engine {
    /// Display name, e.g. `mysql_5.7.25`.
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.engine_type, self.version)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// A deployment target (e.g. `prod`, `dev`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A virtual machine managed through the host provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub hostname: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Provider-side identifier, sent as `host_id` in provider requests.
    pub identifier: String,
}

/// A database instance. The host is `None` until the VM has been provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    #[serde(default)]
    pub hostname: Option<Host>,
}

impl Instance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: None,
        }
    }

    /// Bind the instance to a provisioned host.
    pub fn with_host(mut self, host: Host) -> Self {
        self.hostname = Some(host);
        self
    }
}

/// Infrastructure provider backing a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Hosts exist before the database is requested.
    Preprovisioned,
    /// Hosts are created in a bundle-based cloud.
    Cloudstack,
    Kubernetes,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Preprovisioned => "preprovisioned",
            Provider::Cloudstack => "cloudstack",
            Provider::Kubernetes => "kubernetes",
        }
    }

    /// Whether the provider places hosts across bundles.
    pub fn is_bundle_based(&self) -> bool {
        matches!(self, Provider::Cloudstack)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preprovisioned" => Ok(Provider::Preprovisioned),
            "cloudstack" => Ok(Provider::Cloudstack),
            "kubernetes" => Ok(Provider::Kubernetes),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// An infrastructure grouping unit (e.g. an availability zone) a plan can
/// spread its hosts over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
        }
    }
}

/// Reusable database configuration template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub engine_id: EngineId,
    /// Names of the environments the plan is offered in.
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_ha: bool,
    #[serde(default = "default_true")]
    pub has_persistence: bool,
    pub provider: Provider,
    /// Bundles attached through the plan's cloud attributes.
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

impl Plan {
    pub fn new(id: PlanId, name: impl Into<String>, engine_id: EngineId) -> Self {
        Self {
            id,
            name: name.into(),
            engine_id,
            environments: Vec::new(),
            is_active: true,
            is_default: false,
            is_ha: false,
            has_persistence: true,
            provider: Provider::Preprovisioned,
            bundles: Vec::new(),
        }
    }

    pub fn is_pre_provisioned(&self) -> bool {
        self.provider == Provider::Preprovisioned
    }

    pub fn is_cloudstack(&self) -> bool {
        self.provider == Provider::Cloudstack
    }

    /// Number of attached bundles that can receive hosts.
    pub fn active_bundle_count(&self) -> usize {
        self.bundles.iter().filter(|b| b.is_active).count()
    }
}

/// Replication layout available for a set of engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTopology {
    pub name: String,
    #[serde(default)]
    pub engine_ids: Vec<EngineId>,
}

fn default_true() -> bool {
    true
}
