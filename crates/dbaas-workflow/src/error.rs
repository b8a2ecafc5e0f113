//! Error types for the workflow crate.

use crate::host_provider::ProviderResponse;
use dbaas_core::CredentialType;
use thiserror::Error;

/// Errors raised by host provider steps.
#[derive(Debug, Error)]
pub enum HostProviderError {
    /// The provider answered a start request with anything but 200.
    #[error("could not start host {host}: provider answered {}", .response.status)]
    StartVm {
        host: String,
        response: ProviderResponse,
    },

    /// The provider answered a stop request with anything but 200.
    #[error("could not stop host {host}: provider answered {}", .response.status)]
    StopVm {
        host: String,
        response: ProviderResponse,
    },

    /// No credential of this kind is scoped to the environment.
    #[error("no {integration_type} credential for environment {environment}")]
    CredentialNotFound {
        integration_type: CredentialType,
        environment: String,
    },

    /// The credential store itself failed.
    #[error("credential lookup failed: {0}")]
    CredentialLookup(#[source] anyhow::Error),

    /// The instance is not bound to a host yet.
    #[error("instance {instance} has no host")]
    HostNotBound { instance: String },

    /// Connection, timeout or protocol failure below HTTP status level.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HostProviderError {
    /// The provider response carried by status errors.
    pub fn response(&self) -> Option<&ProviderResponse> {
        match self {
            HostProviderError::StartVm { response, .. }
            | HostProviderError::StopVm { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Errors returned by a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step failed after all attempts. Completed steps were reverted;
    /// `rollback_failures` lists the ones whose revert failed as well.
    #[error("step '{step}' failed after {attempts} attempt(s): {source}")]
    StepFailed {
        step: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
        rollback_failures: Vec<String>,
    },

    /// The pipeline has no steps.
    #[error("pipeline {0} has no steps")]
    Empty(String),
}
