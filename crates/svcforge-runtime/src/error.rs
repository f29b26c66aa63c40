//! Typed errors for the lifecycle orchestrator.

use crate::orchestrator::LifecycleState;
use svcforge_kernel::ManagerError;
use std::time::Duration;
use thiserror::Error;

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Errors that can occur while composing a live service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    /// A manager could not be constructed; initialization stopped here.
    #[error("failed to instantiate '{capability}': {source}")]
    Instantiation {
        capability: String,
        #[source]
        source: ManagerError,
    },

    /// A manager failed to connect/start; startup stopped here.
    #[error("failed to start '{capability}': {source}")]
    Connection {
        capability: String,
        #[source]
        source: ManagerError,
    },

    /// A manager did not finish starting within the configured deadline.
    #[error("'{capability}' did not start within {after:?}")]
    Timeout { capability: String, after: Duration },

    /// Startup was cancelled before `capability` finished starting.
    #[error("startup cancelled while starting '{capability}'")]
    Cancelled { capability: String },

    /// A lifecycle method was called in the wrong state.
    #[error("orchestrator is {actual:?}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: LifecycleState,
    },

    /// The capability catalog itself is malformed.
    #[error("capability catalog error: {0}")]
    Registry(#[from] svcforge_kernel::RegistryError),
}

impl OrchestratorError {
    /// Capability the error is attributed to, if any.
    pub fn capability(&self) -> Option<&str> {
        match self {
            OrchestratorError::Instantiation { capability, .. }
            | OrchestratorError::Connection { capability, .. }
            | OrchestratorError::Timeout { capability, .. }
            | OrchestratorError::Cancelled { capability } => Some(capability),
            _ => None,
        }
    }
}
