//! Manager and provider contracts
//!
//! A [`Manager`] wraps one capability inside a running service and exposes a
//! uniform lifecycle to the orchestrator. A [`Provider`] is the concrete
//! backend behind a manager (a database driver, a broker client, ...); the
//! runtime consumes providers only through this trait.

use crate::health::HealthStatus;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for manager and provider operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors raised by managers and providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManagerError {
    /// An option value could not be used.
    #[error("invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    /// No backend is registered for the selected provider.
    #[error("no provider '{provider}' registered for capability '{capability}'")]
    MissingProvider {
        capability: String,
        provider: String,
    },

    /// A manager this one needs was not instantiated first.
    #[error("required manager '{0}' is not available")]
    MissingDependency(String),

    /// Connecting or starting the backend failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Releasing the backend failed.
    #[error("close failed: {0}")]
    Close(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl ManagerError {
    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Runtime object owning one capability.
///
/// `start` and `stop` default to no-ops: in-process managers are ready as
/// soon as they exist. Managers are shared behind `Arc`, so lifecycle methods
/// take `&self` and keep any mutable state internally.
#[async_trait::async_trait]
pub trait Manager: Send + Sync {
    /// Capability this manager serves.
    fn capability(&self) -> &str;

    /// Provider selected for the capability.
    fn provider(&self) -> &str;

    /// Connect or start the underlying subsystem.
    async fn start(&self) -> ManagerResult<()> {
        Ok(())
    }

    /// Release the underlying subsystem.
    async fn stop(&self) -> ManagerResult<()> {
        Ok(())
    }

    /// Probe the subsystem. Managers without a probe report ready.
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }

    /// Convert to Any (for downcasting)
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared handle to Any (for typed facade lookups)
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Concrete backend behind a capability.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Provider name, e.g. `postgresql`.
    fn name(&self) -> &str;

    /// Apply provider options. Called once, before `connect`.
    fn configure(&mut self, options: &BTreeMap<String, String>) -> ManagerResult<()>;

    async fn connect(&self) -> ManagerResult<()>;

    async fn close(&self) -> ManagerResult<()>;

    async fn health_check(&self) -> HealthStatus;

    fn as_any(&self) -> &dyn Any;
}

/// Read an option, falling back to `default` when absent.
pub fn option_or<'a>(options: &'a BTreeMap<String, String>, key: &str, default: &'a str) -> &'a str {
    options.get(key).map(String::as_str).unwrap_or(default)
}

/// Parse an option into `T`, falling back to `default` when absent.
pub fn parse_option<T>(options: &BTreeMap<String, String>, key: &str, default: T) -> ManagerResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match options.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ManagerError::invalid_option(key, format!("'{raw}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_option_reports_key_and_value() {
        let mut options = BTreeMap::new();
        options.insert("port".to_string(), "eighty".to_string());

        let err = parse_option::<u16>(&options, "port", 8080).unwrap_err();
        assert!(err.to_string().starts_with("invalid option 'port': 'eighty'"));
        assert_eq!(parse_option::<u64>(&options, "timeout", 5).unwrap(), 5);
    }

    #[test]
    fn option_or_falls_back() {
        let options = BTreeMap::new();
        assert_eq!(option_or(&options, "host", "0.0.0.0"), "0.0.0.0");
    }
}
