//! Health status reported by managers and aggregated by the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Health of one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unreachable,
    NotApplicable,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unreachable => "unreachable",
            HealthStatus::NotApplicable => "not-applicable",
        }
    }

    /// Whether the capability can currently serve requests.
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated health, keyed by capability name.
///
/// This is the payload of the generated service's health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthReport(BTreeMap<String, HealthStatus>);

impl HealthReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: impl Into<String>, status: HealthStatus) {
        self.0.insert(capability.into(), status);
    }

    pub fn get(&self, capability: &str) -> Option<HealthStatus> {
        self.0.get(capability).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, HealthStatus)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when no capability is unreachable.
    pub fn is_serving(&self) -> bool {
        self.0.values().all(|s| *s != HealthStatus::Unreachable)
    }
}

impl FromIterator<(String, HealthStatus)> for HealthReport {
    fn from_iter<I: IntoIterator<Item = (String, HealthStatus)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
