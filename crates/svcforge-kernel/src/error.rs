//! Typed errors for the capability registry and the composition model.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while authoring or checking the capability catalog.
///
/// These are programming errors in the catalog itself, not user input
/// problems, and are expected to surface once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A capability name was registered twice.
    #[error("capability '{0}' is already registered")]
    Duplicate(String),

    /// A capability depends on a name that is not in the catalog.
    #[error("capability '{capability}' depends on unknown capability '{dependency}'")]
    UnknownDependency {
        capability: String,
        dependency: String,
    },

    /// The `depends_on` graph contains a cycle through these capabilities.
    #[error("capability dependency cycle through: {}", .capabilities.join(" -> "))]
    Cycle { capabilities: Vec<String> },
}

/// A single violated composition invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationIssue {
    /// An enabled capability depends on a capability that is not enabled.
    #[error("capability '{capability}' requires '{dependency}' to be enabled")]
    MissingDependency {
        capability: String,
        dependency: String,
    },

    /// The selected provider is not one of the capability's valid providers.
    #[error(
        "provider '{provider}' is not valid for capability '{capability}' (expected one of: {})",
        .valid.join(", ")
    )]
    InvalidProvider {
        capability: String,
        provider: String,
        valid: Vec<String>,
    },

    /// The selection names a capability that is not in the catalog.
    #[error("unknown capability '{name}'")]
    UnknownCapability { name: String },

    /// The service name cannot be used as a directory and package name.
    #[error("invalid service name '{name}': {reason}")]
    InvalidServiceName { name: String, reason: String },

    /// An option key or value cannot be used for the capability.
    #[error("invalid option '{capability}.{key}': {reason}")]
    InvalidOption {
        capability: String,
        key: String,
        reason: String,
    },

    /// The service type is not one of the supported kinds.
    #[error("invalid service type '{value}' (expected one of: {})", .valid.join(", "))]
    InvalidServiceType { value: String, valid: Vec<String> },
}

/// Every invariant violated by one composition attempt.
///
/// The builder never stops at the first problem; callers get the complete
/// list in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid composition:{}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Missing dependency pairs as `(capability, dependency)`.
    pub fn missing_dependencies(&self) -> Vec<(&str, &str)> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                ValidationIssue::MissingDependency {
                    capability,
                    dependency,
                } => Some((capability.as_str(), dependency.as_str())),
                _ => None,
            })
            .collect()
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("\n  - {issue}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_issue() {
        let err = ValidationError::new(vec![
            ValidationIssue::MissingDependency {
                capability: "event".into(),
                dependency: "database".into(),
            },
            ValidationIssue::UnknownCapability {
                name: "teleport".into(),
            },
        ]);

        let rendered = err.to_string();
        assert!(rendered.starts_with("invalid composition:"));
        assert!(rendered.contains("capability 'event' requires 'database' to be enabled"));
        assert!(rendered.contains("unknown capability 'teleport'"));
        assert_eq!(err.missing_dependencies(), vec![("event", "database")]);
    }

    #[test]
    fn cycle_error_shows_path() {
        let err = RegistryError::Cycle {
            capabilities: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "capability dependency cycle through: a -> b");
    }
}
