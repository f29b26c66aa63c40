//! Composition model
//!
//! The composition model is the single source of truth for one generation or
//! bootstrap run: which capabilities are enabled, with which provider and
//! options. It is produced by [`CompositionBuilder::build`], which reports
//! every violated invariant at once, and is read-only afterwards.

use crate::capability::CapabilityRegistry;
use crate::error::{ValidationError, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Kind of service being composed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Rest,
    Graphql,
    Grpc,
    Websocket,
    Event,
    Scheduled,
    Worker,
    Gateway,
    Proxy,
}

impl ServiceType {
    pub const ALL: [ServiceType; 9] = [
        ServiceType::Rest,
        ServiceType::Graphql,
        ServiceType::Grpc,
        ServiceType::Websocket,
        ServiceType::Event,
        ServiceType::Scheduled,
        ServiceType::Worker,
        ServiceType::Gateway,
        ServiceType::Proxy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Rest => "rest",
            ServiceType::Graphql => "graphql",
            ServiceType::Grpc => "grpc",
            ServiceType::Websocket => "websocket",
            ServiceType::Event => "event",
            ServiceType::Scheduled => "scheduled",
            ServiceType::Worker => "worker",
            ServiceType::Gateway => "gateway",
            ServiceType::Proxy => "proxy",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ValidationIssue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ValidationIssue::InvalidServiceType {
                value: s.to_string(),
                valid: Self::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            })
    }
}

/// What was selected for one capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub enabled: bool,
    pub provider: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Selection {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Validated, immutable record of one composition.
///
/// Holds a selection for every capability in the registry, disabled ones
/// included, so lookups never need to distinguish "absent" from "off".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionModel {
    service_name: String,
    service_type: ServiceType,
    selections: BTreeMap<String, Selection>,
}

impl CompositionModel {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Crate/package identifier derived from the service name.
    pub fn package_name(&self) -> String {
        self.service_name.replace('-', "_")
    }

    pub fn selection(&self, capability: &str) -> Option<&Selection> {
        self.selections.get(capability)
    }

    pub fn is_enabled(&self, capability: &str) -> bool {
        self.selections
            .get(capability)
            .is_some_and(|s| s.enabled)
    }

    /// Provider of an enabled capability.
    pub fn provider(&self, capability: &str) -> Option<&str> {
        self.selections
            .get(capability)
            .filter(|s| s.enabled)
            .map(|s| s.provider.as_str())
    }

    pub fn selections(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.selections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn enabled(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.selections().filter(|(_, s)| s.enabled)
    }
}

#[derive(Debug, Clone)]
enum Request {
    Enable(Option<String>),
    Disable,
}

/// Collects raw selections and validates them into a [`CompositionModel`].
#[derive(Debug)]
pub struct CompositionBuilder<'r> {
    registry: &'r CapabilityRegistry,
    service_name: String,
    service_type: ServiceType,
    requests: BTreeMap<String, Request>,
    options: BTreeMap<String, BTreeMap<String, String>>,
    issues: Vec<ValidationIssue>,
}

impl<'r> CompositionBuilder<'r> {
    pub fn new(registry: &'r CapabilityRegistry, service_name: impl Into<String>) -> Self {
        Self {
            registry,
            service_name: service_name.into(),
            service_type: ServiceType::default(),
            requests: BTreeMap::new(),
            options: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    pub fn service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    /// Set the service type from text, recording an issue if it is unknown.
    pub fn service_type_str(mut self, raw: &str) -> Self {
        match raw.parse() {
            Ok(service_type) => self.service_type = service_type,
            Err(issue) => self.issues.push(issue),
        }
        self
    }

    /// Enable a capability. `None` selects its default provider.
    pub fn enable(mut self, capability: &str, provider: Option<&str>) -> Self {
        let provider = provider
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        self.requests
            .insert(normalize_name(capability), Request::Enable(provider));
        self
    }

    pub fn disable(mut self, capability: &str) -> Self {
        self.requests
            .insert(normalize_name(capability), Request::Disable);
        self
    }

    /// Apply a raw selection string.
    ///
    /// Empty, `false`, `off` and `none` disable the capability; `true`,
    /// `on` and `default` enable it with its default provider; anything else
    /// enables it with that provider.
    pub fn select(self, capability: &str, raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "off" | "none" => self.disable(capability),
            "true" | "on" | "default" => self.enable(capability, None),
            _ => self.enable(capability, Some(raw)),
        }
    }

    pub fn option(mut self, capability: &str, key: &str, value: &str) -> Self {
        self.options
            .entry(normalize_name(capability))
            .or_default()
            .insert(key.trim().to_string(), value.to_string());
        self
    }

    pub fn options(mut self, capability: &str, options: &BTreeMap<String, String>) -> Self {
        self.options
            .entry(normalize_name(capability))
            .or_default()
            .extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Validate and freeze the selection.
    pub fn build(self) -> Result<CompositionModel, ValidationError> {
        let CompositionBuilder {
            registry,
            service_name,
            service_type,
            mut requests,
            mut options,
            mut issues,
        } = self;

        if let Err(reason) = check_service_name(&service_name) {
            issues.push(ValidationIssue::InvalidServiceName {
                name: service_name.clone(),
                reason,
            });
        }

        for name in requests.keys().chain(options.keys()) {
            if registry.resolve(name).is_none() {
                let issue = ValidationIssue::UnknownCapability { name: name.clone() };
                if !issues.contains(&issue) {
                    issues.push(issue);
                }
            }
        }

        let mut selections = BTreeMap::new();
        let mut requested_provider = BTreeMap::new();

        for capability in registry.all() {
            let request = requests.remove(&capability.name);
            let (enabled, provider) = match (capability.is_core, request) {
                (true, Some(Request::Disable)) => {
                    debug!(capability = %capability.name, "core capability cannot be disabled");
                    (true, None)
                }
                (true, Some(Request::Enable(provider))) => (true, provider),
                (true, None) => (true, None),
                (false, Some(Request::Enable(provider))) => (true, provider),
                (false, Some(Request::Disable)) | (false, None) => (false, None),
            };

            let provider = match provider {
                Some(raw) => {
                    let normalized = registry.normalize_provider(&raw);
                    requested_provider.insert(capability.name.clone(), normalized.clone());
                    normalized
                }
                None => capability.default_provider.clone(),
            };

            selections.insert(
                capability.name.clone(),
                Selection {
                    enabled,
                    provider,
                    options: options.remove(&capability.name).unwrap_or_default(),
                },
            );
        }

        for capability in registry.all() {
            let enabled = selections
                .get(&capability.name)
                .is_some_and(|s: &Selection| s.enabled);
            if !enabled {
                continue;
            }
            for dependency in &capability.depends_on {
                if !selections.get(dependency).is_some_and(|s| s.enabled) {
                    issues.push(ValidationIssue::MissingDependency {
                        capability: capability.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        for (capability, selection) in &selections {
            for (key, value) in &selection.options {
                if let Err(reason) = check_option(capability, key, value) {
                    issues.push(ValidationIssue::InvalidOption {
                        capability: capability.clone(),
                        key: key.clone(),
                        reason,
                    });
                }
            }
        }

        for capability in registry.all() {
            let Some(provider) = requested_provider.get(&capability.name) else {
                continue;
            };
            if *provider != capability.default_provider && !capability.accepts(provider) {
                issues.push(ValidationIssue::InvalidProvider {
                    capability: capability.name.clone(),
                    provider: provider.clone(),
                    valid: capability.valid_providers.iter().cloned().collect(),
                });
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError::new(issues));
        }

        Ok(CompositionModel {
            service_name,
            service_type,
            selections,
        })
    }
}

/// Capability names are snake_case; flags and files may use kebab-case.
fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}

fn check_service_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err("must not be empty".to_string()),
        Some(c) if !c.is_ascii_lowercase() => {
            return Err("must start with a lowercase letter".to_string());
        }
        Some(_) => {}
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_')) {
        return Err(format!("contains unsupported character '{bad}'"));
    }
    Ok(())
}

/// Options end up as YAML keys, environment variable names and literals in
/// generated projects. Keys are `[a-z][a-z0-9_]*`; settings the runtime
/// parses are type-checked here so a bad value never reaches a template.
fn check_option(capability: &str, key: &str, value: &str) -> Result<(), String> {
    let mut chars = key.chars();
    let key_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !key_ok {
        return Err("key must be a lowercase identifier ([a-z][a-z0-9_]*)".to_string());
    }
    if value.chars().any(char::is_control) {
        return Err("value must not contain control characters".to_string());
    }

    match (capability, key) {
        ("communication", "port" | "api_port") => value
            .parse::<u16>()
            .map(|_| ())
            .map_err(|e| format!("'{value}' is not a port number: {e}")),
        ("communication", "host") => {
            let host_char = |c: char| {
                c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '[' | ']')
            };
            let valid = !value.is_empty() && value.chars().all(host_char);
            if valid {
                Ok(())
            } else {
                Err(format!("'{value}' is not a host name or address"))
            }
        }
        ("config", key) if key.ends_with("_secs") => match value.parse::<u64>() {
            Ok(0) => Err("must be greater than zero".to_string()),
            Ok(_) => Ok(()),
            Err(e) => Err(format!("'{value}' is not a number of seconds: {e}")),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::standard()
    }

    #[test]
    fn core_capabilities_are_always_enabled() {
        let registry = registry();
        let model = CompositionBuilder::new(&registry, "orders")
            .disable("monitoring")
            .build()
            .unwrap();

        for core in ["config", "logging", "monitoring", "middleware", "communication"] {
            assert!(model.is_enabled(core), "{core} must be enabled");
        }
        assert_eq!(model.provider("monitoring"), Some("prometheus"));
        assert!(!model.is_enabled("database"));
        assert_eq!(model.provider("database"), None);
    }

    #[test]
    fn enables_with_default_or_aliased_provider() {
        let registry = registry();
        let model = CompositionBuilder::new(&registry, "orders")
            .service_type(ServiceType::Grpc)
            .select("database", "postgres")
            .select("circuit-breaker", "true")
            .select("cache", "")
            .option("database", "pool_size", "16")
            .build()
            .unwrap();

        assert_eq!(model.service_type(), ServiceType::Grpc);
        assert_eq!(model.provider("database"), Some("postgresql"));
        assert_eq!(model.provider("circuit_breaker"), Some("hystrix"));
        assert!(!model.is_enabled("cache"));
        assert_eq!(
            model.selection("database").unwrap().option("pool_size"),
            Some("16")
        );
    }

    #[test]
    fn event_without_database_reports_exactly_one_missing_dependency() {
        let registry = registry();
        let err = CompositionBuilder::new(&registry, "ledger")
            .enable("event", None)
            .build()
            .unwrap_err();

        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.missing_dependencies(), vec![("event", "database")]);
    }

    #[test]
    fn collects_every_issue_in_one_pass() {
        let registry = registry();
        let err = CompositionBuilder::new(&registry, "Bad Name")
            .service_type_str("soap")
            .select("database", "oracle")
            .enable("backup", None)
            .enable("teleport", None)
            .build()
            .unwrap_err();

        let issues = err.issues();
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidServiceType { value, .. } if value == "soap")));
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidServiceName { .. })));
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::UnknownCapability { name } if name == "teleport")));
        assert!(issues.iter().any(|i| matches!(
            i,
            ValidationIssue::InvalidProvider { capability, provider, .. }
                if capability == "database" && provider == "oracle"
        )));
        // backup needs storage; database is enabled (with a bad provider).
        assert_eq!(err.missing_dependencies(), vec![("backup", "storage")]);
    }

    #[test]
    fn dependencies_are_not_auto_enabled() {
        let registry = registry();
        let err = CompositionBuilder::new(&registry, "notifier")
            .enable("notification", None)
            .enable("filegen", None)
            .build()
            .unwrap_err();

        assert_eq!(
            err.missing_dependencies(),
            vec![("notification", "messaging"), ("filegen", "storage")]
        );
    }

    #[test]
    fn option_keys_must_be_lowercase_identifiers() {
        let registry = registry();
        let err = CompositionBuilder::new(&registry, "orders")
            .enable("database", None)
            .option("database", "API_KEY_ENV", "X")
            .option("database", "bad key", "x")
            .option("database", "pool_size", "16")
            .build()
            .unwrap_err();

        let keys: Vec<&str> = err
            .issues()
            .iter()
            .filter_map(|issue| match issue {
                ValidationIssue::InvalidOption { capability, key, .. } if capability == "database" => {
                    Some(key.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec!["API_KEY_ENV", "bad key"]);
    }

    #[test]
    fn core_settings_are_type_checked() {
        let registry = registry();
        let err = CompositionBuilder::new(&registry, "orders")
            .option("communication", "port", "80a")
            .option("communication", "api_port", "70000")
            .option("communication", "host", "0.0.0.0\"; evil")
            .option("config", "start_timeout_secs", "0")
            .option("auth", "header", "line\nbreak")
            .build()
            .unwrap_err();

        let rejected: Vec<(&str, &str)> = err
            .issues()
            .iter()
            .filter_map(|issue| match issue {
                ValidationIssue::InvalidOption { capability, key, .. } => {
                    Some((capability.as_str(), key.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            rejected,
            vec![
                ("auth", "header"),
                ("communication", "api_port"),
                ("communication", "host"),
                ("communication", "port"),
                ("config", "start_timeout_secs"),
            ]
        );

        CompositionBuilder::new(&registry, "orders")
            .option("communication", "port", "0")
            .option("communication", "host", "[::1]")
            .option("config", "start_timeout_secs", "7")
            .build()
            .unwrap();
    }

    #[test]
    fn package_name_replaces_dashes() {
        let registry = registry();
        let model = CompositionBuilder::new(&registry, "order-service")
            .build()
            .unwrap();
        assert_eq!(model.package_name(), "order_service");
    }
}
