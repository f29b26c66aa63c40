//! Capability catalog
//!
//! A capability is a named, independently toggleable feature area
//! ("database", "auth", ...). The catalog is built once at startup and is
//! read-only afterwards; both composers consult it for defaults, valid
//! providers and the dependency order.

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Group a startable capability belongs to.
///
/// Start order is `(phase, dependency order)`, stop order is its exact
/// reverse, so serving always starts last and stops first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPhase {
    Foundation,
    Data,
    Messaging,
    Serving,
}

/// How a capability's manager becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// Ready as soon as the manager is instantiated.
    InProcess,
    /// Needs an explicit connect/start step in the given phase.
    Connect(StartPhase),
}

impl StartMode {
    pub fn phase(&self) -> Option<StartPhase> {
        match self {
            StartMode::InProcess => None,
            StartMode::Connect(phase) => Some(*phase),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
    /// Core capabilities are always enabled.
    pub is_core: bool,
    pub default_provider: String,
    pub valid_providers: BTreeSet<String>,
    pub depends_on: Vec<String>,
    pub start_mode: StartMode,
}

impl Capability {
    fn new(name: &str, default_provider: &str, is_core: bool) -> Self {
        let mut valid_providers = BTreeSet::new();
        valid_providers.insert(default_provider.to_string());
        Self {
            name: name.to_string(),
            description: String::new(),
            is_core,
            default_provider: default_provider.to_string(),
            valid_providers,
            depends_on: Vec::new(),
            start_mode: StartMode::InProcess,
        }
    }

    pub fn core(name: &str, default_provider: &str) -> Self {
        Self::new(name, default_provider, true)
    }

    pub fn optional(name: &str, default_provider: &str) -> Self {
        Self::new(name, default_provider, false)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_providers(mut self, providers: &[&str]) -> Self {
        self.valid_providers
            .extend(providers.iter().map(|p| p.to_string()));
        self
    }

    pub fn depends_on(mut self, dependencies: &[&str]) -> Self {
        self.depends_on
            .extend(dependencies.iter().map(|d| d.to_string()));
        self
    }

    pub fn connects_in(mut self, phase: StartPhase) -> Self {
        self.start_mode = StartMode::Connect(phase);
        self
    }

    pub fn accepts(&self, provider: &str) -> bool {
        self.valid_providers.contains(provider)
    }
}

/// The fixed catalog of capabilities.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    /// Entries in declaration order.
    entries: Vec<Capability>,
    index: HashMap<String, usize>,
    /// Provider alias -> canonical provider name.
    aliases: HashMap<String, String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability to the catalog.
    pub fn register(&mut self, capability: Capability) -> RegistryResult<()> {
        if self.index.contains_key(&capability.name) {
            return Err(RegistryError::Duplicate(capability.name));
        }
        self.index
            .insert(capability.name.clone(), self.entries.len());
        self.entries.push(capability);
        Ok(())
    }

    /// Accept `alias` on input as a spelling of `canonical`.
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .insert(alias.to_string(), canonical.to_string());
        self
    }

    /// Look up a capability by name.
    pub fn resolve(&self, name: &str) -> Option<&Capability> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// All capabilities in declaration order.
    pub fn all(&self) -> &[Capability] {
        &self.entries
    }

    pub fn core(&self) -> impl Iterator<Item = &Capability> {
        self.entries.iter().filter(|c| c.is_core)
    }

    pub fn optional(&self) -> impl Iterator<Item = &Capability> {
        self.entries.iter().filter(|c| !c.is_core)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a user-supplied provider spelling to its canonical name.
    pub fn normalize_provider(&self, provider: &str) -> String {
        let lowered = provider.trim().to_ascii_lowercase().replace('-', "_");
        self.aliases.get(&lowered).cloned().unwrap_or(lowered)
    }

    /// Check that every dependency exists and the graph has no cycle.
    pub fn validate_acyclic(&self) -> RegistryResult<()> {
        self.topological_order().map(|_| ())
    }

    /// Capabilities ordered so that every dependency precedes its dependents.
    ///
    /// Ties are broken by declaration order, so the result is stable.
    pub fn topological_order(&self) -> RegistryResult<Vec<&Capability>> {
        let mut in_degree = vec![0usize; self.entries.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.entries.len()];

        for (i, capability) in self.entries.iter().enumerate() {
            for dependency in &capability.depends_on {
                let Some(&d) = self.index.get(dependency) else {
                    return Err(RegistryError::UnknownDependency {
                        capability: capability.name.clone(),
                        dependency: dependency.clone(),
                    });
                };
                dependents[d].push(i);
                in_degree[i] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..self.entries.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.entries.len());

        while let Some(i) = ready.pop_front() {
            order.push(&self.entries[i]);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push_back(dependent);
                }
            }
        }

        if order.len() != self.entries.len() {
            let capabilities = self
                .entries
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, c)| c.name.clone())
                .collect();
            return Err(RegistryError::Cycle { capabilities });
        }

        Ok(order)
    }

    /// The built-in catalog.
    pub fn standard() -> Self {
        use StartPhase::*;

        let catalog = [
            // Core
            Capability::core("config", "yaml")
                .with_description("Service configuration loading")
                .with_providers(&["env"]),
            Capability::core("logging", "tracing")
                .with_description("Structured logging")
                .with_providers(&["json"]),
            Capability::core("monitoring", "prometheus")
                .with_description("Metrics registry and exposition")
                .connects_in(Foundation),
            Capability::core("middleware", "standard")
                .with_description("HTTP middleware chain"),
            Capability::core("communication", "http")
                .with_description("Inbound HTTP server with health endpoints")
                .depends_on(&["monitoring", "middleware"])
                .connects_in(Serving),
            // Optional
            Capability::optional("auth", "jwt")
                .with_description("Authentication")
                .with_providers(&["oauth2", "apikey"]),
            Capability::optional("database", "postgresql")
                .with_description("Relational or document database")
                .with_providers(&["mysql", "sqlite", "mongodb"])
                .connects_in(Data),
            Capability::optional("cache", "redis")
                .with_description("Key/value cache")
                .with_providers(&["memcached", "memory"])
                .connects_in(Data),
            Capability::optional("messaging", "kafka")
                .with_description("Message broker")
                .with_providers(&["rabbitmq", "nats"])
                .connects_in(Messaging),
            Capability::optional("storage", "s3")
                .with_description("Object storage")
                .with_providers(&["gcs", "minio", "local"])
                .connects_in(Data),
            Capability::optional("search", "elasticsearch")
                .with_description("Full-text search")
                .with_providers(&["opensearch"])
                .connects_in(Data),
            Capability::optional("discovery", "consul")
                .with_description("Service discovery")
                .with_providers(&["etcd", "kubernetes"]),
            Capability::optional("circuit_breaker", "hystrix")
                .with_description("Circuit breaking for outbound calls")
                .with_providers(&["resilience"]),
            Capability::optional("rate_limit", "token_bucket")
                .with_description("Request rate limiting")
                .with_providers(&["sliding_window"]),
            Capability::optional("tracing", "jaeger")
                .with_description("Distributed tracing")
                .with_providers(&["zipkin", "otlp"])
                .depends_on(&["monitoring"]),
            Capability::optional("event", "eventstore")
                .with_description("Event sourcing")
                .with_providers(&["postgresql"])
                .depends_on(&["database"])
                .connects_in(Messaging),
            Capability::optional("scheduler", "cron")
                .with_description("Scheduled jobs"),
            Capability::optional("backup", "s3")
                .with_description("Database backups")
                .with_providers(&["local"])
                .depends_on(&["database", "storage"]),
            Capability::optional("payment", "stripe")
                .with_description("Payment processing")
                .with_providers(&["paypal"])
                .depends_on(&["database"])
                .connects_in(Messaging),
            Capability::optional("notification", "smtp")
                .with_description("Outbound notifications")
                .with_providers(&["sendgrid", "twilio"])
                .depends_on(&["messaging"]),
            Capability::optional("filegen", "pdf")
                .with_description("Document generation")
                .with_providers(&["excel", "csv"])
                .depends_on(&["storage"]),
            Capability::optional("websocket", "native")
                .with_description("WebSocket endpoints"),
            Capability::optional("graphql", "async_graphql")
                .with_description("GraphQL endpoint"),
            Capability::optional("grpc", "tonic")
                .with_description("gRPC endpoint"),
            Capability::optional("admin", "standard")
                .with_description("Administrative endpoints")
                .depends_on(&["auth"]),
        ];

        let mut registry = Self::new()
            .with_alias("postgres", "postgresql")
            .with_alias("pg", "postgresql")
            .with_alias("mongo", "mongodb")
            .with_alias("rabbit", "rabbitmq")
            .with_alias("es", "elasticsearch");
        for capability in catalog {
            // Names in the literal catalog above are unique.
            let _ = registry.register(capability);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_acyclic() {
        let registry = CapabilityRegistry::standard();
        registry.validate_acyclic().unwrap();
        assert_eq!(registry.core().count(), 5);
        assert!(registry.optional().count() >= 20);
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let registry = CapabilityRegistry::standard();
        let order: Vec<&str> = registry
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();

        for capability in registry.all() {
            for dependency in &capability.depends_on {
                assert!(
                    position(dependency) < position(&capability.name),
                    "{dependency} must precede {}",
                    capability.name
                );
            }
        }
    }

    #[test]
    fn detects_cycles() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(Capability::optional("a", "x").depends_on(&["b"]))
            .unwrap();
        registry
            .register(Capability::optional("b", "x").depends_on(&["c"]))
            .unwrap();
        registry
            .register(Capability::optional("c", "x").depends_on(&["a"]))
            .unwrap();
        registry.register(Capability::optional("d", "x")).unwrap();

        let err = registry.validate_acyclic().unwrap_err();
        assert_eq!(
            err,
            RegistryError::Cycle {
                capabilities: vec!["a".into(), "b".into(), "c".into()]
            }
        );
    }

    #[test]
    fn rejects_unknown_dependency_and_duplicates() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(Capability::optional("a", "x").depends_on(&["ghost"]))
            .unwrap();
        assert!(matches!(
            registry.validate_acyclic(),
            Err(RegistryError::UnknownDependency { .. })
        ));
        assert_eq!(
            registry.register(Capability::optional("a", "y")),
            Err(RegistryError::Duplicate("a".into()))
        );
    }

    #[test]
    fn normalizes_provider_aliases() {
        let registry = CapabilityRegistry::standard();
        assert_eq!(registry.normalize_provider("Postgres"), "postgresql");
        assert_eq!(registry.normalize_provider("token-bucket"), "token_bucket");
        assert_eq!(registry.normalize_provider("redis"), "redis");
    }
}
