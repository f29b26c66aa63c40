//! Manager catalog
//!
//! Maps capabilities to the factories that build their managers. The
//! orchestrator walks the enabled capabilities in dependency order and asks
//! the catalog for each manager; adding a capability means registering a
//! factory here, not extending a dispatch switch.

use crate::managers::{
    CommunicationManager, ConfigManager, InProcessManager, LoggingManager, MiddlewareManager,
    MonitoringManager, ProviderManager,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use svcforge_kernel::{
    Capability, CapabilityRegistry, CompositionModel, HealthReport, Manager, ManagerError,
    ManagerResult, Provider, Selection, StartMode,
};
use tokio::sync::watch;

/// Everything a factory may consult while building one manager.
pub struct BuildContext<'a> {
    pub(crate) capability: &'a Capability,
    pub(crate) selection: &'a Selection,
    pub(crate) model: &'a CompositionModel,
    pub(crate) managers: &'a BTreeMap<String, Arc<dyn Manager>>,
    pub(crate) health: &'a watch::Sender<HealthReport>,
}

impl<'a> BuildContext<'a> {
    pub fn capability(&self) -> &str {
        &self.capability.name
    }

    pub fn descriptor(&self) -> &Capability {
        self.capability
    }

    pub fn provider(&self) -> &str {
        &self.selection.provider
    }

    pub fn selection(&self) -> &Selection {
        self.selection
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.selection.options
    }

    pub fn model(&self) -> &CompositionModel {
        self.model
    }

    /// A manager instantiated earlier in this run.
    pub fn dependency(&self, capability: &str) -> Option<Arc<dyn Manager>> {
        self.managers.get(capability).cloned()
    }

    /// A manager instantiated earlier in this run, downcast to its type.
    pub fn dependency_as<T: Manager + 'static>(&self, capability: &str) -> Option<Arc<T>> {
        self.dependency(capability)?
            .into_any_arc()
            .downcast::<T>()
            .ok()
    }

    /// Receiver for the health reports the orchestrator publishes.
    pub fn health_feed(&self) -> watch::Receiver<HealthReport> {
        self.health.subscribe()
    }
}

/// Builds the manager for one capability.
pub trait ManagerFactory: Send + Sync {
    fn create(&self, ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>>;
}

impl<F> ManagerFactory for F
where
    F: Fn(&BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> + Send + Sync,
{
    fn create(&self, ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        self(ctx)
    }
}

/// Builds the concrete backend for one (capability, provider) pair.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, selection: &Selection) -> ManagerResult<Box<dyn Provider>>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&Selection) -> ManagerResult<Box<dyn Provider>> + Send + Sync,
{
    fn create(&self, selection: &Selection) -> ManagerResult<Box<dyn Provider>> {
        self(selection)
    }
}

/// Registry of manager and provider factories.
#[derive(Clone, Default)]
pub struct ManagerCatalog {
    managers: HashMap<String, Arc<dyn ManagerFactory>>,
    providers: HashMap<(String, String), Arc<dyn ProviderFactory>>,
}

impl ManagerCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in managers: the five core capabilities plus a generic
    /// in-process manager for every optional capability that has no
    /// connect step. Connect-step capabilities still need a provider.
    pub fn standard(registry: &CapabilityRegistry) -> Self {
        let mut catalog = Self::new();
        catalog
            .register_manager("config", ConfigManager::create)
            .register_manager("logging", LoggingManager::create)
            .register_manager("monitoring", MonitoringManager::create)
            .register_manager("middleware", MiddlewareManager::create)
            .register_manager("communication", CommunicationManager::create);

        for capability in registry.optional() {
            if capability.start_mode == StartMode::InProcess {
                catalog.register_manager(&capability.name, InProcessManager::create);
            }
        }
        catalog
    }

    pub fn register_manager(
        &mut self,
        capability: &str,
        factory: impl ManagerFactory + 'static,
    ) -> &mut Self {
        self.managers
            .insert(capability.to_string(), Arc::new(factory));
        self
    }

    pub fn with_manager(mut self, capability: &str, factory: impl ManagerFactory + 'static) -> Self {
        self.register_manager(capability, factory);
        self
    }

    pub fn register_provider(
        &mut self,
        capability: &str,
        provider: &str,
        factory: impl ProviderFactory + 'static,
    ) -> &mut Self {
        self.providers.insert(
            (capability.to_string(), provider.to_string()),
            Arc::new(factory),
        );
        self
    }

    pub fn with_provider(
        mut self,
        capability: &str,
        provider: &str,
        factory: impl ProviderFactory + 'static,
    ) -> Self {
        self.register_provider(capability, provider, factory);
        self
    }

    pub fn has_provider(&self, capability: &str, provider: &str) -> bool {
        self.providers
            .contains_key(&(capability.to_string(), provider.to_string()))
    }

    /// Build the manager for the capability described by `ctx`.
    ///
    /// A provider registered for the exact (capability, provider) pair wins
    /// over a capability-level manager factory.
    pub fn instantiate(&self, ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        let key = (ctx.capability().to_string(), ctx.provider().to_string());
        if let Some(factory) = self.providers.get(&key) {
            return ProviderManager::create(ctx, factory.as_ref());
        }
        if let Some(factory) = self.managers.get(ctx.capability()) {
            return factory.create(ctx);
        }
        Err(ManagerError::MissingProvider {
            capability: key.0,
            provider: key.1,
        })
    }
}
