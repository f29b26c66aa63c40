//! The view of a composition model every template renders against.

use super::defaults::provider_settings;
use serde::Serialize;
use std::collections::BTreeMap;
use svcforge_kernel::{CapabilityRegistry, CompositionModel};

/// Providers that run as their own container in local development.
const CONTAINERIZED: &[&str] = &[
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "memcached",
    "kafka",
    "rabbitmq",
    "nats",
    "elasticsearch",
    "opensearch",
    "minio",
];

/// One capability as templates see it.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityView {
    pub name: String,
    pub description: String,
    pub core: bool,
    pub enabled: bool,
    /// Connected through a provider during start.
    pub connect: bool,
    pub provider: String,
    /// Provider defaults merged with user options. Empty when disabled.
    pub settings: BTreeMap<String, String>,
}

/// Template context shared by every file of one generation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    pub service_name: String,
    pub package_name: String,
    pub service_type: String,
    pub generator_version: &'static str,
    /// Directory holding the `svcforge-kernel` and `svcforge-runtime` crates.
    pub runtime_path: String,
    /// Every catalog capability, disabled ones included.
    pub capabilities: BTreeMap<String, CapabilityView>,
    /// Enabled capability names in catalog order.
    pub enabled_capabilities: Vec<String>,
    /// Enabled optional capabilities that need an application provider.
    pub external_capabilities: Vec<CapabilityView>,
    /// Containers the service depends on locally, deduplicated.
    pub backing_services: Vec<String>,
}

impl Projection {
    pub fn new(model: &CompositionModel, registry: &CapabilityRegistry) -> Self {
        let service_name = model.service_name().to_string();
        let package_name = model.package_name();
        let mut capabilities = BTreeMap::new();
        let mut enabled_capabilities = Vec::new();
        let mut external_capabilities = Vec::new();
        let mut backing_services: Vec<String> = Vec::new();

        for capability in registry.all() {
            let Some(selection) = model.selection(&capability.name) else {
                continue;
            };
            let settings = if selection.enabled {
                let mut settings = provider_settings(
                    &capability.name,
                    &selection.provider,
                    &service_name,
                    &package_name,
                );
                settings.extend(selection.options.clone());
                settings
            } else {
                BTreeMap::new()
            };

            let view = CapabilityView {
                name: capability.name.clone(),
                description: capability.description.clone(),
                core: capability.is_core,
                enabled: selection.enabled,
                connect: capability.start_mode.phase().is_some(),
                provider: selection.provider.clone(),
                settings,
            };

            if view.enabled {
                enabled_capabilities.push(view.name.clone());
                if view.connect && !view.core {
                    external_capabilities.push(view.clone());
                    if CONTAINERIZED.contains(&view.provider.as_str())
                        && !backing_services.contains(&view.provider)
                    {
                        backing_services.push(view.provider.clone());
                    }
                }
            }
            capabilities.insert(view.name.clone(), view);
        }

        Self {
            service_name,
            package_name,
            service_type: model.service_type().to_string(),
            generator_version: env!("CARGO_PKG_VERSION"),
            runtime_path: String::new(),
            capabilities,
            enabled_capabilities,
            external_capabilities,
            backing_services,
        }
    }

    pub fn capability(&self, name: &str) -> Option<&CapabilityView> {
        self.capabilities.get(name)
    }
}
