use crate::catalog::BuildContext;
use crate::orchestrator::OrchestratorConfig;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use svcforge_kernel::{Manager, ManagerResult, Selection, ServiceType};

/// Owns the resolved service configuration.
///
/// Besides exposing the enabled selections to consumers, it parses the
/// orchestrator's own settings (the `*_timeout_secs` keys and
/// `health_interval_secs`) so malformed values fail at instantiation.
#[derive(Debug)]
pub struct ConfigManager {
    provider: String,
    service_name: String,
    service_type: ServiceType,
    settings: OrchestratorConfig,
    selections: BTreeMap<String, Selection>,
}

impl ConfigManager {
    pub fn create(ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        let model = ctx.model();
        let settings = OrchestratorConfig::from_options(ctx.options())?;
        let selections = model
            .enabled()
            .map(|(name, selection)| (name.to_string(), selection.clone()))
            .collect();

        Ok(Arc::new(Self {
            provider: ctx.provider().to_string(),
            service_name: model.service_name().to_string(),
            service_type: model.service_type(),
            settings,
            selections,
        }))
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn orchestrator_config(&self) -> &OrchestratorConfig {
        &self.settings
    }

    /// Selection of an enabled capability.
    pub fn selection(&self, capability: &str) -> Option<&Selection> {
        self.selections.get(capability)
    }
}

#[async_trait::async_trait]
impl Manager for ConfigManager {
    fn capability(&self) -> &str {
        "config"
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
