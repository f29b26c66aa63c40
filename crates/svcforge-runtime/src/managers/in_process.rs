use crate::catalog::BuildContext;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use svcforge_kernel::{Manager, ManagerResult};

/// Manager for capabilities that live entirely inside the process
/// (discovery client config, circuit breaker policy, scheduler, ...).
///
/// Ready on instantiation; exposes its options to consumers.
#[derive(Debug)]
pub struct InProcessManager {
    capability: String,
    provider: String,
    options: BTreeMap<String, String>,
}

impl InProcessManager {
    pub fn new(capability: &str, provider: &str, options: BTreeMap<String, String>) -> Self {
        Self {
            capability: capability.to_string(),
            provider: provider.to_string(),
            options,
        }
    }

    pub fn create(ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        Ok(Arc::new(Self::new(
            ctx.capability(),
            ctx.provider(),
            ctx.options().clone(),
        )))
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }
}

#[async_trait::async_trait]
impl Manager for InProcessManager {
    fn capability(&self) -> &str {
        &self.capability
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
