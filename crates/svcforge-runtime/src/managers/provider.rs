use crate::catalog::{BuildContext, ProviderFactory};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use svcforge_kernel::{HealthStatus, Manager, ManagerResult, Provider};
use tracing::debug;

/// Manager driving an externally supplied [`Provider`].
///
/// The provider is configured at instantiation, connected on `start` and
/// closed on `stop`; it reports `not-applicable` while disconnected.
pub struct ProviderManager {
    capability: String,
    provider_name: String,
    backend: Box<dyn Provider>,
    connected: AtomicBool,
}

impl ProviderManager {
    pub fn create(
        ctx: &BuildContext<'_>,
        factory: &dyn ProviderFactory,
    ) -> ManagerResult<Arc<dyn Manager>> {
        let mut backend = factory.create(ctx.selection())?;
        backend.configure(ctx.options())?;
        debug!(capability = ctx.capability(), provider = ctx.provider(), "provider configured");

        Ok(Arc::new(Self {
            capability: ctx.capability().to_string(),
            provider_name: ctx.provider().to_string(),
            backend,
            connected: AtomicBool::new(false),
        }))
    }

    pub fn backend(&self) -> &dyn Provider {
        self.backend.as_ref()
    }

    /// The backend downcast to its concrete type.
    pub fn backend_as<T: 'static>(&self) -> Option<&T> {
        self.backend.as_any().downcast_ref::<T>()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Manager for ProviderManager {
    fn capability(&self) -> &str {
        &self.capability
    }

    fn provider(&self) -> &str {
        &self.provider_name
    }

    async fn start(&self) -> ManagerResult<()> {
        self.backend.connect().await?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> ManagerResult<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.backend.close().await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if !self.is_connected() {
            return HealthStatus::NotApplicable;
        }
        self.backend.health_check().await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
