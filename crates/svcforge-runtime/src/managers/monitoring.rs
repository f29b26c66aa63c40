use crate::catalog::BuildContext;
use prometheus::core::Collector;
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use svcforge_kernel::manager::option_or;
use svcforge_kernel::{HealthReport, HealthStatus, Manager, ManagerError, ManagerResult};
use tracing::debug;

/// Owns the service's Prometheus registry.
///
/// Starting the manager registers the built-in collectors; the
/// `capability_up` gauge mirrors the latest aggregated health report.
pub struct MonitoringManager {
    provider: String,
    registry: Registry,
    capability_up: IntGaugeVec,
    started: AtomicBool,
}

impl MonitoringManager {
    pub fn create(ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        Ok(Arc::new(Self::new(ctx)?))
    }

    fn new(ctx: &BuildContext<'_>) -> ManagerResult<Self> {
        let namespace = option_or(ctx.options(), "namespace", "svcforge").replace('-', "_");
        let labels = HashMap::from([(
            "service".to_string(),
            ctx.model().service_name().to_string(),
        )]);
        let registry = Registry::new_custom(None, Some(labels)).map_err(prometheus_error)?;

        let capability_up = IntGaugeVec::new(
            Opts::new(
                "capability_up",
                "1 when the capability reports healthy or degraded, 0 otherwise",
            )
            .namespace(namespace),
            &["capability"],
        )
        .map_err(prometheus_error)?;

        Ok(Self {
            provider: ctx.provider().to_string(),
            registry,
            capability_up,
            started: AtomicBool::new(false),
        })
    }

    /// Registry for application-defined collectors.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Update the `capability_up` gauge from a health report.
    pub fn record_health(&self, report: &HealthReport) {
        for (capability, status) in report.iter() {
            self.capability_up
                .with_label_values(&[capability])
                .set(i64::from(status.is_up()));
        }
    }

    /// Last recorded `capability_up` value, if one was ever recorded.
    pub fn capability_up(&self, capability: &str) -> Option<i64> {
        self.capability_up
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == "capability" && label.get_value() == capability)
            })
            .map(|metric| metric.get_gauge().get_value() as i64)
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            debug!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn prometheus_error(e: prometheus::Error) -> ManagerError {
    ManagerError::Other(format!("prometheus: {e}"))
}

#[async_trait::async_trait]
impl Manager for MonitoringManager {
    fn capability(&self) -> &str {
        "monitoring"
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    async fn start(&self) -> ManagerResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.registry
            .register(Box::new(self.capability_up.clone()))
            .map_err(|e| {
                self.started.store(false, Ordering::SeqCst);
                ManagerError::Connect(format!("prometheus: {e}"))
            })
    }

    async fn stop(&self) -> ManagerResult<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.registry
            .unregister(Box::new(self.capability_up.clone()))
            .map_err(|e| ManagerError::Close(format!("prometheus: {e}")))
    }

    async fn health_check(&self) -> HealthStatus {
        if self.started.load(Ordering::SeqCst) {
            HealthStatus::Healthy
        } else {
            HealthStatus::NotApplicable
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
