use crate::catalog::BuildContext;
use std::any::Any;
use std::sync::Arc;
use svcforge_kernel::manager::option_or;
use svcforge_kernel::{Manager, ManagerResult};

const DEFAULT_CHAIN: &str = "request_id,recovery,cors";

/// Capabilities that contribute a layer to the inbound chain when enabled.
const CAPABILITY_LAYERS: [&str; 3] = ["tracing", "rate_limit", "auth"];

/// Resolves the ordered HTTP middleware chain.
///
/// The base chain comes from the comma-separated `chain` option; layers for
/// enabled capabilities (tracing, rate limiting, auth) are appended.
#[derive(Debug)]
pub struct MiddlewareManager {
    provider: String,
    chain: Vec<String>,
}

impl MiddlewareManager {
    pub fn create(ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        let mut chain: Vec<String> = option_or(ctx.options(), "chain", DEFAULT_CHAIN)
            .split(',')
            .map(str::trim)
            .filter(|layer| !layer.is_empty())
            .map(str::to_string)
            .collect();

        for layer in CAPABILITY_LAYERS {
            if ctx.model().is_enabled(layer) && !chain.iter().any(|l| l == layer) {
                chain.push(layer.to_string());
            }
        }

        Ok(Arc::new(Self {
            provider: ctx.provider().to_string(),
            chain,
        }))
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.chain.iter().any(|l| l == layer)
    }
}

#[async_trait::async_trait]
impl Manager for MiddlewareManager {
    fn capability(&self) -> &str {
        "middleware"
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
