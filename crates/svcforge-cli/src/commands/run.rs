//! `svcforge run` command implementation
//!
//! Boots a composition in-process: the core managers serve `/health`,
//! `/ready` and `/metrics` until Ctrl-C.

use crate::cli::SelectionArgs;
use crate::selection::build_model;
use crate::{CliError, CliResult};
use colored::Colorize;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use svcforge_kernel::{
    CapabilityRegistry, HealthStatus, ManagerError, ManagerResult, Provider, Selection,
};
use svcforge_runtime::{ManagerCatalog, Orchestrator};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Execute the `svcforge run` command
pub async fn run(name: Option<&str>, selection: &SelectionArgs, simulate: bool) -> CliResult<()> {
    let registry = CapabilityRegistry::standard();
    registry.validate_acyclic()?;
    let model = build_model(&registry, name, selection)?;

    let external: Vec<String> = registry
        .optional()
        .filter(|c| c.start_mode.phase().is_some() && model.is_enabled(&c.name))
        .map(|c| c.name.clone())
        .collect();

    let mut catalog = ManagerCatalog::standard(&registry);
    if !external.is_empty() {
        if !simulate {
            return Err(CliError::Other(format!(
                "capabilities without a built-in backend: {} (rerun with --simulate)",
                external.join(", ")
            )));
        }
        for capability in &external {
            if let Some(provider) = model.provider(capability) {
                catalog.register_provider(capability, provider, SimulatedProvider::create);
            }
        }
    }

    println!(
        "{} Running {} ({} capabilities)",
        "→".green(),
        model.service_name().cyan(),
        model.enabled().count()
    );
    if simulate && !external.is_empty() {
        println!("  Simulated: {}", external.join(", ").yellow());
    }

    let mut orchestrator = Orchestrator::new(model, registry, catalog);
    orchestrator.initialize()?;

    let cancel = CancellationToken::new();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    orchestrator.run_until(&cancel, shutdown).await?;

    println!("{} Stopped", "✓".green());
    Ok(())
}

/// Stand-in backend that connects instantly and always reports healthy.
struct SimulatedProvider {
    name: String,
    options: BTreeMap<String, String>,
    connected: AtomicBool,
}

impl SimulatedProvider {
    fn create(selection: &Selection) -> ManagerResult<Box<dyn Provider>> {
        Ok(Box::new(Self {
            name: selection.provider.clone(),
            options: BTreeMap::new(),
            connected: AtomicBool::new(false),
        }))
    }
}

#[async_trait::async_trait]
impl Provider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, options: &BTreeMap<String, String>) -> ManagerResult<()> {
        self.options = options.clone();
        Ok(())
    }

    async fn connect(&self) -> ManagerResult<()> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(ManagerError::Connect(format!("{} already connected", self.name)));
        }
        info!(provider = %self.name, options = self.options.len(), "Simulated backend connected");
        Ok(())
    }

    async fn close(&self) -> ManagerResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        debug!(provider = %self.name, "Simulated backend closed");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if self.connected.load(Ordering::SeqCst) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unreachable
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
