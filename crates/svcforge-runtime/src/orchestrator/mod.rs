//! Lifecycle orchestrator
//!
//! Owns every manager of a composed service and drives them through
//! `Uninitialized -> Initialized -> Running -> Stopped`.
//!
//! - Managers are instantiated core-first, each group in dependency order.
//! - Connect-step capabilities start by `(phase, dependency order)` and stop
//!   in the exact reverse of the order they actually started in.
//! - A failed start stops whatever already started before the error is
//!   returned.
//! - Health probes are isolated: a probe that panics or hangs is reported
//!   as unreachable without affecting the others.

use crate::catalog::{BuildContext, ManagerCatalog};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::facade::ManagerFacade;
use crate::managers::{ConfigManager, MonitoringManager};
use futures::FutureExt;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use svcforge_kernel::manager::parse_option;
use svcforge_kernel::{
    CapabilityRegistry, CompositionModel, HealthReport, HealthStatus, Manager, ManagerError,
    ManagerResult, StartPhase,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};


/// Where the orchestrator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Deadlines applied to manager lifecycle calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Per-manager `start` deadline.
    pub start_timeout: Duration,
    /// Per-manager `stop` deadline.
    pub stop_timeout: Duration,
    /// Per-manager health probe deadline.
    pub probe_timeout: Duration,
    /// How often [`Orchestrator::run_until`] refreshes the health report.
    pub health_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            health_interval: Duration::from_secs(15),
        }
    }
}

impl OrchestratorConfig {
    /// Read `*_secs` overrides from the `config` capability's options.
    pub fn from_options(options: &BTreeMap<String, String>) -> ManagerResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            start_timeout: seconds(options, "start_timeout_secs", defaults.start_timeout)?,
            stop_timeout: seconds(options, "stop_timeout_secs", defaults.stop_timeout)?,
            probe_timeout: seconds(options, "probe_timeout_secs", defaults.probe_timeout)?,
            health_interval: seconds(options, "health_interval_secs", defaults.health_interval)?,
        })
    }
}

fn seconds(
    options: &BTreeMap<String, String>,
    key: &str,
    default: Duration,
) -> ManagerResult<Duration> {
    let secs: u64 = parse_option(options, key, default.as_secs())?;
    if secs == 0 {
        return Err(ManagerError::invalid_option(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Runtime counterpart of a [`CompositionModel`].
pub struct Orchestrator {
    model: CompositionModel,
    registry: CapabilityRegistry,
    catalog: ManagerCatalog,
    config: OrchestratorConfig,
    config_pinned: bool,
    state: LifecycleState,
    managers: BTreeMap<String, Arc<dyn Manager>>,
    /// Instantiation order.
    instantiated: Vec<String>,
    /// Managers started and not yet stopped, in start order.
    running: Vec<String>,
    start_log: Vec<String>,
    stop_log: Vec<String>,
    health: watch::Sender<HealthReport>,
}

impl Orchestrator {
    pub fn new(model: CompositionModel, registry: CapabilityRegistry, catalog: ManagerCatalog) -> Self {
        let (health, _) = watch::channel(HealthReport::new());
        Self {
            model,
            registry,
            catalog,
            config: OrchestratorConfig::default(),
            config_pinned: false,
            state: LifecycleState::Uninitialized,
            managers: BTreeMap::new(),
            instantiated: Vec::new(),
            running: Vec::new(),
            start_log: Vec::new(),
            stop_log: Vec::new(),
            health,
        }
    }

    /// Use `config` instead of the values found on the `config` capability.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self.config_pinned = true;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn model(&self) -> &CompositionModel {
        &self.model
    }

    /// Capabilities with a live manager, in instantiation order.
    ///
    /// After a failed [`initialize`](Self::initialize) this lists the
    /// managers built before the failure.
    pub fn instantiated(&self) -> Vec<&str> {
        self.instantiated.iter().map(String::as_str).collect()
    }

    /// Every successful `start` call, in order.
    pub fn start_order(&self) -> Vec<&str> {
        self.start_log.iter().map(String::as_str).collect()
    }

    /// Every `stop` call attempted, in order.
    pub fn stop_order(&self) -> Vec<&str> {
        self.stop_log.iter().map(String::as_str).collect()
    }

    /// Live view of the published health report.
    pub fn subscribe_health(&self) -> watch::Receiver<HealthReport> {
        self.health.subscribe()
    }

    // ========================================================================
    // Initialize
    // ========================================================================

    /// Instantiate a manager for every enabled capability.
    ///
    /// Stops at the first failure. Managers built before it are kept and
    /// the state stays `Uninitialized`; calling `initialize` again skips
    /// them and resumes with the rest.
    pub fn initialize(&mut self) -> OrchestratorResult<()> {
        if self.state != LifecycleState::Uninitialized {
            return Err(OrchestratorError::InvalidState {
                expected: "uninitialized",
                actual: self.state,
            });
        }

        let mut order = self.registry.topological_order()?;
        // Stable, so each group keeps its dependency order.
        order.sort_by_key(|capability| !capability.is_core);

        for capability in order {
            let Some(selection) = self.model.selection(&capability.name) else {
                continue;
            };
            if !selection.enabled || self.managers.contains_key(&capability.name) {
                continue;
            }

            let ctx = BuildContext {
                capability,
                selection,
                model: &self.model,
                managers: &self.managers,
                health: &self.health,
            };
            let manager = self.catalog.instantiate(&ctx).map_err(|source| {
                error!(
                    capability = %capability.name,
                    provider = %selection.provider,
                    error = %source,
                    "Failed to instantiate manager"
                );
                OrchestratorError::Instantiation {
                    capability: capability.name.clone(),
                    source,
                }
            })?;

            debug!(capability = %capability.name, provider = %selection.provider, "Manager instantiated");
            self.managers.insert(capability.name.clone(), manager);
            self.instantiated.push(capability.name.clone());
        }

        if !self.config_pinned {
            if let Some(config) = self.manager_as::<ConfigManager>("config") {
                self.config = config.orchestrator_config().clone();
            }
        }

        self.state = LifecycleState::Initialized;
        info!(
            service = %self.model.service_name(),
            managers = self.managers.len(),
            "Managers initialized"
        );
        Ok(())
    }

    // ========================================================================
    // Start / Stop
    // ========================================================================

    /// Connect-step capabilities in start order.
    fn start_plan(&self) -> Vec<(String, Arc<dyn Manager>)> {
        let mut plan: Vec<(StartPhase, usize, &String)> = self
            .instantiated
            .iter()
            .enumerate()
            .filter_map(|(rank, name)| {
                let phase = self.registry.resolve(name)?.start_mode.phase()?;
                Some((phase, rank, name))
            })
            .collect();
        plan.sort();

        plan.into_iter()
            .filter_map(|(_, _, name)| {
                let manager = self.managers.get(name)?.clone();
                Some((name.clone(), manager))
            })
            .collect()
    }

    /// Start every connect-step manager.
    ///
    /// Each start is bounded by `start_timeout` and abandoned as soon as
    /// `cancel` fires. On any failure the managers that did start are
    /// stopped in reverse and the orchestrator ends up `Stopped`.
    pub async fn start(&mut self, cancel: &CancellationToken) -> OrchestratorResult<()> {
        if self.state != LifecycleState::Initialized {
            return Err(OrchestratorError::InvalidState {
                expected: "initialized",
                actual: self.state,
            });
        }

        let start_timeout = self.config.start_timeout;
        for (name, manager) in self.start_plan() {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(OrchestratorError::Cancelled {
                    capability: name.clone(),
                }),
                result = tokio::time::timeout(start_timeout, manager.start()) => match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(source)) => Err(OrchestratorError::Connection {
                        capability: name.clone(),
                        source,
                    }),
                    Err(_) => Err(OrchestratorError::Timeout {
                        capability: name.clone(),
                        after: start_timeout,
                    }),
                },
            };

            match outcome {
                Ok(()) => {
                    info!(capability = %name, provider = manager.provider(), "Manager started");
                    self.running.push(name.clone());
                    self.start_log.push(name);
                }
                Err(err) => {
                    error!(error = %err, "Startup failed, stopping started managers");
                    self.shutdown_started().await;
                    self.state = LifecycleState::Stopped;
                    return Err(err);
                }
            }
        }

        self.state = LifecycleState::Running;
        let report = self.health_check().await;
        info!(
            service = %self.model.service_name(),
            started = self.start_log.len(),
            serving = report.is_serving(),
            "Service running"
        );
        Ok(())
    }

    /// Stop started managers in reverse start order.
    ///
    /// Stopping an already stopped orchestrator is a no-op.
    pub async fn stop(&mut self) -> OrchestratorResult<()> {
        match self.state {
            LifecycleState::Uninitialized => Err(OrchestratorError::InvalidState {
                expected: "initialized or running",
                actual: self.state,
            }),
            LifecycleState::Stopped => {
                debug!("Orchestrator already stopped");
                Ok(())
            }
            LifecycleState::Initialized | LifecycleState::Running => {
                self.shutdown_started().await;
                self.state = LifecycleState::Stopped;
                self.health.send_replace(HealthReport::new());
                info!(service = %self.model.service_name(), "Service stopped");
                Ok(())
            }
        }
    }

    /// Best-effort reverse shutdown. Failures are logged, never returned.
    async fn shutdown_started(&mut self) {
        let stop_timeout = self.config.stop_timeout;
        let mut failed = Vec::new();

        while let Some(name) = self.running.pop() {
            let Some(manager) = self.managers.get(&name).cloned() else {
                continue;
            };
            match tokio::time::timeout(stop_timeout, manager.stop()).await {
                Ok(Ok(())) => info!(capability = %name, "Manager stopped"),
                Ok(Err(e)) => {
                    warn!(capability = %name, error = %e, "Failed to stop manager");
                    failed.push(name.clone());
                }
                Err(_) => {
                    warn!(capability = %name, timeout = ?stop_timeout, "Manager did not stop in time");
                    failed.push(name.clone());
                }
            }
            self.stop_log.push(name);
        }

        if !failed.is_empty() {
            warn!(failed = ?failed, "Shutdown finished with {} failure(s)", failed.len());
        }
    }

    /// Start, wait for `shutdown` or `cancel`, then stop.
    ///
    /// The health report is refreshed every `health_interval` while running.
    pub async fn run_until<F>(&mut self, cancel: &CancellationToken, shutdown: F) -> OrchestratorResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start(cancel).await?;

        let mut ticker = tokio::time::interval(self.config.health_interval);
        // The first tick fires immediately and `start` already probed.
        ticker.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.health_check().await;
                }
            }
        }

        info!("Shutdown requested");
        self.stop().await
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Probe every instantiated manager concurrently.
    ///
    /// The report always holds one entry per manager. While running it is
    /// also published to subscribers and to the monitoring gauge.
    pub async fn health_check(&self) -> HealthReport {
        let probe_timeout = self.config.probe_timeout;
        let probes = self.instantiated.iter().filter_map(|name| {
            let manager = self.managers.get(name)?.clone();
            let name = name.clone();
            Some(async move {
                let probe = AssertUnwindSafe(async move { manager.health_check().await }).catch_unwind();
                let status = match tokio::time::timeout(probe_timeout, probe).await {
                    Ok(Ok(status)) => status,
                    Ok(Err(_)) => {
                        warn!(capability = %name, "Health probe panicked");
                        HealthStatus::Unreachable
                    }
                    Err(_) => {
                        warn!(capability = %name, timeout = ?probe_timeout, "Health probe timed out");
                        HealthStatus::Unreachable
                    }
                };
                (name, status)
            })
        });

        let report: HealthReport = join_all(probes).await.into_iter().collect();

        if self.state == LifecycleState::Running {
            if let Some(monitoring) = self.manager_as::<MonitoringManager>("monitoring") {
                monitoring.record_health(&report);
            }
            self.health.send_replace(report.clone());
        }
        report
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Facade over the instantiated managers.
    ///
    /// Only available once initialization has completed.
    pub fn facade(&self) -> OrchestratorResult<ManagerFacade> {
        match self.state {
            LifecycleState::Initialized | LifecycleState::Running => {
                Ok(ManagerFacade::new(self.managers.clone()))
            }
            actual => Err(OrchestratorError::InvalidState {
                expected: "initialized or running",
                actual,
            }),
        }
    }

    fn manager_as<T: Manager + 'static>(&self, capability: &str) -> Option<Arc<T>> {
        self.managers
            .get(capability)?
            .clone()
            .into_any_arc()
            .downcast::<T>()
            .ok()
    }
}
