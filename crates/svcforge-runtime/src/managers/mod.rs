//! Built-in managers
//!
//! Core capabilities (config, logging, monitoring, middleware,
//! communication) have dedicated managers. Optional capabilities are served
//! either by [`InProcessManager`] (no connect step) or by
//! [`ProviderManager`], which drives an externally supplied [`Provider`].
//!
//! [`Provider`]: svcforge_kernel::Provider

mod communication;
mod config;
mod in_process;
mod logging;
mod middleware;
mod monitoring;
mod provider;

pub use communication::CommunicationManager;
pub use config::ConfigManager;
pub use in_process::InProcessManager;
pub use logging::{LogFormat, LoggingManager};
pub use middleware::MiddlewareManager;
pub use monitoring::MonitoringManager;
pub use provider::ProviderManager;
