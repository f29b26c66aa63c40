//! svcforge Kernel
//!
//! Core types shared by the static composer (project generator) and the
//! dynamic composer (lifecycle orchestrator):
//!
//! - [`capability`]: the fixed capability catalog and its dependency graph
//! - [`model`]: the validated, read-only composition model and its builder
//! - [`manager`]: the uniform manager/provider lifecycle contract
//! - [`health`]: health status reported by managers
//! - [`config`]: selection file loading (YAML, TOML, JSON) with env substitution

pub mod capability;
pub mod config;
pub mod error;
pub mod health;
pub mod manager;
pub mod model;

pub use capability::{Capability, CapabilityRegistry, StartMode, StartPhase};
pub use error::{RegistryError, RegistryResult, ValidationError, ValidationIssue};
pub use health::{HealthReport, HealthStatus};
pub use manager::{Manager, ManagerError, ManagerResult, Provider};
pub use model::{CompositionBuilder, CompositionModel, Selection, ServiceType};
