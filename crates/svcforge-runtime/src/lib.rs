//! svcforge Runtime
//!
//! The dynamic composer: turns a validated [`CompositionModel`] into a live
//! set of capability managers.
//!
//! ```rust,ignore
//! use svcforge_kernel::{CapabilityRegistry, CompositionBuilder};
//! use svcforge_runtime::{ManagerCatalog, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = CapabilityRegistry::standard();
//! registry.validate_acyclic()?;
//! let model = CompositionBuilder::new(&registry, "orders").build()?;
//!
//! let catalog = ManagerCatalog::standard(&registry);
//! let mut orchestrator = Orchestrator::new(model, registry, catalog);
//! orchestrator.initialize()?;
//! orchestrator.start(&CancellationToken::new()).await?;
//! let facade = orchestrator.facade()?;
//! // hand `facade` to request handlers ...
//! orchestrator.stop().await?;
//! ```
//!
//! [`CompositionModel`]: svcforge_kernel::CompositionModel

pub mod catalog;
pub mod error;
pub mod facade;
pub mod managers;
pub mod orchestrator;

pub use catalog::{BuildContext, ManagerCatalog, ManagerFactory, ProviderFactory};
pub use error::{OrchestratorError, OrchestratorResult};
pub use facade::ManagerFacade;
pub use orchestrator::{LifecycleState, Orchestrator, OrchestratorConfig};
