//! Read-only access to instantiated managers.

use std::collections::BTreeMap;
use std::sync::Arc;
use svcforge_kernel::Manager;

/// Uniform lookup of managers by capability name.
///
/// The facade is a frozen snapshot taken after initialization, so request
/// handlers can share it across tasks without locking.
#[derive(Clone, Default)]
pub struct ManagerFacade {
    managers: Arc<BTreeMap<String, Arc<dyn Manager>>>,
}

impl ManagerFacade {
    pub(crate) fn new(managers: BTreeMap<String, Arc<dyn Manager>>) -> Self {
        Self {
            managers: Arc::new(managers),
        }
    }

    /// Manager for `capability`, if it was instantiated.
    pub fn get_manager(&self, capability: &str) -> Option<Arc<dyn Manager>> {
        self.managers.get(capability).cloned()
    }

    /// Manager for `capability`, downcast to its concrete type.
    pub fn get<T: Manager + 'static>(&self, capability: &str) -> Option<Arc<T>> {
        self.get_manager(capability)?
            .into_any_arc()
            .downcast::<T>()
            .ok()
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.managers.contains_key(capability)
    }

    /// Capability names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.managers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl std::fmt::Debug for ManagerFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerFacade")
            .field("managers", &self.managers.keys().collect::<Vec<_>>())
            .finish()
    }
}
