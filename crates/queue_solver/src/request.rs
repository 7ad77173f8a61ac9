use indexmap::IndexSet;

use crate::internal::id::{CapabilityId, SolvableId};

/// Configures what [`crate::Solver`] should resolve.
///
/// Every list is deduplicated and keeps the order in which entries were first added, that order
/// is the order in which the initial decision items are queued.
#[derive(Default, Clone, Debug)]
pub struct Request {
    pub(crate) install: IndexSet<SolvableId>,
    pub(crate) remove: IndexSet<SolvableId>,
    pub(crate) require: IndexSet<CapabilityId>,
    pub(crate) conflict: IndexSet<CapabilityId>,
}

impl Request {
    /// Creates an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// The specified resolvable must be installed
    pub fn install(&mut self, id: SolvableId) -> &mut Self {
        self.install.insert(id);
        self
    }

    /// The specified resolvable must be removed from the system
    pub fn remove(&mut self, id: SolvableId) -> &mut Self {
        self.remove.insert(id);
        self
    }

    /// Something that provides the capability must be present after the transaction. This does
    /// not pick a provider, the solver does.
    pub fn require(&mut self, capability: CapabilityId) -> &mut Self {
        self.require.insert(capability);
        self
    }

    /// Nothing that provides the capability may be present after the transaction.
    pub fn conflict(&mut self, capability: CapabilityId) -> &mut Self {
        self.conflict.insert(capability);
        self
    }

    /// Returns true if nothing was requested.
    pub fn is_empty(&self) -> bool {
        self.install.is_empty()
            && self.remove.is_empty()
            && self.require.is_empty()
            && self.conflict.is_empty()
    }
}
