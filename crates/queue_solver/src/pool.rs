use std::fmt::{Display, Formatter};

use crate::internal::arena::Arena;
use crate::internal::frozen_copy_map::FrozenCopyMap;
use crate::internal::id::{CapabilityId, NameId, SolvableId};
use crate::solvable::Solvable;
use crate::{PackageName, VersionSet};

/// A pool that interns the names, resolvables and capabilities the resolver works with.
///
/// A pool never releases its memory until it is dropped. References returned by the pool remain
/// valid for the lifetime of the pool, which allows inserting into the pool without requiring a
/// mutable reference. Everything else in this crate refers to pool entries by id only.
pub struct Pool<VS: VersionSet, N: PackageName = String> {
    /// All the resolvables that have been registered
    solvables: Arena<SolvableId, Solvable<VS::V>>,

    /// Interned resolvable names
    package_names: Arena<NameId, N>,

    /// Map from names to the id of their interned counterpart
    names_to_ids: FrozenCopyMap<N, NameId>,

    /// Interned capabilities
    capabilities: Arena<CapabilityId, (NameId, VS)>,

    /// Map from capability to the id of their interned counterpart
    capability_to_id: FrozenCopyMap<(NameId, VS), CapabilityId>,
}

impl<VS: VersionSet, N: PackageName> Default for Pool<VS, N> {
    fn default() -> Self {
        Self {
            solvables: Arena::new(),
            package_names: Arena::new(),
            names_to_ids: Default::default(),
            capabilities: Arena::new(),
            capability_to_id: Default::default(),
        }
    }
}

impl<VS: VersionSet, N: PackageName> Pool<VS, N> {
    /// Creates a new [`Pool`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a name into the `Pool`, returning its `NameId`. Names are deduplicated. If the same
    /// name is inserted twice the same `NameId` will be returned.
    ///
    /// The original name can be resolved using the [`Self::resolve_package_name`] function.
    pub fn intern_package_name<NValue>(&self, name: NValue) -> NameId
    where
        NValue: Into<N>,
        N: Clone,
    {
        let name = name.into();
        if let Some(id) = self.names_to_ids.get_copy(&name) {
            return id;
        }

        let next_id = self.package_names.alloc(name.clone());
        self.names_to_ids.insert_copy(name, next_id);
        next_id
    }

    /// Returns the name associated with the provided [`NameId`].
    ///
    /// Panics if the name is not found in the pool.
    pub fn resolve_package_name(&self, name_id: NameId) -> &N {
        &self.package_names[name_id]
    }

    /// Returns the [`NameId`] associated with the specified name or `None` if the name has not
    /// previously been interned using [`Self::intern_package_name`].
    pub fn lookup_package_name(&self, name: &N) -> Option<NameId> {
        self.names_to_ids.get_copy(name)
    }

    /// Adds a resolvable to the pool and returns its [`SolvableId`].
    ///
    /// Unlike the other interning functions this function does *not* deduplicate. A unique id is
    /// returned every time this function is called.
    pub fn intern_solvable(&self, name_id: NameId, record: VS::V) -> SolvableId {
        self.solvables.alloc(Solvable::new(name_id, record))
    }

    /// Returns the resolvable associated to the provided id
    ///
    /// Panics if the resolvable is not found in the pool
    pub fn resolve_solvable(&self, id: SolvableId) -> &Solvable<VS::V> {
        &self.solvables[id]
    }

    /// Returns the number of resolvables in the pool.
    pub fn solvable_count(&self) -> usize {
        self.solvables.len()
    }

    /// Returns an iterator over all resolvables in the order they were added.
    pub fn solvables(&self) -> impl Iterator<Item = (SolvableId, &Solvable<VS::V>)> + '_ {
        self.solvables.iter()
    }

    /// Interns a capability into the [`Pool`], returning its [`CapabilityId`].
    ///
    /// A capability is a name together with the version set a provider of that name has to match.
    /// Capabilities are deduplicated: interning the same pair twice returns the same id.
    pub fn intern_capability(&self, package_name: NameId, version_set: VS) -> CapabilityId {
        if let Some(entry) = self
            .capability_to_id
            .get_copy(&(package_name, version_set.clone()))
        {
            entry
        } else {
            let id = self.capabilities.alloc((package_name, version_set.clone()));
            self.capability_to_id
                .insert_copy((package_name, version_set), id);
            id
        }
    }

    /// Returns the version set of the capability
    ///
    /// Panics if the capability is not found in the pool
    pub fn resolve_capability(&self, id: CapabilityId) -> &VS {
        &self.capabilities[id].1
    }

    /// Returns the name of the capability
    ///
    /// Panics if the capability is not found in the pool
    pub fn resolve_capability_name(&self, id: CapabilityId) -> NameId {
        self.capabilities[id].0
    }
}

/// A helper struct to visualize a name.
pub struct NameDisplay<'pool, VS: VersionSet, N: PackageName> {
    id: NameId,
    pool: &'pool Pool<VS, N>,
}

impl<VS: VersionSet, N: PackageName + Display> Display for NameDisplay<'_, VS, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.pool.resolve_package_name(self.id);
        write!(f, "{}", name)
    }
}

impl NameId {
    /// Returns an object that can be used to format the name.
    pub fn display<VS: VersionSet, N: PackageName + Display>(
        self,
        pool: &Pool<VS, N>,
    ) -> NameDisplay<'_, VS, N> {
        NameDisplay { id: self, pool }
    }
}

/// A helper struct to visualize a capability as `name version-set`.
pub struct CapabilityDisplay<'pool, VS: VersionSet, N: PackageName> {
    id: CapabilityId,
    pool: &'pool Pool<VS, N>,
}

impl<VS: VersionSet, N: PackageName + Display> Display for CapabilityDisplay<'_, VS, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.pool.resolve_capability_name(self.id);
        let version_set = self.pool.resolve_capability(self.id);
        write!(f, "{} {}", name.display(self.pool), version_set)
    }
}

impl CapabilityId {
    /// Returns an object that can be used to format the capability.
    pub fn display<VS: VersionSet, N: PackageName + Display>(
        self,
        pool: &Pool<VS, N>,
    ) -> CapabilityDisplay<'_, VS, N> {
        CapabilityDisplay { id: self, pool }
    }
}
