use std::marker::PhantomData;

use bitvec::vec::BitVec;
use elsa::FrozenMap;

use crate::internal::arena::{Arena, ArenaId};
use crate::internal::frozen_copy_map::FrozenCopyMap;
use crate::internal::id::{CapabilityId, DependenciesId, NameId, SolvableId};
use crate::{CapabilityIndex, Dependencies, PackageName, Pool, VersionSet};

/// Keeps a cache of previously requested information about resolvables and capabilities.
///
/// The index is asked at most once per capability and once per resolvable. All resolver queues
/// share the same cache, which is what makes cloning a resolution context cheap: a context only
/// holds ids into the data stored here.
pub(crate) struct SolverCache<VS: VersionSet, N: PackageName, I: CapabilityIndex<VS, N>> {
    index: I,

    /// A mapping of `CapabilityId` to the providers of that capability, in index order.
    capability_providers: FrozenMap<CapabilityId, Vec<SolvableId>>,

    /// A mapping from a resolvable to its dependencies
    solvable_dependencies: Arena<DependenciesId, Dependencies>,
    solvable_to_dependencies: FrozenCopyMap<SolvableId, DependenciesId>,

    /// The resolvables that are part of the system before the transaction
    baseline: BitVec,
    baseline_ids: Vec<SolvableId>,

    _data: PhantomData<(VS, N)>,
}

impl<VS: VersionSet, N: PackageName, I: CapabilityIndex<VS, N>> SolverCache<VS, N, I> {
    /// Constructs a new instance from an index.
    pub(crate) fn new(index: I) -> Self {
        let mut baseline_ids = index.installed();
        baseline_ids.sort();
        baseline_ids.dedup();

        let mut baseline = BitVec::new();
        for id in &baseline_ids {
            let idx = id.to_usize();
            if baseline.len() <= idx {
                baseline.resize(idx + 1, false);
            }
            baseline.set(idx, true);
        }

        Self {
            index,
            capability_providers: Default::default(),
            solvable_dependencies: Default::default(),
            solvable_to_dependencies: Default::default(),
            baseline,
            baseline_ids,
            _data: Default::default(),
        }
    }

    /// Returns a reference to the pool used by the solver
    pub(crate) fn pool(&self) -> &Pool<VS, N> {
        self.index.pool()
    }

    pub(crate) fn index(&self) -> &I {
        &self.index
    }

    /// Returns the providers of a capability. This will either ask the [`CapabilityIndex`] for
    /// the entries or return a cached value.
    pub(crate) fn get_or_cache_providers(&self, capability: CapabilityId) -> &[SolvableId] {
        match self.capability_providers.get(&capability) {
            Some(providers) => providers,
            None => {
                let providers = self.index.providers_of(capability);
                self.capability_providers.insert(capability, providers)
            }
        }
    }

    /// Returns the dependencies of a resolvable. Requests them from the [`CapabilityIndex`] if
    /// they are not known yet.
    pub(crate) fn get_or_cache_dependencies(&self, solvable_id: SolvableId) -> &Dependencies {
        let dependencies_id = match self.solvable_to_dependencies.get_copy(&solvable_id) {
            Some(id) => id,
            None => {
                let dependencies = self.index.dependencies_of(solvable_id);
                let dependencies_id = self.solvable_dependencies.alloc(dependencies);
                self.solvable_to_dependencies
                    .insert_copy(solvable_id, dependencies_id);
                dependencies_id
            }
        };

        &self.solvable_dependencies[dependencies_id]
    }

    /// Returns true if the resolvable provides the capability.
    pub(crate) fn provides(&self, solvable: SolvableId, capability: CapabilityId) -> bool {
        self.get_or_cache_providers(capability).contains(&solvable)
    }

    /// Returns true if the resolvable is part of the system before the transaction.
    pub(crate) fn is_baseline(&self, solvable: SolvableId) -> bool {
        self.baseline
            .get(solvable.to_usize())
            .as_deref()
            .copied()
            .unwrap_or(false)
    }

    /// The resolvables that are part of the system before the transaction, sorted by id.
    pub(crate) fn baseline(&self) -> &[SolvableId] {
        &self.baseline_ids
    }

    pub(crate) fn name_of(&self, solvable: SolvableId) -> NameId {
        self.pool().resolve_solvable(solvable).name
    }
}
