use std::cmp::Ordering;
use std::collections::HashMap;

use bitvec::vec::BitVec;

use crate::internal::arena::ArenaId;
use crate::internal::id::{CapabilityId, NameId, SolvableId};
use crate::internal::mapping::Mapping;
use crate::{CapabilityIndex, Dependencies, PackageName, Pool, VersionSet};

/// The repository priority assigned by [`InMemoryIndex::add_resolvable`].
pub const DEFAULT_PRIORITY: u32 = 99;

/// How a resolvable provides a name.
enum Provided<V> {
    /// The implicit provide of the resolvable's own name at its own version
    Own,
    /// A provide without a version, matches any version set on the name
    Unversioned,
    /// A provide at an explicit version
    Version(V),
}

struct ResolvableRecord {
    priority: u32,
    dependencies: Dependencies,
}

/// A [`CapabilityIndex`] that keeps all resolvables in memory.
///
/// Every resolvable provides its own name at its own version. Additional provides can be added
/// with [`Self::add_provides`]. [`CapabilityIndex::providers_of`] returns providers ordered by
/// repository priority (lower value first), then version (highest first), then name, then the
/// order in which the resolvables were added.
pub struct InMemoryIndex<VS: VersionSet, N: PackageName = String> {
    pool: Pool<VS, N>,
    records: Mapping<SolvableId, ResolvableRecord>,
    provides: HashMap<NameId, Vec<(SolvableId, Provided<VS::V>)>>,
    installed: BitVec,
}

impl<VS: VersionSet, N: PackageName> Default for InMemoryIndex<VS, N> {
    fn default() -> Self {
        Self {
            pool: Pool::new(),
            records: Mapping::new(),
            provides: HashMap::new(),
            installed: BitVec::new(),
        }
    }
}

impl<VS: VersionSet, N: PackageName + Clone> InMemoryIndex<VS, N> {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resolvable with the [`DEFAULT_PRIORITY`].
    pub fn add_resolvable(&mut self, name: impl Into<N>, version: VS::V) -> SolvableId {
        self.add_resolvable_with_priority(name, version, DEFAULT_PRIORITY)
    }

    /// Adds a resolvable that originates from a repository with the given priority. Providers
    /// from repositories with a lower priority value are preferred.
    pub fn add_resolvable_with_priority(
        &mut self,
        name: impl Into<N>,
        version: VS::V,
        priority: u32,
    ) -> SolvableId {
        let name_id = self.pool.intern_package_name(name);
        let solvable_id = self.pool.intern_solvable(name_id, version);
        self.records.insert(
            solvable_id,
            ResolvableRecord {
                priority,
                dependencies: Dependencies::default(),
            },
        );
        self.provides
            .entry(name_id)
            .or_default()
            .push((solvable_id, Provided::Own));
        solvable_id
    }

    /// Declares that the resolvable provides `name`, optionally at a specific version.
    pub fn add_provides(&mut self, solvable: SolvableId, name: impl Into<N>, version: Option<VS::V>) {
        let name_id = self.pool.intern_package_name(name);
        let provided = match version {
            Some(version) => Provided::Version(version),
            None => Provided::Unversioned,
        };
        self.provides
            .entry(name_id)
            .or_default()
            .push((solvable, provided));
    }

    /// Declares that the resolvable requires a provider of `name` matching `version_set`.
    ///
    /// Panics if the resolvable was not added to this index, the same holds for the other
    /// `add_*` dependency functions.
    pub fn add_requires(&mut self, solvable: SolvableId, name: impl Into<N>, version_set: VS) {
        let capability = self.capability(name, version_set);
        self.dependencies_mut(solvable).requires.push(capability);
    }

    /// Declares that the resolvable cannot be present together with a provider of `name` matching
    /// `version_set`.
    pub fn add_conflicts(&mut self, solvable: SolvableId, name: impl Into<N>, version_set: VS) {
        let capability = self.capability(name, version_set);
        self.dependencies_mut(solvable).conflicts.push(capability);
    }

    /// Declares that installing the resolvable replaces present providers of `name` matching
    /// `version_set`.
    pub fn add_obsoletes(&mut self, solvable: SolvableId, name: impl Into<N>, version_set: VS) {
        let capability = self.capability(name, version_set);
        self.dependencies_mut(solvable).obsoletes.push(capability);
    }

    /// Declares a soft requirement of the resolvable.
    pub fn add_recommends(&mut self, solvable: SolvableId, name: impl Into<N>, version_set: VS) {
        let capability = self.capability(name, version_set);
        self.dependencies_mut(solvable).recommends.push(capability);
    }

    /// Declares an informational suggestion of the resolvable.
    pub fn add_suggests(&mut self, solvable: SolvableId, name: impl Into<N>, version_set: VS) {
        let capability = self.capability(name, version_set);
        self.dependencies_mut(solvable).suggests.push(capability);
    }

    /// Marks the resolvable as part of the system before the transaction.
    pub fn set_installed(&mut self, solvable: SolvableId, installed: bool) {
        let index = solvable.to_usize();
        if index >= self.installed.len() {
            self.installed.resize(index + 1, false);
        }
        self.installed.set(index, installed);
    }

    /// Interns the capability `name version_set` in the pool of this index.
    pub fn capability(&self, name: impl Into<N>, version_set: VS) -> CapabilityId {
        let name_id = self.pool.intern_package_name(name);
        self.pool.intern_capability(name_id, version_set)
    }

    /// Returns the number of resolvables in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the index contains no resolvables.
    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    fn dependencies_mut(&mut self, solvable: SolvableId) -> &mut Dependencies {
        &mut self
            .records
            .get_mut(solvable)
            .expect("the resolvable was not added to this index")
            .dependencies
    }

    fn priority(&self, solvable: SolvableId) -> u32 {
        self.records
            .get(solvable)
            .map_or(DEFAULT_PRIORITY, |record| record.priority)
    }

    fn compare_providers(&self, a: SolvableId, b: SolvableId) -> Ordering
    where
        N: Ord,
    {
        let solvable_a = self.pool.resolve_solvable(a);
        let solvable_b = self.pool.resolve_solvable(b);
        self.priority(a)
            .cmp(&self.priority(b))
            .then_with(|| solvable_b.inner.cmp(&solvable_a.inner))
            .then_with(|| {
                self.pool
                    .resolve_package_name(solvable_a.name)
                    .cmp(self.pool.resolve_package_name(solvable_b.name))
            })
            .then_with(|| a.cmp(&b))
    }
}

impl<VS: VersionSet, N: PackageName + Clone + Ord> CapabilityIndex<VS, N> for InMemoryIndex<VS, N> {
    fn pool(&self) -> &Pool<VS, N> {
        &self.pool
    }

    fn providers_of(&self, capability: CapabilityId) -> Vec<SolvableId> {
        let name = self.pool.resolve_capability_name(capability);
        let version_set = self.pool.resolve_capability(capability);
        let Some(provides) = self.provides.get(&name) else {
            return Vec::new();
        };

        let mut providers: Vec<SolvableId> = provides
            .iter()
            .filter(|(solvable, provided)| match provided {
                Provided::Own => version_set.contains(&self.pool.resolve_solvable(*solvable).inner),
                Provided::Unversioned => true,
                Provided::Version(version) => version_set.contains(version),
            })
            .map(|(solvable, _)| *solvable)
            .collect();

        providers.sort_by(|&a, &b| self.compare_providers(a, b));
        providers.dedup();
        providers
    }

    fn dependencies_of(&self, solvable: SolvableId) -> Dependencies {
        self.records
            .get(solvable)
            .map(|record| record.dependencies.clone())
            .unwrap_or_default()
    }

    fn is_installed(&self, solvable: SolvableId) -> bool {
        self.installed
            .get(solvable.to_usize())
            .is_some_and(|bit| *bit)
    }

    fn installed(&self) -> Vec<SolvableId> {
        self.installed
            .iter_ones()
            .map(SolvableId::from_usize)
            .collect()
    }
}
