use std::fmt::{Display, Formatter};

use bitvec::vec::BitVec;
use indexmap::IndexSet;

use crate::internal::arena::ArenaId;
use crate::internal::id::{CapabilityId, SolvableId};
use crate::problem::ProblemCause;
use crate::{PackageName, Pool, VersionSet};

/// The proposed status of a resolvable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) enum Status {
    /// Nothing was decided about the resolvable
    #[default]
    Unknown,
    /// The resolvable will be installed by the transaction
    ToInstall,
    /// The resolvable is or will be absent after the transaction
    ToRemove,
    /// The resolvable is part of the system and stays there
    Established,
}

impl Status {
    pub(crate) fn is_present(self) -> bool {
        matches!(self, Status::ToInstall | Status::Established)
    }
}

/// A dense map of the status of every resolvable, indexed by id.
#[derive(Clone, Default, PartialEq, Eq)]
struct StatusMap {
    map: Vec<Status>,
}

impl StatusMap {
    fn get(&self, solvable_id: SolvableId) -> Status {
        self.map
            .get(solvable_id.to_usize())
            .copied()
            .unwrap_or_default()
    }

    fn set(&mut self, solvable_id: SolvableId, status: Status) {
        let idx = solvable_id.to_usize();
        if idx >= self.map.len() {
            self.map.resize(idx + 1, Status::Unknown);
        }
        self.map[idx] = status;
    }

    /// Iterates over all resolvables that have a status other than [`Status::Unknown`], in id
    /// order.
    fn iter(&self) -> impl Iterator<Item = (SolvableId, Status)> + '_ {
        self.map
            .iter()
            .enumerate()
            .filter(|(_, status)| **status != Status::Unknown)
            .map(|(idx, status)| (SolvableId::from_usize(idx), *status))
    }
}

/// The state of one branch of the search: the proposed status of every resolvable it touched and
/// the constraints that were added on top of the resolvables' own relations.
///
/// A context is owned by exactly one resolver queue. It is cloned when a queue is split and the
/// clones never share mutable state.
#[derive(Clone)]
pub(crate) struct ResolutionContext {
    status: StatusMap,

    extra_requires: IndexSet<CapabilityId>,
    extra_conflicts: IndexSet<CapabilityId>,

    /// Conflicts declared by resolvables, together with the resolvable that declared them. A
    /// conflict only applies while its source is present.
    conflicts: Vec<(CapabilityId, SolvableId)>,

    /// Resolvables whose conflicts have already been registered in this context
    established: BitVec,

    /// The first reason this context became invalid. Never cleared once set.
    invalid: Option<ProblemCause>,
}

impl ResolutionContext {
    pub(crate) fn new() -> Self {
        Self {
            status: StatusMap::default(),
            extra_requires: IndexSet::new(),
            extra_conflicts: IndexSet::new(),
            conflicts: Vec::new(),
            established: BitVec::new(),
            invalid: None,
        }
    }

    pub(crate) fn status(&self, solvable_id: SolvableId) -> Status {
        self.status.get(solvable_id)
    }

    /// Returns true if the resolvable will be present after the transaction.
    pub(crate) fn is_installed(&self, solvable_id: SolvableId) -> bool {
        self.status(solvable_id).is_present()
    }

    pub(crate) fn is_to_remove(&self, solvable_id: SolvableId) -> bool {
        self.status(solvable_id) == Status::ToRemove
    }

    pub(crate) fn is_unknown(&self, solvable_id: SolvableId) -> bool {
        self.status(solvable_id) == Status::Unknown
    }

    /// Marks the resolvable for installation.
    ///
    /// Returns true if the status changed. Installing a resolvable that is marked for removal
    /// invalidates the context.
    pub(crate) fn install(&mut self, solvable_id: SolvableId) -> bool {
        match self.status(solvable_id) {
            Status::ToInstall | Status::Established => false,
            Status::ToRemove => {
                self.set_invalid(ProblemCause::Contradiction {
                    solvable: solvable_id,
                });
                false
            }
            Status::Unknown => {
                self.status.set(solvable_id, Status::ToInstall);
                true
            }
        }
    }

    /// Marks the resolvable for removal.
    ///
    /// Returns true if the status changed. Removing a resolvable that is marked for installation
    /// invalidates the context.
    pub(crate) fn remove(&mut self, solvable_id: SolvableId) -> bool {
        match self.status(solvable_id) {
            Status::ToRemove => false,
            Status::ToInstall => {
                self.set_invalid(ProblemCause::Contradiction {
                    solvable: solvable_id,
                });
                false
            }
            Status::Unknown | Status::Established => {
                self.status.set(solvable_id, Status::ToRemove);
                true
            }
        }
    }

    /// Marks a resolvable that is part of the system as staying there. Does nothing if something
    /// was already decided about the resolvable.
    pub(crate) fn establish(&mut self, solvable_id: SolvableId) -> bool {
        if self.is_unknown(solvable_id) {
            self.status.set(solvable_id, Status::Established);
            true
        } else {
            false
        }
    }

    /// Returns true the first time it is called for a resolvable, after which its conflicts are
    /// considered registered.
    pub(crate) fn mark_established(&mut self, solvable_id: SolvableId) -> bool {
        let idx = solvable_id.to_usize();
        if self.established.len() <= idx {
            self.established.resize(idx + 1, false);
        }
        !self.established.replace(idx, true)
    }

    /// Records that `source` conflicts with every provider of `capability`.
    pub(crate) fn add_conflict(&mut self, capability: CapabilityId, source: SolvableId) {
        if !self.conflicts.contains(&(capability, source)) {
            self.conflicts.push((capability, source));
        }
    }

    /// Iterates over the conflicts whose source is currently present.
    pub(crate) fn active_conflicts(&self) -> impl Iterator<Item = (CapabilityId, SolvableId)> + '_ {
        self.conflicts
            .iter()
            .copied()
            .filter(|&(_, source)| self.is_installed(source))
    }

    pub(crate) fn add_extra_dependency(&mut self, capability: CapabilityId) -> bool {
        self.extra_requires.insert(capability)
    }

    pub(crate) fn add_extra_conflict(&mut self, capability: CapabilityId) -> bool {
        self.extra_conflicts.insert(capability)
    }

    pub(crate) fn extra_requires(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.extra_requires.iter().copied()
    }

    pub(crate) fn extra_conflicts(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.extra_conflicts.iter().copied()
    }

    /// Iterates over the resolvables that are present, in id order.
    pub(crate) fn present(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.status
            .iter()
            .filter(|(_, status)| status.is_present())
            .map(|(id, _)| id)
    }

    /// Iterates over the resolvables with the given status, in id order.
    pub(crate) fn with_status(&self, status: Status) -> impl Iterator<Item = SolvableId> + '_ {
        self.status
            .iter()
            .filter(move |(_, s)| *s == status)
            .map(|(id, _)| id)
    }

    /// Marks the context as invalid. Only the first cause is kept.
    pub(crate) fn set_invalid(&mut self, cause: ProblemCause) {
        if self.invalid.is_none() {
            self.invalid = Some(cause);
        }
    }

    pub(crate) fn is_invalid(&self) -> bool {
        self.invalid.is_some()
    }

    pub(crate) fn problem(&self) -> Option<ProblemCause> {
        self.invalid
    }

    /// Returns an object that can be used to display the context in a human readable fashion.
    pub(crate) fn display<'a, VS: VersionSet, N: PackageName + Display>(
        &'a self,
        pool: &'a Pool<VS, N>,
    ) -> ContextDisplay<'a, VS, N> {
        ContextDisplay { context: self, pool }
    }
}

pub(crate) struct ContextDisplay<'a, VS: VersionSet, N: PackageName + Display> {
    context: &'a ResolutionContext,
    pool: &'a Pool<VS, N>,
}

impl<VS: VersionSet, N: PackageName + Display> Display for ContextDisplay<'_, VS, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (id, status) in self.context.status.iter() {
            writeln!(f, "{} := {:?}", id.display(self.pool), status)?;
        }
        for capability in self.context.extra_requires() {
            writeln!(f, "requires {}", capability.display(self.pool))?;
        }
        for capability in self.context.extra_conflicts() {
            writeln!(f, "conflicts {}", capability.display(self.pool))?;
        }
        if let Some(problem) = self.context.invalid {
            writeln!(f, "invalid: {problem:?}")?;
        }
        Ok(())
    }
}
