use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::internal::id::{CapabilityId, SolvableId};
use crate::problem::ProblemCause;
use crate::solver::cache::SolverCache;
use crate::solver::context::{ResolutionContext, Status};
use crate::solver::SolverOptions;
use crate::{CapabilityIndex, PackageName, Pool, VersionSet};

/// A unit of pending work in a resolver queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecisionItem {
    /// Mark the resolvable for installation and establish it afterwards
    Install(SolvableId),

    /// Make sure the requirements of a present resolvable are provided
    Establish(SolvableId),

    /// Mark the resolvable for removal. Present resolvables that depend on it are removed as well
    /// if `remove_only` is set, otherwise a replacement provider is looked for.
    Remove {
        solvable: SolvableId,
        remove_only: bool,
    },

    /// Check that a resolvable of the system still has its requirements provided
    Verify(SolvableId),

    /// Something must provide the capability
    ExtraDependency(CapabilityId),

    /// Nothing may provide the capability
    ExtraConflict(CapabilityId),

    /// A requirement with more than one viable provider. `optional` requirements may also be left
    /// unsatisfied.
    Branch {
        capability: CapabilityId,
        required_by: Option<SolvableId>,
        alternatives: Vec<SolvableId>,
        optional: bool,
    },
}

/// The result of processing a single [`DecisionItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The item was handled, follow-up items (if any) were queued
    Done,

    /// The item is a branch point that has to be split over the given alternatives
    Branch(Vec<SolvableId>),

    /// The item cannot be decided yet and has to move to the end of the queue
    Defer,

    /// The context cannot lead to a solution
    Invalidate(ProblemCause),
}

impl DecisionItem {
    pub(crate) fn is_branch(&self) -> bool {
        matches!(self, DecisionItem::Branch { .. })
    }

    /// Replaces the alternatives of a branch item. Other items are returned as-is.
    pub(crate) fn with_alternatives(self, viable: Vec<SolvableId>) -> Self {
        match self {
            DecisionItem::Branch {
                capability,
                required_by,
                optional,
                ..
            } => DecisionItem::Branch {
                capability,
                required_by,
                alternatives: viable,
                optional,
            },
            item => item,
        }
    }

    /// Returns an object that can be used to display the item.
    pub(crate) fn display<'a, VS: VersionSet, N: PackageName + Display>(
        &'a self,
        pool: &'a Pool<VS, N>,
    ) -> DecisionItemDisplay<'a, VS, N> {
        DecisionItemDisplay { item: self, pool }
    }
}

pub(crate) struct DecisionItemDisplay<'a, VS: VersionSet, N: PackageName> {
    item: &'a DecisionItem,
    pool: &'a Pool<VS, N>,
}

impl<VS: VersionSet, N: PackageName + Display> Display for DecisionItemDisplay<'_, VS, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pool = self.pool;
        match self.item {
            DecisionItem::Install(s) => write!(f, "install {}", s.display(pool)),
            DecisionItem::Establish(s) => write!(f, "establish {}", s.display(pool)),
            DecisionItem::Remove {
                solvable,
                remove_only,
            } => {
                write!(f, "remove {}", solvable.display(pool))?;
                if *remove_only {
                    write!(f, " (remove only)")?;
                }
                Ok(())
            }
            DecisionItem::Verify(s) => write!(f, "verify {}", s.display(pool)),
            DecisionItem::ExtraDependency(c) => write!(f, "require {}", c.display(pool)),
            DecisionItem::ExtraConflict(c) => write!(f, "conflict {}", c.display(pool)),
            DecisionItem::Branch {
                capability,
                required_by,
                alternatives,
                optional,
            } => {
                write!(f, "branch {}", capability.display(pool))?;
                if let Some(required_by) = required_by {
                    write!(f, " for {}", required_by.display(pool))?;
                }
                write!(
                    f,
                    " [{}]",
                    alternatives.iter().map(|s| s.display(pool)).format(", ")
                )?;
                if *optional {
                    write!(f, " (optional)")?;
                }
                Ok(())
            }
        }
    }
}

/// Applies decision items to a resolution context.
pub(crate) struct ItemProcessor<'a, VS: VersionSet, N: PackageName, I: CapabilityIndex<VS, N>> {
    pub(crate) cache: &'a SolverCache<VS, N, I>,
    pub(crate) options: &'a SolverOptions,
}

impl<VS: VersionSet, N: PackageName + Display, I: CapabilityIndex<VS, N>> ItemProcessor<'_, VS, N, I> {
    /// Processes a single item. Follow-up items are appended to `out`, in the order in which
    /// they have to be processed. `pending_work` tells whether the queue still holds items that
    /// are not branch points, in which case branch points are deferred.
    pub(crate) fn process(
        &self,
        item: &DecisionItem,
        context: &mut ResolutionContext,
        pending_work: bool,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        match item {
            &DecisionItem::Install(solvable) => self.install(context, solvable, out),
            &DecisionItem::Establish(solvable) => self.establish(context, solvable, out),
            &DecisionItem::Remove {
                solvable,
                remove_only,
            } => self.remove(context, solvable, remove_only, out),
            &DecisionItem::Verify(solvable) => self.verify(context, solvable, out),
            &DecisionItem::ExtraDependency(capability) => {
                context.add_extra_dependency(capability);
                self.require(context, capability, None, false, out)
            }
            &DecisionItem::ExtraConflict(capability) => {
                self.extra_conflict(context, capability, out)
            }
            DecisionItem::Branch {
                capability,
                required_by,
                alternatives,
                optional,
            } => self.branch(
                context,
                *capability,
                *required_by,
                alternatives,
                *optional,
                pending_work,
                out,
            ),
        }
    }

    /// Records the conflicts a present resolvable declares, once per context. Its obsoletes count
    /// as conflicts too: nothing it replaces may be installed next to it.
    pub(crate) fn register_conflicts(&self, context: &mut ResolutionContext, solvable: SolvableId) {
        if context.mark_established(solvable) {
            let dependencies = self.cache.get_or_cache_dependencies(solvable);
            for &capability in dependencies.conflicts.iter().chain(&dependencies.obsoletes) {
                context.add_conflict(capability, solvable);
            }
        }
    }

    fn install(
        &self,
        context: &mut ResolutionContext,
        solvable: SolvableId,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        match context.status(solvable) {
            Status::ToInstall | Status::Established => return Outcome::Done,
            Status::ToRemove => return Outcome::Invalidate(ProblemCause::Contradiction { solvable }),
            Status::Unknown => {}
        }

        if let Some(capability) = self.forbidden_by(context, solvable) {
            return Outcome::Invalidate(ProblemCause::Forbidden {
                solvable,
                capability,
            });
        }

        let dependencies = self.cache.get_or_cache_dependencies(solvable);

        // Resolvables of the system that are replaced by this one
        let mut replaced = Vec::new();
        if !self.options.allow_multiple_versions {
            let name = self.cache.name_of(solvable);
            for present in context.present() {
                if present == solvable || self.cache.name_of(present) != name {
                    continue;
                }
                if context.status(present) == Status::Established {
                    replaced.push(present);
                } else {
                    return Outcome::Invalidate(ProblemCause::SameName {
                        present,
                        candidate: solvable,
                    });
                }
            }
        }

        for &capability in &dependencies.obsoletes {
            for &provider in self.cache.get_or_cache_providers(capability) {
                if provider == solvable {
                    continue;
                }
                match context.status(provider) {
                    Status::Established if !replaced.contains(&provider) => replaced.push(provider),
                    Status::ToInstall => {
                        return Outcome::Invalidate(ProblemCause::Conflict {
                            source: solvable,
                            target: provider,
                            capability,
                        })
                    }
                    _ => {}
                }
            }
        }

        // Conflicts declared by present resolvables against this one
        if let Some((capability, source)) = context.active_conflicts().find(|&(capability, source)| {
            source != solvable
                && !replaced.contains(&source)
                && self.cache.provides(solvable, capability)
        }) {
            return Outcome::Invalidate(ProblemCause::Conflict {
                source,
                target: solvable,
                capability,
            });
        }

        // Conflicts declared by this one against present resolvables
        for &capability in &dependencies.conflicts {
            let target = self
                .cache
                .get_or_cache_providers(capability)
                .iter()
                .copied()
                .find(|&p| p != solvable && context.is_installed(p) && !replaced.contains(&p));
            if let Some(target) = target {
                return Outcome::Invalidate(ProblemCause::Conflict {
                    source: solvable,
                    target,
                    capability,
                });
            }
        }

        context.install(solvable);
        self.register_conflicts(context, solvable);
        for old in replaced {
            tracing::trace!(
                "{} replaces {}",
                solvable.display(self.cache.pool()),
                old.display(self.cache.pool())
            );
            context.remove(old);
            out.push(DecisionItem::Remove {
                solvable: old,
                remove_only: false,
            });
        }
        out.push(DecisionItem::Establish(solvable));
        Outcome::Done
    }

    fn establish(
        &self,
        context: &mut ResolutionContext,
        solvable: SolvableId,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        if !context.is_installed(solvable) {
            return Outcome::Done;
        }
        self.register_conflicts(context, solvable);

        let dependencies = self.cache.get_or_cache_dependencies(solvable);
        for &capability in &dependencies.requires {
            let outcome = self.require(context, capability, Some(solvable), false, out);
            if outcome != Outcome::Done {
                return outcome;
            }
        }

        if self.options.install_recommends {
            for &capability in &dependencies.recommends {
                self.require(context, capability, Some(solvable), true, out);
            }
        }

        Outcome::Done
    }

    fn verify(
        &self,
        context: &mut ResolutionContext,
        solvable: SolvableId,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        if !context.is_installed(solvable) {
            return Outcome::Done;
        }
        self.register_conflicts(context, solvable);

        let broken = self
            .cache
            .get_or_cache_dependencies(solvable)
            .requires
            .iter()
            .any(|&capability| !self.is_satisfied(context, capability));
        if broken {
            tracing::debug!(
                "{} lost a requirement, establishing it again",
                solvable.display(self.cache.pool())
            );
            out.push(DecisionItem::Establish(solvable));
        }
        Outcome::Done
    }

    fn remove(
        &self,
        context: &mut ResolutionContext,
        solvable: SolvableId,
        remove_only: bool,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        if context.status(solvable) == Status::ToInstall {
            return Outcome::Invalidate(ProblemCause::Contradiction { solvable });
        }
        context.remove(solvable);

        let dependents = context
            .present()
            .filter(|&dependent| {
                self.cache
                    .get_or_cache_dependencies(dependent)
                    .requires
                    .iter()
                    .any(|&capability| {
                        self.cache.provides(solvable, capability)
                            && !self.is_satisfied(context, capability)
                    })
            })
            .collect_vec();

        for dependent in dependents {
            out.push(if remove_only {
                DecisionItem::Remove {
                    solvable: dependent,
                    remove_only: true,
                }
            } else {
                DecisionItem::Establish(dependent)
            });
        }

        // Requested capabilities have to be provided by something else now
        let lost = context
            .extra_requires()
            .filter(|&capability| {
                self.cache.provides(solvable, capability) && !self.is_satisfied(context, capability)
            })
            .collect_vec();
        for capability in lost {
            let outcome = self.require(context, capability, None, false, out);
            if outcome != Outcome::Done {
                return outcome;
            }
        }
        Outcome::Done
    }

    fn extra_conflict(
        &self,
        context: &mut ResolutionContext,
        capability: CapabilityId,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        context.add_extra_conflict(capability);
        for &provider in self.cache.get_or_cache_providers(capability) {
            match context.status(provider) {
                Status::ToInstall => {
                    return Outcome::Invalidate(ProblemCause::Forbidden {
                        solvable: provider,
                        capability,
                    })
                }
                Status::Established => {
                    context.remove(provider);
                    out.push(DecisionItem::Remove {
                        solvable: provider,
                        remove_only: false,
                    });
                }
                Status::ToRemove | Status::Unknown => {}
            }
        }
        Outcome::Done
    }

    #[allow(clippy::too_many_arguments)]
    fn branch(
        &self,
        context: &mut ResolutionContext,
        capability: CapabilityId,
        required_by: Option<SolvableId>,
        alternatives: &[SolvableId],
        optional: bool,
        pending_work: bool,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        if self.is_satisfied(context, capability) {
            return Outcome::Done;
        }

        let viable = self.viable(context, alternatives);
        if viable.is_empty() {
            return if optional {
                Outcome::Done
            } else {
                Outcome::Invalidate(ProblemCause::Unsatisfied {
                    capability,
                    required_by,
                })
            };
        }
        if viable.len() == 1 && !optional {
            out.push(DecisionItem::Install(viable[0]));
            return Outcome::Done;
        }

        if pending_work {
            Outcome::Defer
        } else {
            Outcome::Branch(viable)
        }
    }

    /// Queues whatever is needed to provide the capability.
    fn require(
        &self,
        context: &ResolutionContext,
        capability: CapabilityId,
        required_by: Option<SolvableId>,
        optional: bool,
        out: &mut Vec<DecisionItem>,
    ) -> Outcome {
        if self.is_satisfied(context, capability) {
            return Outcome::Done;
        }

        let viable = self.viable(context, self.cache.get_or_cache_providers(capability));
        if viable.is_empty() {
            if optional {
                return Outcome::Done;
            }
            return Outcome::Invalidate(ProblemCause::Unsatisfied {
                capability,
                required_by,
            });
        }

        if viable.len() == 1 && !optional {
            out.push(DecisionItem::Install(viable[0]));
        } else {
            out.push(DecisionItem::Branch {
                capability,
                required_by,
                alternatives: viable,
                optional,
            });
        }
        Outcome::Done
    }

    /// Returns true if something present provides the capability.
    fn is_satisfied(&self, context: &ResolutionContext, capability: CapabilityId) -> bool {
        self.cache
            .get_or_cache_providers(capability)
            .iter()
            .any(|&provider| context.is_installed(provider))
    }

    /// Returns the extra conflict that rules out the resolvable, if any.
    fn forbidden_by(&self, context: &ResolutionContext, solvable: SolvableId) -> Option<CapabilityId> {
        context
            .extra_conflicts()
            .find(|&capability| self.cache.provides(solvable, capability))
    }

    /// Filters the candidates that the context has not already ruled out, keeping their order.
    fn viable(&self, context: &ResolutionContext, candidates: &[SolvableId]) -> Vec<SolvableId> {
        candidates
            .iter()
            .copied()
            .filter(|&candidate| {
                !context.is_to_remove(candidate) && self.forbidden_by(context, candidate).is_none()
            })
            .collect()
    }
}
