//! Types to examine why a request could not be resolved, and to report the causes to the user.

use std::fmt;
use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::internal::id::{CapabilityId, SolvableId};
use crate::{PackageName, Pool, VersionSet};

/// The reason a branch of the search was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemCause {
    /// Nothing that could still be installed provides the capability.
    Unsatisfied {
        /// The capability that could not be provided
        capability: CapabilityId,
        /// The resolvable that requires the capability, `None` if the request itself required it
        required_by: Option<SolvableId>,
    },

    /// `source` declares a conflict with `capability`, which `target` provides.
    Conflict {
        /// The resolvable that declares the conflict
        source: SolvableId,
        /// The resolvable that provides the conflicting capability
        target: SolvableId,
        /// The capability the conflict was declared on
        capability: CapabilityId,
    },

    /// Two resolvables with the same name would have been installed.
    SameName {
        /// The resolvable that was already marked for installation
        present: SolvableId,
        /// The resolvable that could not be installed next to it
        candidate: SolvableId,
    },

    /// The resolvable provides a capability the request conflicts with.
    Forbidden {
        /// The resolvable that would have been installed
        solvable: SolvableId,
        /// The requested conflict
        capability: CapabilityId,
    },

    /// The resolvable had to be installed and removed at the same time.
    Contradiction {
        /// The resolvable in question
        solvable: SolvableId,
    },
}

/// Represents the reasons the solver was unable to find a solution.
///
/// Every branch of the search contributes the cause that made it fail. Causes are deduplicated
/// and kept in the order in which they were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unresolvable {
    causes: Vec<ProblemCause>,
}

impl Unresolvable {
    pub(crate) fn add_cause(&mut self, cause: ProblemCause) {
        if !self.causes.contains(&cause) {
            self.causes.push(cause);
        }
    }

    /// Returns all the causes that were encountered during the search.
    pub fn causes(&self) -> &[ProblemCause] {
        &self.causes
    }

    /// Returns the capabilities that could not be provided.
    pub fn unsatisfied(&self) -> Vec<CapabilityId> {
        self.causes
            .iter()
            .filter_map(|cause| match cause {
                ProblemCause::Unsatisfied { capability, .. } => Some(*capability),
                _ => None,
            })
            .unique()
            .collect()
    }

    /// Returns the pairs of resolvables that could not be present together. The first element of
    /// each pair declares the conflict, or was selected first for resolvables sharing a name.
    pub fn conflicts(&self) -> Vec<(SolvableId, SolvableId)> {
        self.causes
            .iter()
            .filter_map(|cause| match *cause {
                ProblemCause::Conflict { source, target, .. } => Some((source, target)),
                ProblemCause::SameName { present, candidate } => Some((present, candidate)),
                _ => None,
            })
            .unique()
            .collect()
    }

    /// Returns an object that can be used to display the problem in a user-friendly way.
    pub fn display_user_friendly<'pool, VS: VersionSet, N: PackageName + Display>(
        &'pool self,
        pool: &'pool Pool<VS, N>,
    ) -> DisplayUnresolvable<'pool, VS, N> {
        DisplayUnresolvable {
            problem: self,
            pool,
        }
    }
}

impl Display for Unresolvable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no solution found, {} unsatisfied requirement(s) and {} conflict(s)",
            self.unsatisfied().len(),
            self.conflicts().len()
        )
    }
}

/// A structure that renders an [`Unresolvable`] with the names and versions from a pool.
pub struct DisplayUnresolvable<'pool, VS: VersionSet, N: PackageName> {
    problem: &'pool Unresolvable,
    pool: &'pool Pool<VS, N>,
}

impl<VS: VersionSet, N: PackageName + Display> Display for DisplayUnresolvable<'_, VS, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let pool = self.pool;
        let causes = &self.problem.causes;

        let unsatisfied = causes
            .iter()
            .filter(|cause| matches!(cause, ProblemCause::Unsatisfied { .. }))
            .collect_vec();
        if !unsatisfied.is_empty() {
            writeln!(f, "The following requirements cannot be satisfied:")?;
            for cause in unsatisfied {
                let &ProblemCause::Unsatisfied {
                    capability,
                    required_by,
                } = cause
                else {
                    continue;
                };
                match required_by {
                    Some(solvable) => writeln!(
                        f,
                        "  - {}, required by {}",
                        capability.display(pool),
                        solvable.display(pool)
                    )?,
                    None => writeln!(f, "  - {}, requested", capability.display(pool))?,
                }
            }
        }

        let conflicts = causes
            .iter()
            .filter(|cause| {
                matches!(
                    cause,
                    ProblemCause::Conflict { .. } | ProblemCause::SameName { .. }
                )
            })
            .collect_vec();
        if !conflicts.is_empty() {
            writeln!(f, "The following resolvables are incompatible:")?;
            for cause in conflicts {
                match *cause {
                    ProblemCause::Conflict {
                        source,
                        target,
                        capability,
                    } => writeln!(
                        f,
                        "  - {} conflicts with {}, which provides {}",
                        source.display(pool),
                        target.display(pool),
                        capability.display(pool)
                    )?,
                    ProblemCause::SameName { present, candidate } => writeln!(
                        f,
                        "  - {} cannot be installed next to {}",
                        candidate.display(pool),
                        present.display(pool)
                    )?,
                    _ => {}
                }
            }
        }

        for cause in causes {
            match *cause {
                ProblemCause::Forbidden {
                    solvable,
                    capability,
                } => writeln!(
                    f,
                    "{} cannot be installed because the request conflicts with {}",
                    solvable.display(pool),
                    capability.display(pool)
                )?,
                ProblemCause::Contradiction { solvable } => writeln!(
                    f,
                    "{} would have to be installed and removed at the same time",
                    solvable.display(pool)
                )?,
                ProblemCause::Unsatisfied { .. }
                | ProblemCause::Conflict { .. }
                | ProblemCause::SameName { .. } => {}
            }
        }

        Ok(())
    }
}

/// The reason why the solver was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller asked the solver to stop
    Requested,
    /// The solver was cancelled because the timeout was reached
    Timeout,
    /// The solver processed the maximum number of queues it was allowed to
    PassLimitReached,
}

impl Display for CancelReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "cancellation was requested"),
            CancelReason::Timeout => write!(f, "the timeout was reached"),
            CancelReason::PassLimitReached => write!(f, "the maximum number of passes was reached"),
        }
    }
}

/// The error returned by [`crate::Solver::solve`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnresolvableOrCancelled {
    /// No assignment satisfies the request
    #[error("{0}")]
    Unresolvable(Unresolvable),

    /// The search was aborted before it finished
    #[error("the solver was cancelled because {0}")]
    Cancelled(CancelReason),
}
