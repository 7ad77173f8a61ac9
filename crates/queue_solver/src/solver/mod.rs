use std::collections::VecDeque;
use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::internal::id::SolvableId;
use crate::problem::{CancelReason, Unresolvable, UnresolvableOrCancelled};
use crate::request::Request;
use crate::transaction::{self, Solution};
use crate::{CapabilityIndex, PackageName, Pool, VersionSet};

use cache::SolverCache;
use context::{ResolutionContext, Status};
use item::ItemProcessor;
use queue::{QueueState, ResolverQueue};

pub(crate) mod cache;
pub(crate) mod context;
pub(crate) mod item;
pub(crate) mod queue;

/// Settings that influence how [`Solver`] searches for a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverOptions {
    /// Stop the search with [`CancelReason::Timeout`] once it has run for this long.
    pub timeout: Option<Duration>,

    /// Stop the search with [`CancelReason::PassLimitReached`] after this many resolver queues
    /// have been taken from the frontier.
    pub max_solver_passes: Option<usize>,

    /// Treat recommendations as soft requirements. A recommendation is installed if that is
    /// possible, and left out otherwise.
    pub install_recommends: bool,

    /// Requested removals also remove everything that depends on the removed resolvables. When
    /// unset, the solver looks for replacement providers instead.
    pub remove_only_mode: bool,

    /// Allows several resolvables with the same name to be present at the same time. When unset,
    /// installing a resolvable replaces the installed resolvable of the same name.
    pub allow_multiple_versions: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_solver_passes: None,
            install_recommends: false,
            remove_only_mode: true,
            allow_multiple_versions: false,
        }
    }
}

/// Drives the search for a transaction that satisfies a [`Request`].
///
/// The search starts from a single resolver queue and explores alternatives depth first: when
/// a queue has to branch, its children are put at the front of the frontier in the order the
/// [`CapabilityIndex`] returned the providers. The first queue that is processed completely is
/// the solution. Queues that only hold branch points which cannot be decided yet are set aside
/// and revisited once everything else was explored.
pub struct Solver<VS: VersionSet, N: PackageName, I: CapabilityIndex<VS, N>> {
    cache: SolverCache<VS, N, I>,
    options: SolverOptions,
}

impl<VS: VersionSet, N: PackageName, I: CapabilityIndex<VS, N>> Solver<VS, N, I> {
    /// Create a solver that queries the provided index
    pub fn new(index: I) -> Self {
        Self::with_options(index, SolverOptions::default())
    }

    /// Create a solver with custom options
    pub fn with_options(index: I, options: SolverOptions) -> Self {
        Self {
            cache: SolverCache::new(index),
            options,
        }
    }

    /// Returns a reference to the pool used by the solver
    pub fn pool(&self) -> &Pool<VS, N> {
        self.cache.pool()
    }

    /// Returns the index the solver queries
    pub fn index(&self) -> &I {
        self.cache.index()
    }

    /// Returns the options of the solver
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Orders the installs of a solution so that every resolvable comes after the resolvables
    /// that provide its requirements. Resolvables that depend on each other are kept together.
    pub fn install_order(&self, solution: &Solution) -> Vec<SolvableId> {
        transaction::install_order(&solution.to_install, |solvable| {
            self.cache
                .get_or_cache_dependencies(solvable)
                .requires
                .iter()
                .flat_map(|&capability| self.cache.get_or_cache_providers(capability))
                .copied()
                .collect()
        })
    }
}

impl<VS: VersionSet, N: PackageName + Display, I: CapabilityIndex<VS, N>> Solver<VS, N, I> {
    /// Solves the provided `request` and returns the transaction of the first solution found.
    ///
    /// Returns an [`UnresolvableOrCancelled::Unresolvable`] if no solution exists, which lists
    /// the causes every explored alternative failed with.
    pub fn solve(&mut self, request: &Request) -> Result<Solution, UnresolvableOrCancelled> {
        self.solve_with_cancel(request, || false)
    }

    /// Like [`Self::solve`], but `cancel` is called once for every processed decision item.
    /// Returning true aborts the search with [`CancelReason::Requested`].
    pub fn solve_with_cancel(
        &mut self,
        request: &Request,
        mut cancel: impl FnMut() -> bool,
    ) -> Result<Solution, UnresolvableOrCancelled> {
        let started = Instant::now();
        let timeout = self.options.timeout;
        let index = self.cache.index();
        let mut should_cancel = || {
            if cancel() {
                return Some(CancelReason::Requested);
            }
            if let Some(reason) = index.should_cancel() {
                return Some(reason);
            }
            match timeout {
                Some(timeout) if started.elapsed() >= timeout => Some(CancelReason::Timeout),
                _ => None,
            }
        };

        let processor = ItemProcessor {
            cache: &self.cache,
            options: &self.options,
        };

        let mut frontier = VecDeque::from([self.initial_queue(request, &processor)]);
        let mut deferred = VecDeque::new();
        let mut problem = Unresolvable::default();
        let mut passes = 0usize;

        tracing::info!("=== Solving");
        loop {
            let Some(mut queue) = frontier.pop_front().or_else(|| deferred.pop_front()) else {
                break;
            };

            passes += 1;
            if self.options.max_solver_passes.is_some_and(|max| passes > max) {
                tracing::info!("╘══ giving up after {} passes", passes - 1);
                return Err(UnresolvableOrCancelled::Cancelled(
                    CancelReason::PassLimitReached,
                ));
            }

            let state = queue.process(&processor, &mut should_cancel);
            match state {
                QueueState::Complete => {
                    debug_assert!(queue.is_empty() && !queue.is_invalid());
                    let solution = self.solution(queue.context());
                    tracing::info!(
                        "╘══ solution found after {passes} passes: {} to install, {} to remove",
                        solution.to_install.len(),
                        solution.to_remove.len()
                    );
                    return Ok(solution);
                }
                QueueState::Invalid => {
                    tracing::debug!(
                        "dropping invalid queue with {} pending items, {} left in the frontier",
                        queue.len(),
                        frontier.len()
                    );
                    if let Some(cause) = queue.problem() {
                        problem.add_cause(cause);
                    }
                }
                QueueState::Branching => {
                    tracing::trace!("{}", queue.display(self.pool()));
                    let mut new = Vec::new();
                    let mut new_deferred = Vec::new();
                    queue.split_first_branch(&mut new, &mut new_deferred);
                    tracing::debug!(
                        "split queue into {} alternatives, {} deferred",
                        new.len(),
                        new_deferred.len()
                    );
                    for child in new.into_iter().rev() {
                        frontier.push_front(child);
                    }
                    deferred.extend(new_deferred);
                }
                QueueState::Cancelled(reason) => {
                    tracing::info!("╘══ cancelled: {reason}");
                    return Err(UnresolvableOrCancelled::Cancelled(reason));
                }
            }
        }

        tracing::info!("╘══ UNRESOLVABLE");
        Err(UnresolvableOrCancelled::Unresolvable(problem))
    }

    /// Creates the queue the search starts from. Resolvables of the system start out as
    /// established and are verified after the request was processed.
    fn initial_queue(
        &self,
        request: &Request,
        processor: &ItemProcessor<'_, VS, N, I>,
    ) -> ResolverQueue {
        let mut context = ResolutionContext::new();
        for &solvable in self.cache.baseline() {
            context.establish(solvable);
            processor.register_conflicts(&mut context, solvable);
        }

        let mut queue = ResolverQueue::new(context);
        for &capability in &request.conflict {
            queue.add_extra_conflict(capability);
        }
        for &solvable in &request.remove {
            queue.add_item_to_remove(solvable, self.options.remove_only_mode);
        }
        for &solvable in &request.install {
            queue.add_item_to_install(solvable);
        }
        for &capability in &request.require {
            queue.add_extra_dependency(capability);
        }
        for &solvable in self.cache.baseline() {
            queue.add_item_to_verify(solvable);
        }

        tracing::trace!("initial {}", queue.display(self.pool()));
        queue
    }

    fn solution(&self, context: &ResolutionContext) -> Solution {
        let to_install: Vec<SolvableId> = context
            .with_status(Status::ToInstall)
            .filter(|&solvable| !self.cache.is_baseline(solvable))
            .collect();
        let to_remove = context
            .with_status(Status::ToRemove)
            .filter(|&solvable| self.cache.is_baseline(solvable))
            .collect();

        let mut suggested: Vec<_> = to_install
            .iter()
            .flat_map(|&solvable| &self.cache.get_or_cache_dependencies(solvable).suggests)
            .copied()
            .filter(|&capability| {
                !self
                    .cache
                    .get_or_cache_providers(capability)
                    .iter()
                    .any(|&provider| context.is_installed(provider))
            })
            .collect();
        suggested.sort();
        suggested.dedup();

        Solution {
            to_install,
            to_remove,
            suggested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ProblemCause;
    use crate::testing::{solution_to_string, Range, TestIndex, TestIndexExt};
    use crate::{CapabilityId, Dependencies, Operation};
    use proptest::prelude::*;
    use tracing_test::traced_test;

    fn solve_with_options(
        index: TestIndex,
        options: SolverOptions,
        request: impl FnOnce(&TestIndex, &mut Request),
    ) -> (Solver<Range, String, TestIndex>, Result<Solution, UnresolvableOrCancelled>) {
        let mut jobs = Request::new();
        request(&index, &mut jobs);
        let mut solver = Solver::with_options(index, options);
        let result = solver.solve(&jobs);
        (solver, result)
    }

    fn solve(
        index: TestIndex,
        request: impl FnOnce(&TestIndex, &mut Request),
    ) -> (Solver<Range, String, TestIndex>, Result<Solution, UnresolvableOrCancelled>) {
        solve_with_options(index, SolverOptions::default(), request)
    }

    /// Solves and renders the transaction, panics if there is no solution
    fn solve_snapshot(index: TestIndex, request: impl FnOnce(&TestIndex, &mut Request)) -> String {
        let (solver, result) = solve(index, request);
        match result {
            Ok(solution) => solution_to_string(solver.pool(), &solution),
            Err(err) => panic!("expected a solution, got: {err}"),
        }
    }

    /// Solves and renders the problem, panics if a solution was found
    fn solve_unresolvable(index: TestIndex, request: impl FnOnce(&TestIndex, &mut Request)) -> String {
        let (solver, result) = solve(index, request);
        match result {
            Err(UnresolvableOrCancelled::Unresolvable(problem)) => {
                problem.display_user_friendly(solver.pool()).to_string()
            }
            Ok(solution) => panic!(
                "expected unresolvable, but a solution was found:\n{}",
                solution_to_string(solver.pool(), &solution)
            ),
            Err(err) => panic!("expected unresolvable, got: {err}"),
        }
    }

    fn expect_unresolvable(result: Result<Solution, UnresolvableOrCancelled>) -> Unresolvable {
        match result {
            Err(UnresolvableOrCancelled::Unresolvable(problem)) => problem,
            other => panic!("expected unresolvable, got {other:?}"),
        }
    }

    /// `x` is provided by `p1` and `p2`, in that order, `a` requires it
    fn index_with_two_providers() -> TestIndex {
        let mut index = TestIndex::new();
        index.package("a", 1, &["x"]);
        let p1 = index.package("p1", 1, &[]);
        let p2 = index.package("p2", 1, &[]);
        index.add_provides(p1, "x", None);
        index.add_provides(p2, "x", None);
        index
    }

    #[test]
    fn test_install_single_resolvable() {
        let mut index = TestIndex::new();
        index.package("a", 1, &[]);
        let result = solve_snapshot(index, |index, request| {
            request.install(index.find("a", 1));
        });
        insta::assert_snapshot!(result, @"install a=1");
    }

    #[test]
    fn test_install_dependency_chain() {
        let mut index = TestIndex::new();
        index.package("app", 1, &["lib 1..3"]);
        index.package("lib", 1, &["core"]);
        index.package("lib", 2, &["core"]);
        index.package("lib", 3, &[]);
        index.package("core", 1, &[]);
        let result = solve_snapshot(index, |index, request| {
            request.install(index.find("app", 1));
        });
        insta::assert_snapshot!(result, @r###"
        install app=1
        install lib=2
        install core=1
        "###);
    }

    #[test]
    fn test_first_provider_wins() {
        let index = index_with_two_providers();
        let (solver, result) = solve(index, |index, request| {
            request.install(index.find("a", 1));
        });
        let solution = result.unwrap();
        let index = solver.index();
        assert_eq!(
            solution.to_install,
            vec![index.find("a", 1), index.find("p1", 1)]
        );
        assert!(solution.to_remove.is_empty());
    }

    #[test]
    #[traced_test]
    fn test_branch_past_conflict_with_installed() {
        let mut index = index_with_two_providers();
        index.installed_package("q", 1, &[]);
        let p1 = index.find("p1", 1);
        index.conflicts(p1, "q");

        let result = solve_snapshot(index, |index, request| {
            request.install(index.find("a", 1));
        });
        insta::assert_snapshot!(result, @r###"
        install a=1
        install p2=1
        "###);
        assert!(logs_contain("split queue into 2 alternatives"));
    }

    #[test]
    fn test_installed_resolvable_declaring_the_conflict() {
        let mut index = index_with_two_providers();
        let q = index.installed_package("q", 1, &[]);
        index.conflicts(q, "p1");

        let result = solve_snapshot(index, |index, request| {
            request.install(index.find("a", 1));
        });
        insta::assert_snapshot!(result, @r###"
        install a=1
        install p2=1
        "###);
    }

    #[test]
    fn test_extra_conflicts_on_only_provider() {
        let mut index = TestIndex::new();
        let a = index.package("a", 1, &["x"]);
        let p = index.package("p", 1, &[]);
        index.add_provides(p, "x", None);
        let x = index.spec("x");

        let (_, result) = solve(index, |index, request| {
            request
                .install(a)
                .conflict(index.spec("p"))
                .conflict(index.spec("x"));
        });
        let problem = expect_unresolvable(result);
        assert_eq!(problem.unsatisfied(), vec![x]);
    }

    #[test]
    fn test_no_provider_terminates() {
        let mut index = TestIndex::new();
        index.package("a", 1, &["missing 2..4"]);
        index.package("missing", 1, &[]);
        let result = solve_unresolvable(index, |index, request| {
            request.install(index.find("a", 1));
        });
        insta::assert_snapshot!(result, @r###"
        The following requirements cannot be satisfied:
          - missing 2..4, required by a=1
        "###);
    }

    #[test]
    fn test_requested_capability_without_provider() {
        let mut index = TestIndex::new();
        index.package("a", 1, &[]);
        let nothing = index.spec("nothing");
        let (_, result) = solve(index, |index, request| {
            request.install(index.find("a", 1)).require(nothing);
        });
        let problem = expect_unresolvable(result);
        assert_eq!(problem.unsatisfied(), vec![nothing]);
        assert_eq!(
            problem.causes(),
            &[ProblemCause::Unsatisfied {
                capability: nothing,
                required_by: None
            }]
        );
    }

    #[test]
    fn test_unresolvable_aggregates_every_branch() {
        let mut index = index_with_two_providers();
        index.installed_package("q", 1, &[]);
        let p1 = index.find("p1", 1);
        let p2 = index.find("p2", 1);
        index.requires(p1, "gone");
        index.conflicts(p2, "q");

        let result = solve_unresolvable(index, |index, request| {
            request.install(index.find("a", 1));
        });
        insta::assert_snapshot!(result, @r###"
        The following requirements cannot be satisfied:
          - gone *, required by p1=1
        The following resolvables are incompatible:
          - p2=1 conflicts with q=1, which provides q *
        "###);
    }

    /// Returns true if the solution leaves both resolvables on the system
    fn both_present(solution: &Solution, baseline: SolvableId, requested: SolvableId) -> bool {
        !solution.to_remove.contains(&baseline) && solution.to_install.contains(&requested)
    }

    #[test]
    fn test_conflict_symmetry() {
        for declared_by_installed in [true, false] {
            for installed_first in [true, false] {
                let mut index = TestIndex::new();
                let a = index.package("a", 1, &[]);
                let b = index.package("b", 1, &[]);
                if declared_by_installed == installed_first {
                    index.conflicts(a, "b");
                } else {
                    index.conflicts(b, "a");
                }
                let (installed, requested) = if installed_first { (a, b) } else { (b, a) };
                index.set_installed(installed, true);

                let (_, result) = solve(index, |_, request| {
                    request.install(requested);
                });
                match result {
                    Ok(solution) => assert!(!both_present(&solution, installed, requested)),
                    Err(UnresolvableOrCancelled::Unresolvable(problem)) => {
                        assert_eq!(problem.conflicts().len(), 1)
                    }
                    Err(err) => panic!("unexpected error {err}"),
                }
            }
        }
    }

    fn upgrade_index() -> TestIndex {
        let mut index = TestIndex::new();
        index.installed_package("a", 1, &[]);
        index.package("a", 2, &["b"]);
        index.package("b", 1, &[]);
        index.installed_package("c", 1, &["a"]);
        index
    }

    #[test]
    fn test_idempotent_re_resolution() {
        let (_, result) = solve(upgrade_index(), |index, request| {
            request.install(index.find("a", 2));
        });
        let first = result.unwrap();
        assert!(!first.is_empty());

        // The same index, with the transaction applied
        let mut index = upgrade_index();
        for &id in &first.to_install {
            index.set_installed(id, true);
        }
        for &id in &first.to_remove {
            index.set_installed(id, false);
        }
        let (_, result) = solve(index, |_, _| {});
        assert_eq!(result.unwrap(), Solution::default());
    }

    #[test]
    fn test_upgrade_replaces_installed_version() {
        let (solver, result) = solve(upgrade_index(), |index, request| {
            request.install(index.find("a", 2));
        });
        let solution = result.unwrap();
        insta::assert_snapshot!(solution_to_string(solver.pool(), &solution), @r###"
        install a=2
        install b=1
        remove a=1
        "###);

        let index = solver.index();
        assert_eq!(
            solution.operations(solver.pool()),
            vec![
                Operation::Upgrade {
                    from: index.find("a", 1),
                    to: index.find("a", 2)
                },
                Operation::Install(index.find("b", 1)),
            ]
        );
        assert_eq!(
            solver.install_order(&solution),
            vec![index.find("b", 1), index.find("a", 2)]
        );
    }

    #[test]
    fn test_obsoletes_remove_installed() {
        let mut index = TestIndex::new();
        let old = index.installed_package("legacy", 1, &[]);
        let new = index.package("modern", 1, &[]);
        index.obsoletes(new, "legacy");
        index.add_provides(new, "legacy", Some(2));
        let user = index.installed_package("user", 1, &["legacy"]);

        let (_, result) = solve(index, |_, request| {
            request.install(new);
        });
        let solution = result.unwrap();
        assert_eq!(solution.to_install, vec![new]);
        assert_eq!(solution.to_remove, vec![old]);
        assert!(!solution.to_remove.contains(&user));
    }

    #[test]
    fn test_obsoletes_apply_in_either_request_order() {
        fn obsoleting_index() -> (TestIndex, SolvableId, SolvableId) {
            let mut index = TestIndex::new();
            let legacy = index.package("legacy", 1, &[]);
            let modern = index.package("modern", 1, &[]);
            index.obsoletes(modern, "legacy");
            (index, legacy, modern)
        }

        for modern_first in [false, true] {
            let (index, legacy, modern) = obsoleting_index();
            let capability = index.spec("legacy");
            let (_, result) = solve(index, |_, request| {
                if modern_first {
                    request.install(modern).install(legacy);
                } else {
                    request.install(legacy).install(modern);
                }
            });
            let problem = expect_unresolvable(result);
            assert_eq!(
                problem.causes(),
                &[ProblemCause::Conflict {
                    source: modern,
                    target: legacy,
                    capability,
                }],
                "modern first: {modern_first}"
            );
        }
    }

    #[test]
    fn test_single_instance_per_name() {
        let mut index = TestIndex::new();
        let a1 = index.package("a", 1, &[]);
        let a2 = index.package("a", 2, &[]);

        let (_, result) = solve(index, |_, request| {
            request.install(a1).install(a2);
        });
        let problem = expect_unresolvable(result);
        assert_eq!(
            problem.causes(),
            &[ProblemCause::SameName {
                present: a1,
                candidate: a2
            }]
        );

        let mut index = TestIndex::new();
        let a1 = index.package("a", 1, &[]);
        let a2 = index.package("a", 2, &[]);
        let options = SolverOptions {
            allow_multiple_versions: true,
            ..SolverOptions::default()
        };
        let (_, result) = solve_with_options(index, options, |_, request| {
            request.install(a1).install(a2);
        });
        assert_eq!(result.unwrap().to_install, vec![a1, a2]);
    }

    fn removal_index() -> TestIndex {
        let mut index = TestIndex::new();
        index.installed_package("lib", 1, &[]);
        index.installed_package("app", 1, &["lib"]);
        index.installed_package("tool", 1, &["app"]);
        let compat = index.package("compat", 1, &[]);
        index.add_provides(compat, "lib", None);
        index
    }

    #[test]
    fn test_remove_cascades_in_remove_only_mode() {
        let (solver, result) = solve(removal_index(), |index, request| {
            request.remove(index.find("lib", 1));
        });
        insta::assert_snapshot!(solution_to_string(solver.pool(), &result.unwrap()), @r###"
        remove lib=1
        remove app=1
        remove tool=1
        "###);
    }

    #[test]
    fn test_remove_installs_replacement() {
        let options = SolverOptions {
            remove_only_mode: false,
            ..SolverOptions::default()
        };
        let (solver, result) = solve_with_options(removal_index(), options, |index, request| {
            request.remove(index.find("lib", 1));
        });
        insta::assert_snapshot!(solution_to_string(solver.pool(), &result.unwrap()), @r###"
        install compat=1
        remove lib=1
        "###);
    }

    #[test]
    fn test_removing_a_requested_install_is_a_contradiction() {
        let mut index = TestIndex::new();
        let a = index.package("a", 1, &[]);
        let (_, result) = solve(index, |_, request| {
            request.install(a).remove(a);
        });
        let problem = expect_unresolvable(result);
        assert_eq!(
            problem.causes(),
            &[ProblemCause::Contradiction { solvable: a }]
        );
    }

    #[test]
    fn test_extra_requirement_picks_a_provider() {
        let index = index_with_two_providers();
        let result = solve_snapshot(index, |index, request| {
            request.require(index.spec("x"));
        });
        insta::assert_snapshot!(result, @"install p1=1");
    }

    /// `p=1` is installed and the only resolvable of that name providing `x`, `a` needs a newer `p`
    fn upgrade_drops_capability_index(with_other_provider: bool) -> TestIndex {
        let mut index = TestIndex::new();
        let p1 = index.installed_package("p", 1, &[]);
        index.add_provides(p1, "x", None);
        index.package("p", 2, &[]);
        if with_other_provider {
            let q = index.package("q", 1, &[]);
            index.add_provides(q, "x", None);
        }
        index.package("a", 1, &["p 2..3"]);
        index
    }

    #[test]
    fn test_extra_requirement_survives_upgrade() {
        let result = solve_snapshot(upgrade_drops_capability_index(true), |index, request| {
            request.install(index.find("a", 1)).require(index.spec("x"));
        });
        insta::assert_snapshot!(result, @r###"
        install p=2
        install q=1
        install a=1
        remove p=1
        "###);
    }

    #[test]
    fn test_extra_requirement_lost_by_upgrade_is_unsatisfied() {
        let index = upgrade_drops_capability_index(false);
        let x = index.spec("x");
        let (_, result) = solve(index, |index, request| {
            request.install(index.find("a", 1)).require(x);
        });
        let problem = expect_unresolvable(result);
        assert_eq!(
            problem.causes(),
            &[ProblemCause::Unsatisfied {
                capability: x,
                required_by: None,
            }]
        );
    }

    fn recommends_index() -> TestIndex {
        let mut index = TestIndex::new();
        let a = index.package("a", 1, &[]);
        index.recommends(a, "b");
        index.recommends(a, "nothing");
        index.suggests(a, "c");
        let b = index.package("b", 1, &[]);
        index.package("c", 1, &[]);
        index.installed_package("q", 1, &[]);
        let b2 = index.package("b", 2, &[]);
        index.conflicts(b2, "q");
        let _ = b;
        index
    }

    #[test]
    fn test_recommends_are_ignored_by_default() {
        let (solver, result) = solve(recommends_index(), |index, request| {
            request.install(index.find("a", 1));
        });
        let solution = result.unwrap();
        assert_eq!(solution.to_install, vec![solver.index().find("a", 1)]);
        assert_eq!(solution.suggested, vec![solver.index().spec("c")]);
    }

    #[test]
    fn test_recommends_are_installed_when_possible() {
        let options = SolverOptions {
            install_recommends: true,
            ..SolverOptions::default()
        };
        let (solver, result) = solve_with_options(recommends_index(), options, |index, request| {
            request.install(index.find("a", 1));
        });
        // b=2 is preferred but conflicts with q, so the search falls back to b=1
        insta::assert_snapshot!(solution_to_string(solver.pool(), &result.unwrap()), @r###"
        install a=1
        install b=1
        "###);
    }

    #[test]
    fn test_unsatisfiable_recommends_are_skipped() {
        let mut index = recommends_index();
        let b1 = index.find("b", 1);
        index.requires(b1, "gone");
        let options = SolverOptions {
            install_recommends: true,
            ..SolverOptions::default()
        };
        let (solver, result) = solve_with_options(index, options, |index, request| {
            request.install(index.find("a", 1));
        });
        assert_eq!(
            result.unwrap().to_install,
            vec![solver.index().find("a", 1)]
        );
    }

    #[test]
    fn test_cancel_closure() {
        let index = index_with_two_providers();
        let a = index.find("a", 1);
        let mut solver = Solver::new(index);
        let mut request = Request::new();
        request.install(a);

        let mut calls = 0;
        let result = solver.solve_with_cancel(&request, || {
            calls += 1;
            calls > 2
        });
        assert_eq!(
            result,
            Err(UnresolvableOrCancelled::Cancelled(CancelReason::Requested))
        );

        // The solver can be reused
        assert!(solver.solve(&request).is_ok());
    }

    #[test]
    fn test_timeout() {
        let index = index_with_two_providers();
        let options = SolverOptions {
            timeout: Some(Duration::ZERO),
            ..SolverOptions::default()
        };
        let (_, result) = solve_with_options(index, options, |index, request| {
            request.install(index.find("a", 1));
        });
        assert_eq!(
            result,
            Err(UnresolvableOrCancelled::Cancelled(CancelReason::Timeout))
        );
    }

    #[test]
    fn test_pass_limit() {
        let mut index = index_with_two_providers();
        index.installed_package("q", 1, &[]);
        let p1 = index.find("p1", 1);
        index.conflicts(p1, "q");
        let options = SolverOptions {
            max_solver_passes: Some(2),
            ..SolverOptions::default()
        };
        let (_, result) = solve_with_options(index, options, |index, request| {
            request.install(index.find("a", 1));
        });
        assert_eq!(
            result,
            Err(UnresolvableOrCancelled::Cancelled(
                CancelReason::PassLimitReached
            ))
        );
    }

    /// An index that asks the solver to stop
    struct CancellingIndex(TestIndex);

    impl CapabilityIndex<Range> for CancellingIndex {
        fn pool(&self) -> &Pool<Range> {
            self.0.pool()
        }

        fn providers_of(&self, capability: CapabilityId) -> Vec<SolvableId> {
            self.0.providers_of(capability)
        }

        fn dependencies_of(&self, solvable: SolvableId) -> Dependencies {
            self.0.dependencies_of(solvable)
        }

        fn is_installed(&self, solvable: SolvableId) -> bool {
            self.0.is_installed(solvable)
        }

        fn installed(&self) -> Vec<SolvableId> {
            self.0.installed()
        }

        fn should_cancel(&self) -> Option<CancelReason> {
            Some(CancelReason::Timeout)
        }
    }

    #[test]
    fn test_index_can_cancel() {
        let index = index_with_two_providers();
        let mut request = Request::new();
        request.install(index.find("a", 1));
        let mut solver = Solver::new(CancellingIndex(index));
        assert_eq!(
            solver.solve(&request),
            Err(UnresolvableOrCancelled::Cancelled(CancelReason::Timeout))
        );
    }

    /// A generated resolvable: name index, version, required names with a version range and
    /// conflicting names
    type Description = (usize, u32, Vec<(usize, u32, u32)>, Vec<usize>);

    const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

    fn build(descriptions: &[Description]) -> TestIndex {
        let mut index = TestIndex::new();
        for (name, version, _, _) in descriptions {
            index.package(NAMES[*name], *version, &[]);
        }
        for (id, (_, _, requires, conflicts)) in descriptions.iter().enumerate() {
            let solvable = index.pool().solvables().nth(id).map(|(id, _)| id).unwrap();
            for &(name, start, end) in requires {
                index.add_requires(solvable, NAMES[name], Range::between(start, end));
            }
            for &name in conflicts {
                index.add_conflicts(solvable, NAMES[name], Range::full());
            }
        }
        index
    }

    fn description() -> impl Strategy<Value = Description> {
        (
            0..NAMES.len(),
            1..4u32,
            prop::collection::vec((0..NAMES.len(), 1..3u32, 2..5u32), 0..3),
            prop::collection::vec(0..NAMES.len(), 0..2),
        )
    }

    /// Checks that the present resolvables provide each other's requirements and do not
    /// conflict
    fn assert_consistent(index: &TestIndex, solution: &Solution) {
        let present = &solution.to_install;
        for &solvable in present {
            let dependencies = index.dependencies_of(solvable);
            for capability in dependencies.requires {
                assert!(
                    index
                        .providers_of(capability)
                        .iter()
                        .any(|p| present.contains(p)),
                    "requirement of {} is not provided",
                    solvable.display(index.pool())
                );
            }
            for capability in dependencies.conflicts {
                assert!(
                    !index
                        .providers_of(capability)
                        .iter()
                        .any(|p| *p != solvable && present.contains(p)),
                    "conflict of {} is violated",
                    solvable.display(index.pool())
                );
            }
        }
    }

    proptest! {
        #[test]
        fn test_solving_is_deterministic(
            descriptions in prop::collection::vec(description(), 1..7),
            install in 0..7usize,
        ) {
            let install = install % descriptions.len();
            let run = || {
                let index = build(&descriptions);
                let target = index.pool().solvables().nth(install).map(|(id, _)| id).unwrap();
                let mut request = Request::new();
                request.install(target);
                let mut solver = Solver::new(index);
                let result = solver.solve(&request);
                (solver, result)
            };

            let (solver, first) = run();
            let (_, second) = run();
            prop_assert_eq!(&first, &second);
            if let Ok(solution) = &first {
                assert_consistent(solver.index(), solution);
            }
        }
    }
}
