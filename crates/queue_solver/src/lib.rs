//! Implements a backtracking dependency resolver that explores alternative providers through a
//! frontier of resolver queues.
//!
//! Each [`Solver`] run starts with a single queue: a worklist of decision items (install this,
//! remove that, establish the requirements of something) bound to a resolution context that holds
//! the proposed status of every resolvable that was touched. Items are processed in FIFO order.
//! When a requirement can be satisfied by more than one provider the queue records a branch point
//! and, once nothing else can make progress, is split into one child queue per provider. Every
//! child gets its own copy of the context, so siblings never observe each other's decisions. The
//! first child that drains its worklist without becoming invalid is the solution.
//!
//! The resolver itself never looks at version strings or capability syntax. Everything it knows
//! about resolvables comes from a [`CapabilityIndex`], which answers "who provides this
//! capability" in an authoritative order and "what does this resolvable require, conflict with,
//! obsolete, recommend or suggest". [`InMemoryIndex`] is a ready to use implementation of that
//! trait on top of a [`Pool`].

#![deny(missing_docs)]

mod index;
pub(crate) mod internal;
mod pool;
pub mod problem;
mod request;
mod solvable;
mod solver;
#[cfg(test)]
mod testing;
mod transaction;

use std::fmt::{Debug, Display};
use std::hash::Hash;

pub use index::{InMemoryIndex, DEFAULT_PRIORITY};
pub use internal::id::{CapabilityId, NameId, SolvableId};
pub use pool::Pool;
pub use problem::{CancelReason, ProblemCause, Unresolvable, UnresolvableOrCancelled};
pub use request::Request;
pub use solvable::Solvable;
pub use solver::{Solver, SolverOptions};
pub use transaction::{Operation, Solution};

/// Blanket trait implementation for something that we consider a resolvable name.
pub trait PackageName: Eq + Hash {}
impl<N: Eq + Hash> PackageName for N {}

/// Trait describing sets of versions.
pub trait VersionSet: Debug + Display + Clone + Eq + Hash {
    /// Version type associated with the sets manipulated.
    type V: Display + Ord;

    /// Evaluate membership of a version in this set.
    fn contains(&self, v: &Self::V) -> bool;
}

/// The relations a resolvable declares towards capabilities.
///
/// What a resolvable *provides* is not part of this struct: it is consumed by the
/// [`CapabilityIndex`] itself when it answers [`CapabilityIndex::providers_of`].
#[derive(Default, Clone, Debug, Eq, PartialEq)]
pub struct Dependencies {
    /// Capabilities that must be provided by something present on the system.
    pub requires: Vec<CapabilityId>,

    /// Capabilities that must not be provided by anything present on the system.
    pub conflicts: Vec<CapabilityId>,

    /// Capabilities whose present providers are removed when this resolvable is installed.
    pub obsoletes: Vec<CapabilityId>,

    /// Capabilities that are installed when possible, see [`SolverOptions::install_recommends`].
    pub recommends: Vec<CapabilityId>,

    /// Capabilities that are never installed automatically but are reported in
    /// [`Solution::suggested`].
    pub suggests: Vec<CapabilityId>,
}

/// The read-only oracle the resolver queries about resolvables and capabilities.
///
/// Implementations must be deterministic: the order returned by [`Self::providers_of`] is used
/// as-is to decide which alternative is explored first, the resolver never re-sorts it.
pub trait CapabilityIndex<VS: VersionSet, N: PackageName = String> {
    /// Returns the pool that interns the names, resolvables and capabilities of this index.
    fn pool(&self) -> &Pool<VS, N>;

    /// Returns the resolvables that satisfy the capability, in order of preference. Returns an
    /// empty vector if nothing provides it.
    fn providers_of(&self, capability: CapabilityId) -> Vec<SolvableId>;

    /// Returns the relations declared by the resolvable.
    fn dependencies_of(&self, solvable: SolvableId) -> Dependencies;

    /// Returns true if the resolvable is part of the system before the transaction.
    fn is_installed(&self, solvable: SolvableId) -> bool;

    /// Returns all the resolvables that are part of the system before the transaction.
    fn installed(&self) -> Vec<SolvableId>;

    /// Consulted once for every decision item the resolver processes. Returning a reason aborts
    /// the search with [`UnresolvableOrCancelled::Cancelled`].
    fn should_cancel(&self) -> Option<CancelReason> {
        None
    }
}
