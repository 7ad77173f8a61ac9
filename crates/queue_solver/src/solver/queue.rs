use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use crate::internal::id::{CapabilityId, SolvableId};
use crate::problem::{CancelReason, ProblemCause};
use crate::solver::context::ResolutionContext;
use crate::solver::item::{DecisionItem, ItemProcessor, Outcome};
use crate::{CapabilityIndex, PackageName, Pool, VersionSet};

/// The state a [`ResolverQueue`] is left in after [`ResolverQueue::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueueState {
    /// All items were processed, the context is a solution
    Complete,
    /// The context cannot lead to a solution
    Invalid,
    /// The head of the queue is a branch point that has to be split
    Branching,
    /// The cancellation check asked to stop
    Cancelled(CancelReason),
}

/// An ordered worklist of decision items bound to the resolution context they are applied to.
///
/// Only branch points are ever deferred, and only while the queue still holds items that are not
/// branch points. Every such item makes progress when processed, so deferral is bounded: once
/// nothing but branch points is left the head of the queue is reported as
/// [`QueueState::Branching`].
#[derive(Clone)]
pub(crate) struct ResolverQueue {
    context: ResolutionContext,
    items: VecDeque<DecisionItem>,
}

impl ResolverQueue {
    pub(crate) fn new(context: ResolutionContext) -> Self {
        Self::with_items(context, VecDeque::new())
    }

    fn with_items(context: ResolutionContext, items: VecDeque<DecisionItem>) -> Self {
        Self { context, items }
    }

    pub(crate) fn add_item_to_install(&mut self, solvable: SolvableId) {
        self.items.push_back(DecisionItem::Install(solvable));
    }

    pub(crate) fn add_item_to_remove(&mut self, solvable: SolvableId, remove_only: bool) {
        self.items.push_back(DecisionItem::Remove {
            solvable,
            remove_only,
        });
    }

    #[cfg(test)]
    pub(crate) fn add_item_to_establish(&mut self, solvable: SolvableId) {
        self.items.push_back(DecisionItem::Establish(solvable));
    }

    pub(crate) fn add_item_to_verify(&mut self, solvable: SolvableId) {
        self.items.push_back(DecisionItem::Verify(solvable));
    }

    pub(crate) fn add_extra_dependency(&mut self, capability: CapabilityId) {
        self.items.push_back(DecisionItem::ExtraDependency(capability));
    }

    pub(crate) fn add_extra_conflict(&mut self, capability: CapabilityId) {
        self.items.push_back(DecisionItem::ExtraConflict(capability));
    }

    pub(crate) fn context(&self) -> &ResolutionContext {
        &self.context
    }

    /// Returns true if all items have been processed.
    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn is_invalid(&self) -> bool {
        self.context.is_invalid()
    }

    pub(crate) fn problem(&self) -> Option<ProblemCause> {
        self.context.problem()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the queue is not empty and every remaining item is a branch point.
    pub(crate) fn contains_only_branches(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(DecisionItem::is_branch)
    }

    /// Processes the item at the head of the queue. Returns `None` if processing can continue.
    pub(crate) fn process_once<VS, N, I>(
        &mut self,
        processor: &ItemProcessor<'_, VS, N, I>,
    ) -> Option<QueueState>
    where
        VS: VersionSet,
        N: PackageName + Display,
        I: CapabilityIndex<VS, N>,
    {
        let Some(item) = self.items.pop_front() else {
            return Some(QueueState::Complete);
        };
        tracing::trace!("├─ {}", item.display(processor.cache.pool()));

        let pending_work = self.items.iter().any(|item| !item.is_branch());
        let mut new_items = Vec::new();
        match processor.process(&item, &mut self.context, pending_work, &mut new_items) {
            Outcome::Done => {
                self.items.extend(new_items);
                if self.context.is_invalid() {
                    return Some(QueueState::Invalid);
                }
                None
            }
            Outcome::Defer => {
                debug_assert!(pending_work, "only branch points wait for pending work");
                self.items.push_back(item);
                None
            }
            Outcome::Branch(viable) => {
                self.items.push_front(item.with_alternatives(viable));
                Some(QueueState::Branching)
            }
            Outcome::Invalidate(cause) => {
                tracing::trace!("╘══ invalid: {cause:?}");
                self.context.set_invalid(cause);
                Some(QueueState::Invalid)
            }
        }
    }

    /// Processes items until the queue is complete, invalid or has to branch. The
    /// cancellation check is consulted before every item.
    pub(crate) fn process<VS, N, I>(
        &mut self,
        processor: &ItemProcessor<'_, VS, N, I>,
        should_cancel: &mut dyn FnMut() -> Option<CancelReason>,
    ) -> QueueState
    where
        VS: VersionSet,
        N: PackageName + Display,
        I: CapabilityIndex<VS, N>,
    {
        loop {
            if self.context.is_invalid() {
                return QueueState::Invalid;
            }
            if let Some(reason) = should_cancel() {
                return QueueState::Cancelled(reason);
            }
            if let Some(state) = self.process_once(processor) {
                return state;
            }
        }
    }

    /// Splits the queue at its first branch point. Every alternative gets its own queue with a
    /// copy of the context and the remaining items, the alternative being installed first. An
    /// optional branch point gets one more queue that leaves it unsatisfied.
    ///
    /// Queues that contain nothing but branch points are added to `deferred`, all others to
    /// `new`, in the order of the alternatives. A queue without branch points is added to `new`
    /// unchanged.
    pub(crate) fn split_first_branch(
        mut self,
        new: &mut Vec<ResolverQueue>,
        deferred: &mut Vec<ResolverQueue>,
    ) {
        let branch = self
            .items
            .iter()
            .position(DecisionItem::is_branch)
            .and_then(|position| self.items.remove(position));
        let Some(DecisionItem::Branch {
            alternatives,
            optional,
            ..
        }) = branch
        else {
            new.push(self);
            return;
        };

        let mut children = Vec::with_capacity(alternatives.len() + usize::from(optional));
        for alternative in alternatives {
            let mut items = VecDeque::with_capacity(self.items.len() + 1);
            items.push_back(DecisionItem::Install(alternative));
            items.extend(self.items.iter().cloned());
            children.push(ResolverQueue::with_items(self.context.clone(), items));
        }
        if optional {
            children.push(ResolverQueue::with_items(self.context, self.items));
        }

        for child in children {
            if child.contains_only_branches() {
                deferred.push(child);
            } else {
                new.push(child);
            }
        }
    }

    /// Returns an object that can be used to display the queue in a human readable fashion.
    pub(crate) fn display<'a, VS: VersionSet, N: PackageName + Display>(
        &'a self,
        pool: &'a Pool<VS, N>,
    ) -> ResolverQueueDisplay<'a, VS, N> {
        ResolverQueueDisplay { queue: self, pool }
    }
}

pub(crate) struct ResolverQueueDisplay<'a, VS: VersionSet, N: PackageName + Display> {
    queue: &'a ResolverQueue,
    pool: &'a Pool<VS, N>,
}

impl<VS: VersionSet, N: PackageName + Display> Display for ResolverQueueDisplay<'_, VS, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "queue with {} item(s)", self.queue.items.len())?;
        for item in &self.queue.items {
            writeln!(f, "  {}", item.display(self.pool))?;
        }
        write!(f, "{}", self.queue.context.display(self.pool))
    }
}
