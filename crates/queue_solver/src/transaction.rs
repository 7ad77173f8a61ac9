use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::internal::id::{CapabilityId, NameId, SolvableId};
use crate::{PackageName, Pool, VersionSet};

/// The transaction computed by [`crate::Solver::solve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Resolvables that are not part of the system yet and have to be installed, sorted by id
    pub to_install: Vec<SolvableId>,

    /// Resolvables that are part of the system and have to be removed, sorted by id
    pub to_remove: Vec<SolvableId>,

    /// Capabilities suggested by the installed resolvables that nothing present provides, sorted
    /// by id. These are never installed automatically.
    pub suggested: Vec<CapabilityId>,
}

/// A single step of a [`Solution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Install a resolvable whose name is not on the system yet
    Install(SolvableId),
    /// Replace a resolvable with another resolvable of the same name
    Upgrade {
        /// The resolvable that is removed
        from: SolvableId,
        /// The resolvable that is installed
        to: SolvableId,
    },
    /// Remove a resolvable without replacing it
    Remove(SolvableId),
}

impl Solution {
    /// Returns true if applying the solution would not change the system.
    pub fn is_empty(&self) -> bool {
        self.to_install.is_empty() && self.to_remove.is_empty()
    }

    /// Returns the solution as a list of operations. A removal and an install of the same name
    /// are reported as a single [`Operation::Upgrade`].
    ///
    /// Installs and upgrades come first in the order of [`Self::to_install`], followed by the
    /// remaining removals.
    pub fn operations<VS: VersionSet, N: PackageName>(&self, pool: &Pool<VS, N>) -> Vec<Operation> {
        let mut removed_by_name: HashMap<NameId, Vec<SolvableId>> = HashMap::new();
        for &id in &self.to_remove {
            removed_by_name
                .entry(pool.resolve_solvable(id).name)
                .or_default()
                .push(id);
        }

        let mut upgraded = Vec::new();
        let mut operations: Vec<Operation> = self
            .to_install
            .iter()
            .map(|&id| {
                let name = pool.resolve_solvable(id).name;
                match removed_by_name.get_mut(&name).and_then(|ids| ids.pop()) {
                    Some(from) => {
                        upgraded.push(from);
                        Operation::Upgrade { from, to: id }
                    }
                    None => Operation::Install(id),
                }
            })
            .collect();

        operations.extend(
            self.to_remove
                .iter()
                .filter(|id| !upgraded.contains(id))
                .map(|&id| Operation::Remove(id)),
        );
        operations
    }
}

/// Orders `installs` so that every resolvable comes after the resolvables it requires.
/// Resolvables that require each other are kept next to each other, ordered by id.
pub(crate) fn install_order(
    installs: &[SolvableId],
    mut requires: impl FnMut(SolvableId) -> Vec<SolvableId>,
) -> Vec<SolvableId> {
    let mut graph = DiGraph::<SolvableId, ()>::with_capacity(installs.len(), installs.len());
    let nodes: HashMap<SolvableId, NodeIndex> = installs
        .iter()
        .map(|&id| (id, graph.add_node(id)))
        .collect();

    for &id in installs {
        for dependency in requires(id) {
            if dependency == id {
                continue;
            }
            if let Some(&target) = nodes.get(&dependency) {
                graph.update_edge(nodes[&id], target, ());
            }
        }
    }

    // Components come out in reverse topological order, which puts dependencies first.
    tarjan_scc(&graph)
        .into_iter()
        .flat_map(|mut component| {
            component.sort_by_key(|&node| graph[node]);
            component.into_iter().map(|node| graph[node])
        })
        .collect()
}
