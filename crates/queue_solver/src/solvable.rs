use std::fmt::{Display, Formatter};

use crate::internal::id::NameId;
use crate::{PackageName, Pool, VersionSet};

/// A resolvable as it is stored in the [`Pool`]: the interned name and the version record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Solvable<V> {
    /// The name of the resolvable
    pub name: NameId,
    /// The version of the resolvable
    pub inner: V,
}

impl<V> Solvable<V> {
    pub(crate) fn new(name: NameId, inner: V) -> Self {
        Self { name, inner }
    }

    /// Returns the version record of this resolvable
    pub fn inner(&self) -> &V {
        &self.inner
    }

    /// Returns an object that can be used to format the resolvable as `name=version`.
    pub fn display<'pool, VS: VersionSet<V = V>, N: PackageName + Display>(
        &'pool self,
        pool: &'pool Pool<VS, N>,
    ) -> DisplaySolvable<'pool, VS, N> {
        DisplaySolvable {
            pool,
            solvable: self,
        }
    }
}

/// Displays a resolvable as `name=version`
pub struct DisplaySolvable<'pool, VS: VersionSet, N: PackageName> {
    pool: &'pool Pool<VS, N>,
    solvable: &'pool Solvable<VS::V>,
}

impl<VS: VersionSet, N: PackageName + Display> Display for DisplaySolvable<'_, VS, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.pool.resolve_package_name(self.solvable.name);
        write!(f, "{}={}", name, &self.solvable.inner)
    }
}
