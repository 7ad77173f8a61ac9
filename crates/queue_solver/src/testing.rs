//! Helpers shared by the unit tests of this crate.

use std::fmt::{Display, Formatter, Write};
use std::str::FromStr;

use crate::{CapabilityId, CapabilityIndex, InMemoryIndex, Pool, Solution, SolvableId, VersionSet};

/// A half open range of integer versions, `start..end`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub(crate) struct Range {
    start: u32,
    end: u32,
}

impl Range {
    pub(crate) fn full() -> Self {
        Self {
            start: 0,
            end: u32::MAX,
        }
    }

    pub(crate) fn between(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub(crate) fn singleton(version: u32) -> Self {
        Self::between(version, version + 1)
    }
}

impl VersionSet for Range {
    type V = u32;

    fn contains(&self, v: &u32) -> bool {
        (self.start..self.end).contains(v)
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Range::full() {
            write!(f, "*")
        } else if self.end == self.start + 1 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// A capability written as `name`, `name 3` or `name 1..5`.
pub(crate) struct Spec {
    pub(crate) name: String,
    pub(crate) range: Range,
}

impl FromStr for Spec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split = s.split_whitespace();
        let name = split
            .next()
            .ok_or_else(|| format!("empty spec '{s}'"))?
            .to_owned();
        let range = match split.next() {
            None => Range::full(),
            Some(range) => match range.split_once("..") {
                Some((start, end)) => Range::between(
                    start.parse().map_err(|_| format!("bad range '{range}'"))?,
                    end.parse().map_err(|_| format!("bad range '{range}'"))?,
                ),
                None => Range::singleton(range.parse().map_err(|_| format!("bad version '{range}'"))?),
            },
        };
        Ok(Spec { name, range })
    }
}

pub(crate) type TestIndex = InMemoryIndex<Range>;

fn parse(spec: &str) -> Spec {
    Spec::from_str(spec).unwrap()
}

/// Shorthands to populate a [`TestIndex`] from spec strings.
pub(crate) trait TestIndexExt {
    fn package(&mut self, name: &str, version: u32, requires: &[&str]) -> SolvableId;
    fn requires(&mut self, solvable: SolvableId, spec: &str);
    fn conflicts(&mut self, solvable: SolvableId, spec: &str);
    fn obsoletes(&mut self, solvable: SolvableId, spec: &str);
    fn recommends(&mut self, solvable: SolvableId, spec: &str);
    fn suggests(&mut self, solvable: SolvableId, spec: &str);
    fn installed_package(&mut self, name: &str, version: u32, requires: &[&str]) -> SolvableId;
    fn spec(&self, spec: &str) -> CapabilityId;
    fn find(&self, name: &str, version: u32) -> SolvableId;
}

impl TestIndexExt for TestIndex {
    fn package(&mut self, name: &str, version: u32, requires: &[&str]) -> SolvableId {
        let id = self.add_resolvable(name, version);
        for spec in requires {
            self.requires(id, spec);
        }
        id
    }

    fn requires(&mut self, solvable: SolvableId, spec: &str) {
        let spec = parse(spec);
        self.add_requires(solvable, spec.name, spec.range);
    }

    fn conflicts(&mut self, solvable: SolvableId, spec: &str) {
        let spec = parse(spec);
        self.add_conflicts(solvable, spec.name, spec.range);
    }

    fn obsoletes(&mut self, solvable: SolvableId, spec: &str) {
        let spec = parse(spec);
        self.add_obsoletes(solvable, spec.name, spec.range);
    }

    fn recommends(&mut self, solvable: SolvableId, spec: &str) {
        let spec = parse(spec);
        self.add_recommends(solvable, spec.name, spec.range);
    }

    fn suggests(&mut self, solvable: SolvableId, spec: &str) {
        let spec = parse(spec);
        self.add_suggests(solvable, spec.name, spec.range);
    }

    fn installed_package(&mut self, name: &str, version: u32, requires: &[&str]) -> SolvableId {
        let id = self.package(name, version, requires);
        self.set_installed(id, true);
        id
    }

    fn spec(&self, spec: &str) -> CapabilityId {
        let spec = parse(spec);
        self.capability(spec.name, spec.range)
    }

    fn find(&self, name: &str, version: u32) -> SolvableId {
        let pool = self.pool();
        pool.solvables()
            .find(|(_, solvable)| {
                pool.resolve_package_name(solvable.name) == name && solvable.inner == version
            })
            .map(|(id, _)| id)
            .unwrap_or_else(|| panic!("no resolvable {name}={version}"))
    }
}

/// Renders a solution as one `install`/`remove` line per resolvable.
pub(crate) fn solution_to_string(pool: &Pool<Range>, solution: &Solution) -> String {
    let mut buf = String::new();
    for &id in &solution.to_install {
        writeln!(buf, "install {}", id.display(pool)).unwrap();
    }
    for &id in &solution.to_remove {
        writeln!(buf, "remove {}", id.display(pool)).unwrap();
    }
    buf
}
