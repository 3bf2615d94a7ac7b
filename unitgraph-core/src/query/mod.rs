// Blast radius: which units must be re-examined when files change.
//
// Traversal follows dependents: if B depends on A and A changes, B is
// affected. Breadth-first, so each unit is recorded at its minimum hop count.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::store::DependencyGraph;

impl DependencyGraph {
    /// Units transitively affected by changes to `changed_files`.
    ///
    /// Seeds are the units declared in those files and are always included,
    /// even with `max_depth = Some(0)`. `None` means no depth limit.
    pub fn affected_by<I, S>(&self, changed_files: I, max_depth: Option<usize>) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.affected_with_depth(changed_files, max_depth)
            .into_keys()
            .collect()
    }

    /// Like [`affected_by`](Self::affected_by), keeping the hop count at
    /// which each unit was first reached.
    pub fn affected_with_depth<I, S>(
        &self,
        changed_files: I,
        max_depth: Option<usize>,
    ) -> BTreeMap<String, usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut depths: BTreeMap<String, usize> = BTreeMap::new();
        let mut frontier: VecDeque<(&str, usize)> = VecDeque::new();

        for file in changed_files {
            for id in self.units_for_file(file.as_ref()) {
                if !depths.contains_key(id) {
                    depths.insert(id.to_string(), 0);
                    frontier.push_back((id, 0));
                }
            }
        }

        while let Some((current, depth)) = frontier.pop_front() {
            if max_depth.is_some_and(|limit| depth >= limit) {
                continue;
            }
            for dependent in self.dependents_of(current) {
                if !depths.contains_key(dependent) {
                    depths.insert(dependent.to_string(), depth + 1);
                    frontier.push_back((dependent, depth + 1));
                }
            }
        }

        depths
    }
}

// ── Tests ──────────────────────────────────────────────────────────
