// Incremental re-extraction: decide what to re-process and rebuild.
//
// The driver loads the prior graph, asks which units a set of changed files
// reaches, re-extracts only those, and replays them onto a copy of the prior
// graph. The prior graph itself is never mutated.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::types::Unit;

use super::DependencyGraph;

/// Work list for one incremental run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementalPlan {
    pub changed_files: Vec<String>,
    /// Union of every file's blast radius.
    pub affected: BTreeSet<String>,
    /// Blast radius of each changed file on its own.
    pub per_file: BTreeMap<String, BTreeSet<String>>,
}

impl IncrementalPlan {
    pub fn compute<S: AsRef<str>>(
        prior: &DependencyGraph,
        changed_files: &[S],
        max_depth: Option<usize>,
    ) -> Self {
        let mut files: Vec<String> = changed_files
            .iter()
            .map(|f| f.as_ref().to_string())
            .collect();
        files.sort_unstable();
        files.dedup();

        let per_file: BTreeMap<String, BTreeSet<String>> = files
            .par_iter()
            .map(|file| (file.clone(), prior.affected_by([file.as_str()], max_depth)))
            .collect();

        let affected: BTreeSet<String> = per_file.values().flatten().cloned().collect();

        debug!(
            files = files.len(),
            affected = affected.len(),
            max_depth = ?max_depth,
            "Planned incremental re-extraction"
        );

        Self {
            changed_files: files,
            affected,
            per_file,
        }
    }

    /// Changed files that matched no registered unit.
    pub fn unmatched_files(&self) -> impl Iterator<Item = &str> {
        self.per_file
            .iter()
            .filter(|(_, ids)| ids.is_empty())
            .map(|(file, _)| file.as_str())
    }

    pub fn needs_reprocessing(&self, identifier: &str) -> bool {
        self.affected.contains(identifier)
    }

    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }
}

/// Replay re-extracted units onto a copy of `prior`.
pub fn rebuild(
    prior: &DependencyGraph,
    units: impl IntoIterator<Item = Unit>,
) -> Result<DependencyGraph> {
    let mut next = prior.clone();
    let replayed = next.register_all(units)?;
    debug!(
        replayed,
        nodes = next.node_count(),
        edges = next.edge_count(),
        "Rebuilt graph from prior snapshot"
    );
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitKind;

    fn prior() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph
            .register_all(vec![
                Unit::new("User", UnitKind::Model).file("app/models/user.rb"),
                Unit::new("Product", UnitKind::Model).file("app/models/product.rb"),
                Unit::new("UserService", UnitKind::Service)
                    .file("app/services/user_service.rb")
                    .depends_on("method_call", "User"),
                Unit::new("CartService", UnitKind::Service)
                    .file("app/services/cart_service.rb")
                    .depends_on("method_call", "Product"),
            ])
            .unwrap();
        graph
    }

    #[test]
    fn plan_unions_per_file_blast_radius() {
        let graph = prior();
        let plan = IncrementalPlan::compute(
            &graph,
            &["app/models/user.rb", "app/models/product.rb", "app/models/user.rb"],
            None,
        );
        assert_eq!(plan.changed_files.len(), 2);
        assert_eq!(plan.affected.len(), 4);
        assert_eq!(plan.per_file["app/models/user.rb"].len(), 2);
        assert!(plan.needs_reprocessing("CartService"));
    }

    #[test]
    fn unmatched_files_are_listed() {
        let graph = prior();
        let plan = IncrementalPlan::compute(&graph, &["config/routes.rb"], None);
        assert!(plan.is_empty());
        assert_eq!(plan.unmatched_files().collect::<Vec<_>>(), vec!["config/routes.rb"]);
    }

    #[test]
    fn rebuild_leaves_prior_untouched() {
        let graph = prior();
        let rank_before = graph.pagerank().clone();

        let next = rebuild(
            &graph,
            vec![
                Unit::new("UserService", UnitKind::Service)
                    .file("app/services/user_service.rb")
                    .depends_on("method_call", "User")
                    .depends_on("method_call", "Product"),
            ],
        )
        .unwrap();

        assert_eq!(graph.dependencies_of("UserService"), vec!["User"]);
        assert_eq!(next.dependencies_of("UserService"), vec!["User", "Product"]);
        assert_eq!(next.dependents_of("Product"), vec!["CartService", "UserService"]);
        assert_eq!(graph.pagerank(), &rank_before);
        assert_ne!(next.pagerank(), &rank_before);
    }

    #[test]
    fn rebuild_propagates_invalid_units() {
        let graph = prior();
        assert!(rebuild(&graph, vec![Unit::new("", UnitKind::Model)]).is_err());
    }
}
