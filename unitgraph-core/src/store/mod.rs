// Node/edge store: registered units and their deduplicated forward edges.
//
// Edges are keyed by source identifier whether or not the target has been
// registered yet. The reverse index is keyed the same way, so a dangling
// edge resolves as soon as its target is registered.

pub mod handle;
pub mod incremental;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

use tracing::debug;

use crate::analyze::structure::StructuralReport;
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::types::{Edge, Unit, UnitKind, UnitNode};

pub use handle::GraphHandle;
pub use incremental::IncrementalPlan;
pub use snapshot::{EdgeMeta, GraphSnapshot, NodeRecord, SnapshotStats};

/// `PageRank` scores keyed by unit identifier.
pub type RankScores = BTreeMap<String, f64>;

/// Directed dependency graph over code units.
///
/// Mutation (`register`) takes `&mut self` and clears the cached derived
/// views. Every read takes `&self`, so a finished graph can be shared across
/// threads; the cached `PageRank` and structural report are computed once on
/// first access.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    config: GraphConfig,
    nodes: BTreeMap<String, UnitNode>,
    /// Forward edges per source, in first-registration order.
    edges: BTreeMap<String, Vec<Edge>>,
    /// Reverse index: target → sources.
    dependents: BTreeMap<String, BTreeSet<String>>,
    /// `file_path` → identifiers declared in that file.
    files: BTreeMap<String, BTreeSet<String>>,
    edge_count: usize,
    rank_cache: OnceLock<RankScores>,
    report_cache: OnceLock<StructuralReport>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph whose cached analyses use `config`.
    pub fn with_config(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ── Mutation ───────────────────────────────────────────────────

    /// Upsert a unit and replace its forward edge set.
    ///
    /// Targets need not exist yet. Duplicate targets collapse to one edge;
    /// the first descriptor's kind and `via` are kept.
    pub fn register(&mut self, unit: Unit) -> Result<()> {
        if unit.identifier.trim().is_empty() {
            return Err(GraphError::InvalidInput(
                "unit identifier must not be empty".into(),
            ));
        }
        if let Some(dep) = unit.dependencies.iter().find(|d| d.target.trim().is_empty()) {
            return Err(GraphError::InvalidInput(format!(
                "dependency of {} has an empty target (kind {})",
                unit.identifier, dep.kind
            )));
        }

        let Unit {
            identifier,
            kind,
            file_path,
            dependencies,
        } = unit;

        let mut seen = HashSet::new();
        let new_edges: Vec<Edge> = dependencies
            .into_iter()
            .filter(|d| seen.insert(d.target.clone()))
            .map(|d| Edge {
                target: d.target,
                kind: d.kind,
                via: d.via,
            })
            .collect();

        if let Some(previous) = self.nodes.get(&identifier) {
            debug!(
                unit = %identifier,
                old_kind = %previous.kind,
                new_kind = %kind,
                "Replacing previously registered unit"
            );
        }

        self.upsert_node(&identifier, UnitNode { kind, file_path });
        self.replace_edges(&identifier, new_edges);
        self.invalidate();
        Ok(())
    }

    /// Register a batch of units in order, stopping at the first invalid one.
    pub fn register_all(&mut self, units: impl IntoIterator<Item = Unit>) -> Result<usize> {
        let mut count = 0;
        for unit in units {
            self.register(unit)?;
            count += 1;
        }
        Ok(count)
    }

    fn upsert_node(&mut self, identifier: &str, node: UnitNode) {
        let old_path = self
            .nodes
            .insert(identifier.to_string(), node.clone())
            .and_then(|old| old.file_path);

        if let Some(path) = old_path {
            if let Some(ids) = self.files.get_mut(&path) {
                ids.remove(identifier);
                if ids.is_empty() {
                    self.files.remove(&path);
                }
            }
        }
        if let Some(path) = node.file_path {
            self.files
                .entry(path)
                .or_default()
                .insert(identifier.to_string());
        }
    }

    fn replace_edges(&mut self, source: &str, new_edges: Vec<Edge>) {
        if let Some(old_edges) = self.edges.remove(source) {
            self.edge_count -= old_edges.len();
            for edge in old_edges {
                if let Some(sources) = self.dependents.get_mut(&edge.target) {
                    sources.remove(source);
                    if sources.is_empty() {
                        self.dependents.remove(&edge.target);
                    }
                }
            }
        }

        if new_edges.is_empty() {
            return;
        }
        for edge in &new_edges {
            self.dependents
                .entry(edge.target.clone())
                .or_default()
                .insert(source.to_string());
        }
        self.edge_count += new_edges.len();
        self.edges.insert(source.to_string(), new_edges);
    }

    fn invalidate(&mut self) {
        self.rank_cache.take();
        self.report_cache.take();
    }

    // ── Lookups ────────────────────────────────────────────────────

    pub fn contains(&self, identifier: &str) -> bool {
        self.nodes.contains_key(identifier)
    }

    pub fn node(&self, identifier: &str) -> Option<&UnitNode> {
        self.nodes.get(identifier)
    }

    /// All registered identifiers, in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &UnitNode)> {
        self.nodes.iter().map(|(id, node)| (id.as_str(), node))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of stored forward edges, dangling ones included.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Targets this unit points to, in registration order.
    pub fn dependencies_of(&self, identifier: &str) -> Vec<&str> {
        self.edges
            .get(identifier)
            .map(|edges| edges.iter().map(|e| e.target.as_str()).collect())
            .unwrap_or_default()
    }

    /// Forward edges with their diagnostic kind and `via`.
    pub fn dependency_edges(&self, identifier: &str) -> &[Edge] {
        self.edges
            .get(identifier)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Units whose forward edges point at `identifier`, in sorted order.
    ///
    /// Sources are reported even while `identifier` itself is unregistered.
    pub fn dependents_of(&self, identifier: &str) -> Vec<&str> {
        self.dependents
            .get(identifier)
            .map(|sources| sources.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn dependent_count(&self, identifier: &str) -> usize {
        self.dependents.get(identifier).map_or(0, BTreeSet::len)
    }

    pub fn units_of_type(&self, kind: &UnitKind) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| &node.kind == kind)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Identifiers declared in `path`.
    pub fn units_for_file(&self, path: &str) -> Vec<&str> {
        self.files
            .get(path)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Iterate every stored `(source, edge)` pair.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &Edge)> {
        self.edges
            .iter()
            .flat_map(|(source, edges)| edges.iter().map(move |e| (source.as_str(), e)))
    }

    /// Edges whose target is not a registered unit.
    pub fn dangling_edges(&self) -> impl Iterator<Item = (&str, &Edge)> {
        self.edges().filter(|(_, e)| !self.nodes.contains_key(&e.target))
    }

    // ── Cached derived views ───────────────────────────────────────

    pub(crate) fn rank_cache(&self) -> &OnceLock<RankScores> {
        &self.rank_cache
    }

    pub(crate) fn report_cache(&self) -> &OnceLock<StructuralReport> {
        &self.report_cache
    }

    /// Dense index view of the graph restricted to edges between registered units.
    pub(crate) fn resolved(&self) -> ResolvedGraph<'_> {
        ResolvedGraph::build(self)
    }
}

/// Positional view over registered nodes for the numeric algorithms.
///
/// Index `i` is the `i`-th identifier in sorted order; `out[i]` lists
/// resolved targets in registration order.
#[derive(Debug)]
pub(crate) struct ResolvedGraph<'a> {
    pub ids: Vec<&'a str>,
    pub out: Vec<Vec<usize>>,
}

impl<'a> ResolvedGraph<'a> {
    fn build(graph: &'a DependencyGraph) -> Self {
        let ids: Vec<&str> = graph.identifiers().collect();
        let position: std::collections::HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let out = ids
            .iter()
            .map(|id| {
                graph
                    .dependency_edges(id)
                    .iter()
                    .filter_map(|e| position.get(e.target.as_str()).copied())
                    .collect()
            })
            .collect();

        Self { ids, out }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out.iter().map(Vec::len).sum()
    }

    /// `(source, target)` index pairs in source-major order.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.out
            .iter()
            .enumerate()
            .flat_map(|(u, targets)| targets.iter().map(move |&v| (u, v)))
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dependency;

    fn order_user() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph
            .register(
                Unit::new("Order", UnitKind::Model)
                    .file("app/models/order.rb")
                    .depends_on("association", "User"),
            )
            .unwrap();
        graph
            .register(Unit::new("User", UnitKind::Model).file("app/models/user.rb"))
            .unwrap();
        graph
    }

    #[test]
    fn register_and_query_both_directions() {
        let graph = order_user();
        assert_eq!(graph.dependencies_of("Order"), vec!["User"]);
        assert_eq!(graph.dependents_of("User"), vec!["Order"]);
        assert!(graph.dependencies_of("User").is_empty());
        assert!(graph.dependents_of("Order").is_empty());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn unknown_identifier_yields_empty_results() {
        let graph = order_user();
        assert!(graph.dependencies_of("Nope").is_empty());
        assert!(graph.dependents_of("Nope").is_empty());
        assert!(graph.units_of_type(&UnitKind::Job).is_empty());
        assert!(graph.node("Nope").is_none());
    }

    #[test]
    fn dangling_edge_resolves_when_target_registers() {
        let mut graph = DependencyGraph::new();
        graph
            .register(Unit::new("A", UnitKind::Service).depends_on("method_call", "B"))
            .unwrap();
        assert!(!graph.contains("B"));
        assert_eq!(graph.dangling_edges().count(), 1);

        graph.register(Unit::new("B", UnitKind::Model)).unwrap();
        assert_eq!(graph.dependents_of("B"), vec!["A"]);
        assert_eq!(graph.dangling_edges().count(), 0);
    }

    #[test]
    fn duplicate_targets_collapse_first_kind_wins() {
        let mut graph = DependencyGraph::new();
        graph
            .register(
                Unit::new("A", UnitKind::Service)
                    .dependency(Dependency::new("association", "B").via("has_many"))
                    .depends_on("method_call", "B")
                    .depends_on("constant", "C"),
            )
            .unwrap();

        assert_eq!(graph.dependencies_of("A"), vec!["B", "C"]);
        assert_eq!(graph.edge_count(), 2);
        let edges = graph.dependency_edges("A");
        assert_eq!(edges[0].kind, "association");
        assert_eq!(edges[0].via.as_deref(), Some("has_many"));
    }

    #[test]
    fn reregistration_replaces_node_and_edges() {
        let mut graph = DependencyGraph::new();
        graph
            .register(
                Unit::new("A", UnitKind::Service)
                    .file("old.rb")
                    .depends_on("x", "B")
                    .depends_on("x", "C"),
            )
            .unwrap();
        graph
            .register(
                Unit::new("A", UnitKind::Job)
                    .file("new.rb")
                    .depends_on("x", "C")
                    .depends_on("x", "D"),
            )
            .unwrap();

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("A").unwrap().kind, UnitKind::Job);
        assert_eq!(graph.dependencies_of("A"), vec!["C", "D"]);
        assert!(graph.dependents_of("B").is_empty());
        assert_eq!(graph.dependents_of("D"), vec!["A"]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.units_for_file("old.rb").is_empty());
        assert_eq!(graph.units_for_file("new.rb"), vec!["A"]);
    }

    #[test]
    fn identical_reregistration_is_idempotent() {
        let unit = Unit::new("A", UnitKind::Service)
            .file("a.rb")
            .depends_on("x", "B");
        let mut once = DependencyGraph::new();
        once.register(unit.clone()).unwrap();
        let mut twice = DependencyGraph::new();
        twice.register(unit.clone()).unwrap();
        twice.register(unit).unwrap();

        assert_eq!(once.node_count(), twice.node_count());
        assert_eq!(once.edge_count(), twice.edge_count());
        assert_eq!(once.dependencies_of("A"), twice.dependencies_of("A"));
        assert_eq!(once.dependents_of("B"), twice.dependents_of("B"));
        assert_eq!(once.units_for_file("a.rb"), twice.units_for_file("a.rb"));
    }

    #[test]
    fn units_of_type_filters_by_tag() {
        let mut graph = order_user();
        graph
            .register(Unit::new("UsersController", UnitKind::Controller))
            .unwrap();
        assert_eq!(graph.units_of_type(&UnitKind::Model), vec!["Order", "User"]);
        assert_eq!(
            graph.units_of_type(&UnitKind::Controller),
            vec!["UsersController"]
        );
        assert_eq!(
            graph.units_of_type(&UnitKind::from("policy")),
            Vec::<&str>::new()
        );
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let mut graph = DependencyGraph::new();
        let err = graph.register(Unit::new("", UnitKind::Model)).unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        let err = graph.register(Unit::new("   ", UnitKind::Model)).unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn empty_dependency_target_is_rejected_without_side_effects() {
        let mut graph = DependencyGraph::new();
        let err = graph
            .register(Unit::new("A", UnitKind::Model).depends_on("x", ""))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert!(!graph.contains("A"));
    }

    #[test]
    fn register_all_stops_at_first_error() {
        let mut graph = DependencyGraph::new();
        let err = graph.register_all(vec![
            Unit::new("A", UnitKind::Model),
            Unit::new("", UnitKind::Model),
            Unit::new("C", UnitKind::Model),
        ]);
        assert!(err.is_err());
        assert!(graph.contains("A"));
        assert!(!graph.contains("C"));
    }

    #[test]
    fn register_clears_cached_views() {
        let mut graph = order_user();
        let _ = graph.pagerank();
        let _ = graph.analyze();
        assert!(graph.rank_cache().get().is_some());
        assert!(graph.report_cache().get().is_some());

        graph.register(Unit::new("Product", UnitKind::Model)).unwrap();
        assert!(graph.rank_cache().get().is_none());
        assert!(graph.report_cache().get().is_none());
        assert_eq!(graph.pagerank().len(), 3);
    }

    #[test]
    fn resolved_view_skips_dangling_targets() {
        let mut graph = order_user();
        graph
            .register(
                Unit::new("Order", UnitKind::Model)
                    .depends_on("association", "User")
                    .depends_on("inheritance", "ApplicationRecord"),
            )
            .unwrap();
        let resolved = graph.resolved();
        assert_eq!(resolved.ids, vec!["Order", "User"]);
        assert_eq!(resolved.out, vec![vec![1], vec![]]);
        assert_eq!(resolved.edge_count(), 1);
        assert_eq!(graph.edge_count(), 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_units() -> impl Strategy<Value = Vec<Unit>> {
            let id = prop::sample::select(vec!["A", "B", "C", "D", "E", "F"]);
            let unit = (id.clone(), prop::collection::vec(id, 0..4)).prop_map(|(src, targets)| {
                targets
                    .into_iter()
                    .fold(Unit::new(src, UnitKind::Model), |u, t| u.depends_on("ref", t))
            });
            prop::collection::vec(unit, 0..12)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn forward_and_reverse_indexes_agree(units in arb_units()) {
                let mut graph = DependencyGraph::new();
                graph.register_all(units).unwrap();

                for (source, edge) in graph.edges() {
                    prop_assert!(graph.dependencies_of(source).contains(&edge.target.as_str()));
                    prop_assert!(graph.dependents_of(&edge.target).contains(&source));
                }
                let reverse_total: usize = ["A", "B", "C", "D", "E", "F"]
                    .iter()
                    .map(|id| graph.dependent_count(id))
                    .sum();
                prop_assert_eq!(reverse_total, graph.edge_count());
            }

            #[test]
            fn replaying_registrations_is_idempotent(units in arb_units()) {
                let mut once = DependencyGraph::new();
                once.register_all(units.clone()).unwrap();
                let mut twice = once.clone();
                twice.register_all(units).unwrap();

                prop_assert_eq!(once.node_count(), twice.node_count());
                prop_assert_eq!(once.edge_count(), twice.edge_count());
                for id in ["A", "B", "C", "D", "E", "F"] {
                    prop_assert_eq!(once.dependencies_of(id), twice.dependencies_of(id));
                    prop_assert_eq!(once.dependents_of(id), twice.dependents_of(id));
                }
            }
        }
    }
}
