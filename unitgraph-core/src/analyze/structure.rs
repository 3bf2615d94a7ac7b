// Structural analysis: orphans, dead ends, hubs, cycles, bridges.
//
// Read-only over a built graph. Cycles and bridges only consider edges
// between registered units; dangling edges are external references.

use std::collections::HashSet;
use std::time::Instant;

use petgraph::algo::{connected_components, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::store::{DependencyGraph, ResolvedGraph};

/// Everything the reporting layer needs about the shape of the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralReport {
    /// Units nothing depends on.
    pub orphans: Vec<String>,
    /// Units that depend on nothing.
    pub dead_ends: Vec<String>,
    /// Most depended-upon units, highest dependent count first.
    pub hubs: Vec<Hub>,
    /// One closed walk per cyclic strongly connected component, e.g. `["A", "B", "A"]`.
    pub cycles: Vec<Vec<String>>,
    /// Edges whose removal splits a weakly connected component.
    pub bridges: Vec<Bridge>,
    pub stats: StructuralStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hub {
    pub identifier: String,
    pub dependent_count: usize,
    /// First few dependents in identifier order.
    pub sample_dependents: Vec<String>,
}

/// A stored forward edge, reported in its original direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bridge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralStats {
    pub orphan_count: usize,
    pub dead_end_count: usize,
    pub hub_count: usize,
    pub cycle_count: usize,
    pub bridge_count: usize,
    pub component_count: usize,
    pub node_count: usize,
    /// All stored edges, dangling ones included.
    pub edge_count: usize,
}

impl DependencyGraph {
    /// Structural report using the graph's configured analysis limits.
    ///
    /// Computed on first call and cached until the next `register`.
    pub fn analyze(&self) -> &StructuralReport {
        self.report_cache()
            .get_or_init(|| self.analyze_with(&self.config().analysis))
    }

    /// Uncached structural report with explicit limits.
    pub fn analyze_with(&self, config: &AnalysisConfig) -> StructuralReport {
        let start = Instant::now();
        let resolved = self.resolved();

        let orphans: Vec<String> = self
            .identifiers()
            .filter(|id| self.dependent_count(id) == 0)
            .map(str::to_string)
            .collect();

        let dead_ends: Vec<String> = self
            .identifiers()
            .filter(|id| self.dependency_edges(id).is_empty())
            .map(str::to_string)
            .collect();

        let hubs = find_hubs(self, config);
        let cycles = find_cycles(&resolved, config.max_cycles);
        let bridges = find_bridges(&resolved);
        let component_count = count_components(&resolved);

        let stats = StructuralStats {
            orphan_count: orphans.len(),
            dead_end_count: dead_ends.len(),
            hub_count: hubs.len(),
            cycle_count: cycles.len(),
            bridge_count: bridges.len(),
            component_count,
            node_count: self.node_count(),
            edge_count: self.edge_count(),
        };

        info!(
            nodes = stats.node_count,
            edges = stats.edge_count,
            orphans = stats.orphan_count,
            hubs = stats.hub_count,
            cycles = stats.cycle_count,
            bridges = stats.bridge_count,
            duration = ?start.elapsed(),
            "Structural analysis complete"
        );

        StructuralReport {
            orphans,
            dead_ends,
            hubs,
            cycles,
            bridges,
            stats,
        }
    }
}

// ── Hubs ───────────────────────────────────────────────────────────

fn find_hubs(graph: &DependencyGraph, config: &AnalysisConfig) -> Vec<Hub> {
    let mut hubs: Vec<Hub> = graph
        .identifiers()
        .filter(|id| graph.dependent_count(id) > config.hub_threshold)
        .map(|id| {
            let dependents = graph.dependents_of(id);
            Hub {
                identifier: id.to_string(),
                dependent_count: dependents.len(),
                sample_dependents: dependents
                    .into_iter()
                    .take(config.hub_sample_size)
                    .map(str::to_string)
                    .collect(),
            }
        })
        .collect();

    hubs.sort_by(|a, b| {
        b.dependent_count
            .cmp(&a.dependent_count)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    hubs.truncate(config.max_hubs);
    hubs
}

// ── Cycles ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

/// Depth-first search with an explicit stack. A back edge `u → v` closes
/// the walk `path[v..=u] + [v]`; only the first one found in each strongly
/// connected component is kept.
fn find_cycles(graph: &ResolvedGraph<'_>, max_cycles: usize) -> Vec<Vec<String>> {
    let n = graph.len();
    let mut cycles = Vec::new();
    if n == 0 || max_cycles == 0 {
        return cycles;
    }

    let component = scc_membership(graph);
    let mut reported: HashSet<usize> = HashSet::new();
    let mut state = vec![Visit::New; n];
    let mut stack_pos = vec![0usize; n];

    'roots: for root in 0..n {
        if state[root] != Visit::New {
            continue;
        }
        let mut path: Vec<usize> = vec![root];
        let mut cursor: Vec<usize> = vec![0];
        state[root] = Visit::OnStack;
        stack_pos[root] = 0;

        while let Some(&u) = path.last() {
            let depth = path.len() - 1;
            let next = cursor[depth];
            if next < graph.out[u].len() {
                cursor[depth] += 1;
                let v = graph.out[u][next];
                match state[v] {
                    Visit::New => {
                        state[v] = Visit::OnStack;
                        stack_pos[v] = path.len();
                        path.push(v);
                        cursor.push(0);
                    }
                    Visit::OnStack => {
                        if reported.insert(component[v]) {
                            let mut cycle: Vec<String> = path[stack_pos[v]..]
                                .iter()
                                .map(|&i| graph.ids[i].to_string())
                                .collect();
                            cycle.push(graph.ids[v].to_string());
                            cycles.push(cycle);
                            if cycles.len() >= max_cycles {
                                break 'roots;
                            }
                        }
                    }
                    Visit::Done => {}
                }
            } else {
                state[u] = Visit::Done;
                path.pop();
                cursor.pop();
            }
        }
    }

    cycles
}

fn to_digraph(graph: &ResolvedGraph<'_>) -> DiGraph<(), ()> {
    let mut g = DiGraph::with_capacity(graph.len(), graph.edge_count());
    for _ in 0..graph.len() {
        g.add_node(());
    }
    for (u, v) in graph.edge_pairs() {
        g.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
    }
    g
}

/// Component id per node index.
fn scc_membership(graph: &ResolvedGraph<'_>) -> Vec<usize> {
    let mut component = vec![0usize; graph.len()];
    for (id, members) in tarjan_scc(&to_digraph(graph)).iter().enumerate() {
        for node in members {
            component[node.index()] = id;
        }
    }
    component
}

fn count_components(graph: &ResolvedGraph<'_>) -> usize {
    if graph.len() == 0 {
        return 0;
    }
    connected_components(&to_digraph(graph))
}

// ── Bridges ────────────────────────────────────────────────────────

/// Tarjan's low-link bridge search on the undirected multigraph underlying
/// the resolved edges. Edges are distinguished by id, so `A → B` plus
/// `B → A` count as two parallel edges and neither is a bridge.
fn find_bridges(graph: &ResolvedGraph<'_>) -> Vec<Bridge> {
    const UNSEEN: usize = usize::MAX;

    let n = graph.len();
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    let mut edge_list: Vec<(usize, usize)> = Vec::new();
    for (u, v) in graph.edge_pairs() {
        if u == v {
            continue;
        }
        let id = edge_list.len();
        edge_list.push((u, v));
        adjacency[u].push((v, id));
        adjacency[v].push((u, id));
    }

    let mut disc = vec![UNSEEN; n];
    let mut low = vec![0usize; n];
    let mut is_bridge = vec![false; edge_list.len()];
    let mut timer = 0usize;

    for root in 0..n {
        if disc[root] != UNSEEN {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;

        // (node, edge used to reach it, next adjacency slot)
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
        while let Some(top) = stack.len().checked_sub(1) {
            let (u, parent_edge, next) = stack[top];
            if next < adjacency[u].len() {
                stack[top].2 += 1;
                let (v, edge) = adjacency[u][next];
                if Some(edge) == parent_edge {
                    continue;
                }
                if disc[v] == UNSEEN {
                    disc[v] = timer;
                    low[v] = timer;
                    timer += 1;
                    stack.push((v, Some(edge), 0));
                } else {
                    low[u] = low[u].min(disc[v]);
                }
            } else {
                stack.pop();
                if let (Some(&(parent, _, _)), Some(edge)) = (stack.last(), parent_edge) {
                    low[parent] = low[parent].min(low[u]);
                    if low[u] > disc[parent] {
                        is_bridge[edge] = true;
                    }
                }
            }
        }
    }

    edge_list
        .iter()
        .zip(is_bridge)
        .filter(|(_, bridge)| *bridge)
        .map(|(&(u, v), _)| Bridge {
            source: graph.ids[u].to_string(),
            target: graph.ids[v].to_string(),
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────
